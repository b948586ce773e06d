//! Error types for calendar operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Invalid work window: {0}")]
    InvalidWindow(String),

    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Holiday source error: {0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CalendarError>;

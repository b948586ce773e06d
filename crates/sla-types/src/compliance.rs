//! SLA thresholds and compliance verdicts.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tri-state outcome for one SLA dimension.
///
/// `Unknown` is reported when either the threshold or the observed
/// duration is undefined. It serializes as the empty string, which is what
/// dashboards built on the index already filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ComplianceVerdict {
    #[serde(rename = "comply")]
    Comply,
    #[serde(rename = "overdue")]
    Overdue,
    #[default]
    #[serde(rename = "")]
    Unknown,
}

impl ComplianceVerdict {
    /// Wire representation of the verdict.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceVerdict::Comply => "comply",
            ComplianceVerdict::Overdue => "overdue",
            ComplianceVerdict::Unknown => "",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ComplianceVerdict::Unknown)
    }
}

impl fmt::Display for ComplianceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplianceVerdict::Unknown => write!(f, "unknown"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Lookup key for an SLA threshold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThresholdKey {
    /// Ticket class (e.g. "Incident", "UserRequest")
    pub class: String,
    /// Raw priority code
    pub priority: String,
    /// Service name
    pub service: String,
}

impl ThresholdKey {
    pub fn new(
        class: impl Into<String>,
        priority: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            class: class.into(),
            priority: priority.into(),
            service: service.into(),
        }
    }
}

impl fmt::Display for ThresholdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.class, self.priority, self.service)
    }
}

/// Response and resolution deadlines for one (class, priority, service).
///
/// A `None` or zero deadline means no SLA is defined for that dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlaThreshold {
    /// Time-to-own deadline
    pub response: Option<Duration>,
    /// Time-to-resolve deadline
    pub resolution: Option<Duration>,
}

impl SlaThreshold {
    pub fn new(response: Option<Duration>, resolution: Option<Duration>) -> Self {
        Self {
            response: response.filter(|d| !d.is_zero()),
            resolution: resolution.filter(|d| !d.is_zero()),
        }
    }

    /// Threshold recorded when the remote confirms nothing is defined.
    pub fn undefined() -> Self {
        Self::default()
    }

    /// True when at least one dimension carries a deadline.
    pub fn is_defined(&self) -> bool {
        self.response.is_some() || self.resolution.is_some()
    }
}

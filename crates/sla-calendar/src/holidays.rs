//! Holiday set and the holiday file it is loaded from.
//!
//! The file holds one ISO date (`YYYY-MM-DD`) per line. Blank lines and
//! lines starting with `#` are ignored. A background job rewrites the file
//! from the ticketing system; readers take an immutable snapshot per cycle.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::Result;

/// Remote provider of holiday dates.
#[async_trait]
pub trait HolidaySource: Send + Sync {
    async fn fetch_holidays(&self) -> Result<Vec<NaiveDate>>;
}

/// Calendar dates on which no working time accrues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidaySet {
    dates: BTreeSet<NaiveDate>,
}

impl HolidaySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn insert(&mut self, date: NaiveDate) -> bool {
        self.dates.insert(date)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaiveDate> {
        self.dates.iter()
    }

    /// Parse holiday file content. Invalid lines are logged and skipped.
    pub fn parse(content: &str) -> Self {
        let mut set = Self::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match NaiveDate::parse_from_str(line, "%Y-%m-%d") {
                Ok(date) => {
                    set.insert(date);
                }
                Err(e) => {
                    warn!(line = lineno + 1, value = %line, error = %e, "Skipping invalid holiday line");
                }
            }
        }
        set
    }

    /// Load the holiday file. A missing file is an empty set.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let set = Self::parse(&content);
                debug!(path = %path.display(), count = set.len(), "Loaded holidays");
                Ok(set)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Holiday file not found, using empty set");
                Ok(Self::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Serialize as holiday file content, one sorted date per line.
    pub fn to_file_content(&self) -> String {
        let mut out = String::with_capacity(self.dates.len() * 11);
        for date in &self.dates {
            out.push_str(&date.format("%Y-%m-%d").to_string());
            out.push('\n');
        }
        out
    }

    /// Replace the holiday file atomically (temp file + rename).
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.to_file_content())?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl FromIterator<NaiveDate> for HolidaySet {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self {
            dates: iter.into_iter().collect(),
        }
    }
}

/// Fetch holidays from `source` and rewrite the holiday file.
///
/// On any failure the existing file is left untouched. Returns the number
/// of dates written.
pub async fn refresh_holiday_file(source: &dyn HolidaySource, path: &Path) -> Result<usize> {
    let dates = source.fetch_holidays().await?;
    let set: HolidaySet = dates.into_iter().collect();
    set.write_atomic(path)?;
    debug!(path = %path.display(), count = set.len(), "Refreshed holiday file");
    Ok(set.len())
}

//! Compliance evaluation.

use std::time::Duration;

use sla_types::ComplianceVerdict;

fn positive(d: Option<Duration>) -> Option<Duration> {
    d.filter(|d| !d.is_zero())
}

/// Verdict for a raw wall-clock duration. No fallback: zero is unknown.
pub fn evaluate_raw(observed: Option<Duration>, threshold: Option<Duration>) -> ComplianceVerdict {
    evaluate(observed, None, threshold)
}

/// Verdict for a windowed (business-hour or 24-hour) duration.
///
/// A zero `observed` falls back to `fallback`, the raw duration for the
/// same interval. `Unknown` when the threshold is undefined or both
/// durations are zero or absent.
pub fn evaluate(
    observed: Option<Duration>,
    fallback: Option<Duration>,
    threshold: Option<Duration>,
) -> ComplianceVerdict {
    let Some(threshold) = positive(threshold) else {
        return ComplianceVerdict::Unknown;
    };
    match positive(observed).or_else(|| positive(fallback)) {
        Some(elapsed) if elapsed <= threshold => ComplianceVerdict::Comply,
        Some(_) => ComplianceVerdict::Overdue,
        None => ComplianceVerdict::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Option<Duration> {
        Some(Duration::from_secs(s))
    }

    #[test]
    fn test_undefined_threshold_is_unknown() {
        assert_eq!(evaluate(secs(10), None, None), ComplianceVerdict::Unknown);
        assert_eq!(evaluate(secs(10), None, secs(0)), ComplianceVerdict::Unknown);
        assert_eq!(evaluate_raw(secs(10), None), ComplianceVerdict::Unknown);
    }

    #[test]
    fn test_within_and_over_threshold() {
        assert_eq!(evaluate(secs(3600), None, secs(3600)), ComplianceVerdict::Comply);
        assert_eq!(evaluate(secs(3601), None, secs(3600)), ComplianceVerdict::Overdue);
        assert_eq!(evaluate_raw(secs(60), secs(3600)), ComplianceVerdict::Comply);
        assert_eq!(evaluate_raw(secs(7200), secs(3600)), ComplianceVerdict::Overdue);
    }

    #[test]
    fn test_zero_window_duration_falls_back_to_raw() {
        assert_eq!(evaluate(secs(0), secs(7200), secs(3600)), ComplianceVerdict::Overdue);
        assert_eq!(evaluate(secs(0), secs(1800), secs(3600)), ComplianceVerdict::Comply);
        assert_eq!(evaluate(None, secs(1800), secs(3600)), ComplianceVerdict::Comply);
    }

    #[test]
    fn test_both_zero_is_unknown() {
        assert_eq!(evaluate(secs(0), secs(0), secs(3600)), ComplianceVerdict::Unknown);
        assert_eq!(evaluate(None, None, secs(3600)), ComplianceVerdict::Unknown);
        assert_eq!(evaluate_raw(secs(0), secs(3600)), ComplianceVerdict::Unknown);
    }

    #[test]
    fn test_window_duration_preferred_over_raw() {
        // Long weekend: raw is over, business time is within.
        assert_eq!(evaluate(secs(1800), secs(200_000), secs(3600)), ComplianceVerdict::Comply);
    }
}

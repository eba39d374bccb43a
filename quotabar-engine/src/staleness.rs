//! Staleness policy.
//!
//! Data is stale once it has survived two missed refresh cycles. Every part
//! of the system that shows a fresh/stale judgment must go through
//! [`stale_after_ms`], or badges and alerts will disagree.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Stale window used when auto-refresh is off (10 minutes).
pub const DEFAULT_STALE_AFTER_MS: i64 = 600_000;

/// Number of missed refresh cycles before data counts as stale.
pub const STALE_INTERVAL_MULTIPLIER: i64 = 2;

/// Maps a refresh interval to the age after which data is stale.
///
/// `refresh_interval_seconds <= 0` means manual refresh and yields
/// [`DEFAULT_STALE_AFTER_MS`].
pub fn stale_after_ms(refresh_interval_seconds: i64) -> i64 {
    if refresh_interval_seconds <= 0 {
        DEFAULT_STALE_AFTER_MS
    } else {
        refresh_interval_seconds
            .saturating_mul(1000)
            .saturating_mul(STALE_INTERVAL_MULTIPLIER)
    }
}

/// Returns true iff `now - timestamp > stale_after_ms`.
///
/// Absent timestamps and non-positive windows are never stale.
pub fn is_stale(timestamp: Option<DateTime<Utc>>, stale_after_ms: i64, now: DateTime<Utc>) -> bool {
    let Some(timestamp) = timestamp else {
        return false;
    };
    if stale_after_ms <= 0 {
        return false;
    }
    (now - timestamp).num_milliseconds() > stale_after_ms
}

/// Parses an RFC 3339 timestamp; garbage is treated as absent.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// [`is_stale`] over a raw timestamp string.
pub fn is_stale_raw(raw: &str, stale_after_ms: i64, now: DateTime<Utc>) -> bool {
    is_stale(parse_timestamp(raw), stale_after_ms, now)
}

/// Freshness badge for front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// Within the stale window.
    Fresh,
    /// Older than the stale window.
    Stale,
    /// No data yet.
    Unknown,
}

impl Freshness {
    /// Classifies a timestamp under the policy for `refresh_interval_seconds`.
    pub fn classify(
        timestamp: Option<DateTime<Utc>>,
        refresh_interval_seconds: i64,
        now: DateTime<Utc>,
    ) -> Self {
        match timestamp {
            None => Self::Unknown,
            Some(_) if is_stale(timestamp, stale_after_ms(refresh_interval_seconds), now) => {
                Self::Stale
            }
            Some(_) => Self::Fresh,
        }
    }

    /// Short label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Stale => "stale",
            Self::Unknown => "no data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_stale_after_interval() {
        for s in [1, 30, 60, 120, 900, 3600] {
            assert_eq!(stale_after_ms(s), 2000 * s);
        }
    }

    #[test]
    fn test_stale_after_manual() {
        assert_eq!(stale_after_ms(0), 600_000);
        assert_eq!(stale_after_ms(-1), 600_000);
        assert_eq!(stale_after_ms(i64::MIN), 600_000);
    }

    #[test]
    fn test_is_stale_boundary() {
        let now = Utc::now();
        let window = 120_000;

        assert!(!is_stale(Some(now), window, now));
        assert!(!is_stale(Some(now - Duration::milliseconds(window)), window, now));
        assert!(is_stale(Some(now - Duration::milliseconds(window + 1)), window, now));
    }

    #[test]
    fn test_is_stale_absent_or_disabled() {
        let now = Utc::now();
        let old = Some(now - Duration::days(3));

        assert!(!is_stale(None, 1, now));
        assert!(!is_stale(old, 0, now));
        assert!(!is_stale(old, -5, now));
    }

    #[test]
    fn test_is_stale_raw_unparseable() {
        let now = Utc::now();
        assert!(!is_stale_raw("yesterday-ish", 1, now));
        assert!(!is_stale_raw("", 1, now));
        assert!(is_stale_raw("2020-01-01T00:00:00Z", 1, now));
    }

    #[test]
    fn test_freshness_classify() {
        let now = Utc::now();
        assert_eq!(Freshness::classify(None, 60, now), Freshness::Unknown);
        assert_eq!(Freshness::classify(Some(now), 60, now), Freshness::Fresh);
        assert_eq!(
            Freshness::classify(Some(now - Duration::seconds(121)), 60, now),
            Freshness::Stale
        );
        assert_eq!(
            Freshness::classify(Some(now - Duration::seconds(599)), 0, now),
            Freshness::Fresh
        );
    }
}

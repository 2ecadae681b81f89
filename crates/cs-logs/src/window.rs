//! Query time window
//!
//! A fetch covers either an explicit UTC range or a lookback from now.
//! Any window that cannot be used as a range degrades to the lookback.

use chrono::NaiveDateTime;
use tracing::warn;

/// Layout of the `from_time` / `to_time` strings
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a `YYYY-MM-DD HH:MM:SS` string
pub fn parse_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIME_FORMAT).ok()
}

/// Time window sent with a log query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryWindow {
    /// Unix epoch seconds, `start <= end`
    Range { start: i64, end: i64 },
    /// Newest records from the last `days` days
    Lookback { days: u32 },
}

impl QueryWindow {
    /// Resolve optional bounds into a window.
    ///
    /// Both bounds must be present, parse and be ordered; otherwise the
    /// lookback window is used.
    pub fn resolve(from: Option<&str>, to: Option<&str>, lookback_days: u32) -> Self {
        let lookback = QueryWindow::Lookback {
            days: lookback_days,
        };

        let (from, to) = match (non_empty(from), non_empty(to)) {
            (Some(from), Some(to)) => (from, to),
            (None, None) => return lookback,
            (from, to) => {
                warn!(?from, ?to, "Partial time range, using default lookback");
                return lookback;
            }
        };

        match (parse_time(from), parse_time(to)) {
            (Some(start), Some(end)) => {
                let start = start.and_utc().timestamp();
                let end = end.and_utc().timestamp();
                if start > end {
                    warn!(from, to, "Inverted time range, using default lookback");
                    lookback
                } else {
                    QueryWindow::Range { start, end }
                }
            }
            _ => {
                warn!(from, to, "Invalid time format, using default lookback");
                lookback
            }
        }
    }

    /// Query-string parameters for this window
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        match self {
            QueryWindow::Range { start, end } => {
                vec![("start", start.to_string()), ("end", end.to_string())]
            }
            QueryWindow::Lookback { days } => vec![
                ("since", format!("{}d", days)),
                ("direction", "backward".to_string()),
            ],
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_range_to_epoch() {
        let window = QueryWindow::resolve(Some("2025-07-21 00:00:00"), Some("2025-07-21 23:59:59"), 7);
        assert_eq!(
            window,
            QueryWindow::Range {
                start: 1_753_056_000,
                end: 1_753_142_399
            }
        );
    }

    #[test]
    fn test_equal_bounds_allowed() {
        let window = QueryWindow::resolve(Some("2025-07-21 10:00:00"), Some("2025-07-21 10:00:00"), 7);
        assert!(matches!(window, QueryWindow::Range { start, end } if start == end));
    }

    #[test]
    fn test_degraded_windows_fall_back() {
        let lookback = QueryWindow::Lookback { days: 7 };
        assert_eq!(QueryWindow::resolve(None, None, 7), lookback);
        assert_eq!(QueryWindow::resolve(Some(""), Some(""), 7), lookback);
        assert_eq!(QueryWindow::resolve(Some("2025-07-21 00:00:00"), None, 7), lookback);
        assert_eq!(QueryWindow::resolve(Some("yesterday"), Some("2025-07-21 00:00:00"), 7), lookback);
        assert_eq!(
            QueryWindow::resolve(Some("2025-07-22 00:00:00"), Some("2025-07-21 00:00:00"), 7),
            lookback
        );
    }

    #[test]
    fn test_query_params() {
        assert_eq!(
            QueryWindow::Lookback { days: 3 }.query_params(),
            vec![("since", "3d".to_string()), ("direction", "backward".to_string())]
        );
        assert_eq!(
            QueryWindow::Range { start: 1, end: 2 }.query_params(),
            vec![("start", "1".to_string()), ("end", "2".to_string())]
        );
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bound value that leaves that side of a range open; the bound is omitted from the query.
pub const UNBOUNDED: i64 = -1;

/// Time window of a metrics request. Equal windows share one collector query per cluster.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeWindow {
    /// Latest known value only.
    PointInTime,

    /// Series between `start` and `end` in epoch seconds. A missing bound makes the window
    /// invalid for collection; a bound of [`UNBOUNDED`] leaves that side open.
    Range { start: Option<i64>, end: Option<i64> },
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::PointInTime
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<i64>| b.map(|b| b.to_string()).unwrap_or_else(|| "?".to_string());
        match self {
            Self::PointInTime => write!(f, "point-in-time"),
            Self::Range { start, end } => write!(f, "[{}, {}]", bound(*start), bound(*end)),
        }
    }
}

impl TimeWindow {
    pub const fn range(start: i64, end: i64) -> Self {
        Self::Range { start: Some(start), end: Some(end) }
    }

    /// Whether the window may be sent to the collector; a range must carry both bounds.
    pub const fn is_bounded(&self) -> bool {
        match self {
            Self::PointInTime => true,
            Self::Range { start, end } => start.is_some() && end.is_some(),
        }
    }

    /// `startTime` query parameter, if any.
    pub fn query_start(&self) -> Option<i64> {
        match self {
            Self::Range { start: Some(start), .. } if *start != UNBOUNDED => Some(*start),
            _ => None,
        }
    }

    /// `endTime` query parameter, if any.
    pub fn query_end(&self) -> Option<i64> {
        match self {
            Self::Range { end: Some(end), .. } if *end != UNBOUNDED => Some(*end),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_window_bounds() {
        assert!(TimeWindow::PointInTime.is_bounded());
        assert!(TimeWindow::range(10, 20).is_bounded());
        assert!(!TimeWindow::Range { start: None, end: Some(20) }.is_bounded());
        assert!(!TimeWindow::Range { start: Some(10), end: None }.is_bounded());
        assert!(TimeWindow::range(UNBOUNDED, 20).is_bounded());
    }

    #[test]
    fn test_window_query_parameters() {
        let window = TimeWindow::range(UNBOUNDED, 20);
        assert_none!(window.query_start());
        assert_eq!(window.query_end(), Some(20));

        let window = TimeWindow::range(0, UNBOUNDED);
        assert_eq!(window.query_start(), Some(0));
        assert_none!(window.query_end());

        assert_none!(TimeWindow::PointInTime.query_start());
        assert_none!(TimeWindow::PointInTime.query_end());
    }

    #[test]
    fn test_window_display() {
        assert_eq!(TimeWindow::PointInTime.to_string(), "point-in-time");
        assert_eq!(TimeWindow::range(10, 20).to_string(), "[10, 20]");
        assert_eq!(TimeWindow::Range { start: None, end: Some(5) }.to_string(), "[?, 5]");
    }

    #[test]
    fn test_window_ron_serde() {
        let window: TimeWindow = assert_ok!(ron::from_str("Range(start: Some(10), end: Some(20))"));
        assert_eq!(window, TimeWindow::range(10, 20));
        let window: TimeWindow = assert_ok!(ron::from_str("PointInTime"));
        assert_eq!(window, TimeWindow::PointInTime);
    }
}

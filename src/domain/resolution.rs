//! Period granularity.
//!
//! Every resolution except [`Resolution::Months`] has a fixed length in
//! ticks (nanoseconds). Months vary in length and are handled with calendar
//! arithmetic wherever a resolution is used.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::FolioError;

pub const TICKS_PER_SECOND: i64 = 1_000_000_000;
pub const TICKS_PER_MINUTE: i64 = 60 * TICKS_PER_SECOND;
pub const TICKS_PER_HOUR: i64 = 60 * TICKS_PER_MINUTE;
pub const TICKS_PER_DAY: i64 = 24 * TICKS_PER_HOUR;
pub const TICKS_PER_WEEK: i64 = 7 * TICKS_PER_DAY;

/// Variants are declared from finest to coarsest, so the derived `Ord`
/// follows period length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Resolution {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
}

impl Resolution {
    pub const ALL: [Resolution; 6] = [
        Resolution::Seconds,
        Resolution::Minutes,
        Resolution::Hours,
        Resolution::Days,
        Resolution::Weeks,
        Resolution::Months,
    ];

    /// Fixed period length in ticks, or `None` for months.
    pub fn ticks(self) -> Option<i64> {
        match self {
            Resolution::Seconds => Some(TICKS_PER_SECOND),
            Resolution::Minutes => Some(TICKS_PER_MINUTE),
            Resolution::Hours => Some(TICKS_PER_HOUR),
            Resolution::Days => Some(TICKS_PER_DAY),
            Resolution::Weeks => Some(TICKS_PER_WEEK),
            Resolution::Months => None,
        }
    }

    pub fn is_calendar(self) -> bool {
        self.ticks().is_none()
    }

    /// Whether every period of `self` lies entirely inside a single period
    /// of `target`. Weeks straddle month boundaries, so weekly data cannot
    /// be rolled up into months.
    pub fn nests_within(self, target: Resolution) -> bool {
        if target < self {
            return false;
        }
        !(self == Resolution::Weeks && target == Resolution::Months)
    }

    pub fn name(self) -> &'static str {
        match self {
            Resolution::Seconds => "seconds",
            Resolution::Minutes => "minutes",
            Resolution::Hours => "hours",
            Resolution::Days => "days",
            Resolution::Weeks => "weeks",
            Resolution::Months => "months",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resolution {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s" | "second" | "seconds" => Ok(Resolution::Seconds),
            "min" | "minute" | "minutes" => Ok(Resolution::Minutes),
            "h" | "hour" | "hours" | "hourly" => Ok(Resolution::Hours),
            "d" | "day" | "days" | "daily" => Ok(Resolution::Days),
            "w" | "week" | "weeks" | "weekly" => Ok(Resolution::Weeks),
            "m" | "month" | "months" | "monthly" => Ok(Resolution::Months),
            other => Err(FolioError::invalid(
                "resolution",
                format!("unrecognised resolution '{other}'"),
            )),
        }
    }
}

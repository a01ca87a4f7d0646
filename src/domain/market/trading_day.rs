use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A calendar date treated as a trading session. Never a Saturday or Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradingDay(NaiveDate);

impl TradingDay {
    /// Returns `None` for weekend dates.
    pub fn new(date: NaiveDate) -> Option<Self> {
        if is_weekend(date) {
            None
        } else {
            Some(Self(date))
        }
    }

    /// Calendar arithmetic only ever lands on weekdays.
    pub(super) fn from_calendar(date: NaiveDate) -> Self {
        debug_assert!(!is_weekend(date), "calendar produced weekend {date}");
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Whether a `YYYY-MM-DD HH:MM[:SS]` timestamp falls on this day
    pub fn matches_timestamp(&self, timestamp: &str) -> bool {
        timestamp
            .split_whitespace()
            .next()
            .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
            .is_some_and(|d| d == self.0)
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

impl fmt::Display for TradingDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TradingDayError {
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    Unparseable(String),

    #[error("{0} is a weekend, not a trading day")]
    Weekend(NaiveDate),
}

impl FromStr for TradingDay {
    type Err = TradingDayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map_err(|_| TradingDayError::Unparseable(s.to_string()))?;
        Self::new(date).ok_or(TradingDayError::Weekend(date))
    }
}

impl TryFrom<String> for TradingDay {
    type Error = TradingDayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TradingDay> for String {
    fn from(day: TradingDay) -> Self {
        day.to_string()
    }
}

impl From<TradingDay> for NaiveDate {
    fn from(day: TradingDay) -> Self {
        day.0
    }
}

//! Closing-price series as returned by the quote provider and as cached.

use super::trading_day::TradingDay;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Close price per session date
pub type DailySeries = BTreeMap<NaiveDate, f64>;

/// Close price per intraday bar timestamp (market-local)
pub type IntradaySeries = BTreeMap<NaiveDateTime, f64>;

/// Intraday bars shown next to the hourly predictions.
pub const SESSION_SLOTS: [(u32, u32); 7] = [
    (10, 30),
    (11, 30),
    (12, 30),
    (13, 30),
    (14, 30),
    (15, 30),
    (16, 30),
];

/// Number of daily closes kept for the weekly view
pub const WEEKLY_CLOSE_COUNT: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClose {
    #[serde(with = "local_timestamp")]
    pub time: NaiveDateTime,
    pub close: f64,
}

/// Parses `YYYY-MM-DD HH:MM:SS`, tolerating a missing seconds field.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))
        .ok()
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// The `count` most recent closes, newest first.
pub fn latest_closes(series: &DailySeries, count: usize) -> Vec<DailyClose> {
    series
        .iter()
        .rev()
        .take(count)
        .map(|(date, close)| DailyClose {
            date: *date,
            close: *close,
        })
        .collect()
}

/// Intraday closes on `day` at the [`SESSION_SLOTS`] times, oldest first.
pub fn session_closes(series: &IntradaySeries, day: TradingDay) -> Vec<SessionClose> {
    let slots: Vec<NaiveTime> = SESSION_SLOTS
        .iter()
        .filter_map(|(h, m)| NaiveTime::from_hms_opt(*h, *m, 0))
        .collect();

    series
        .iter()
        .filter(|(ts, _)| ts.date() == day.date() && slots.contains(&ts.time()))
        .map(|(ts, close)| SessionClose {
            time: *ts,
            close: *close,
        })
        .collect()
}

pub(crate) mod local_timestamp {
    use super::{TIMESTAMP_FORMAT, parse_timestamp};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}

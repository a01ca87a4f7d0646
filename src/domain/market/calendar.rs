//! Trading calendar arithmetic.
//!
//! Pure date math over a fixed market timezone. Weekends are skipped,
//! exchange holidays are not: a holiday-closed weekday is still reported
//! as a trading day.

use super::trading_day::TradingDay;
use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// Calendar bound to a single market timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketCalendar {
    timezone: Tz,
}

impl MarketCalendar {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// US equities calendar (America/New_York)
    pub fn new_york() -> Self {
        Self::new(chrono_tz::America::New_York)
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Local calendar date of `reference` in the market timezone
    pub fn local_date(&self, reference: DateTime<Utc>) -> NaiveDate {
        local_date(reference, &self.timezone)
    }

    pub fn last_trading_day(&self, reference: DateTime<Utc>) -> TradingDay {
        last_trading_day(reference, &self.timezone)
    }

    pub fn next_trading_day(&self, reference: DateTime<Utc>) -> TradingDay {
        next_trading_day(reference, &self.timezone)
    }
}

impl Default for MarketCalendar {
    fn default() -> Self {
        Self::new_york()
    }
}

pub fn local_date<Z: TimeZone>(reference: DateTime<Utc>, timezone: &Z) -> NaiveDate {
    reference.with_timezone(timezone).date_naive()
}

/// Most recent completed session before the local date of `reference`.
///
/// Monday steps back 3 days, Sunday 2, Saturday 1, any other weekday 1.
pub fn last_trading_day<Z: TimeZone>(reference: DateTime<Utc>, timezone: &Z) -> TradingDay {
    let today = local_date(reference, timezone);
    let back = match today.weekday() {
        Weekday::Mon => 3,
        Weekday::Sun => 2,
        _ => 1,
    };
    TradingDay::from_calendar(shift_back(today, back))
}

/// Session following the local date of `reference`.
///
/// Friday steps forward 3 days, Saturday 2, any other day 1.
pub fn next_trading_day<Z: TimeZone>(reference: DateTime<Utc>, timezone: &Z) -> TradingDay {
    let today = local_date(reference, timezone);
    let forward = match today.weekday() {
        Weekday::Fri => 3,
        Weekday::Sat => 2,
        _ => 1,
    };
    TradingDay::from_calendar(shift_forward(today, forward))
}

fn shift_back(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

fn shift_forward(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

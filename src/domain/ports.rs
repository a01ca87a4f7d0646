use crate::domain::errors::{PredictorError, QuoteFetchError, StoreError};
use crate::domain::market::quotes::{DailySeries, IntradaySeries};
use crate::domain::predictions::PredictorOutput;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// How `set_document` combines the new body with a stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Whole-document replace
    Replace,
    /// Top-level fields of the new body overwrite those of the stored one
    Merge,
}

impl WriteMode {
    /// Body to store given the currently stored one
    pub fn apply(self, existing: Option<Value>, incoming: Value) -> Value {
        match (self, existing, incoming) {
            (WriteMode::Merge, Some(Value::Object(mut stored)), Value::Object(fields)) => {
                stored.extend(fields);
                Value::Object(stored)
            }
            (_, _, incoming) => incoming,
        }
    }
}

/// Key-value document store. Last write wins, no transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: Value,
        mode: WriteMode,
    ) -> Result<(), StoreError>;
}

/// Upstream market data provider
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    async fn fetch_daily_series(&self, symbol: &str) -> Result<DailySeries, QuoteFetchError>;

    /// 30-minute bars, market-local timestamps
    async fn fetch_intraday_series(&self, symbol: &str) -> Result<IntradaySeries, QuoteFetchError>;
}

/// Upstream model service; trains and predicts in one call
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, symbol: &str) -> Result<PredictorOutput, PredictorError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant
#[derive(Debug)]
pub struct FixedClock {
    now: std::sync::RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        match self.now.write() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let next = self.now() + by;
        self.set(next);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_merge_overwrites_top_level_fields_only() {
        let stored = json!({"a": 1, "b": {"x": 1}});
        let merged = WriteMode::Merge.apply(Some(stored), json!({"b": {"y": 2}, "c": 3}));
        assert_eq!(merged, json!({"a": 1, "b": {"y": 2}, "c": 3}));
    }

    #[test]
    fn test_replace_discards_stored_fields() {
        let stored = json!({"a": 1});
        assert_eq!(WriteMode::Replace.apply(Some(stored), json!({"c": 3})), json!({"c": 3}));
        assert_eq!(WriteMode::Merge.apply(None, json!({"c": 3})), json!({"c": 3}));
    }

    #[test]
    fn test_fixed_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        clock.advance(chrono::Duration::hours(2));
        assert_eq!(clock.now(), start + chrono::Duration::hours(2));
    }
}

//! Read-through cache over the document store.
//!
//! An entry is served while it is younger than the TTL *and* was written
//! for the trading day the caller currently cares about. Anything else
//! triggers the fetch closure; if that fails, the last stored entry is
//! served as degraded data. Entries are never evicted, only overwritten.

use crate::domain::errors::{CacheError, QuoteFetchError};
use crate::domain::market::TradingDay;
use crate::domain::ports::{Clock, DocumentStore, WriteMode};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Location of one cache entry in the document store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub collection: String,
    pub id: String,
}

impl CacheKey {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Stored shape of a cached payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub key: String,
    pub payload: T,
    pub fetched_at_epoch_millis: i64,
    pub associated_trading_day: TradingDay,
}

impl<T> CacheEntry<T> {
    fn fetched_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.fetched_at_epoch_millis).unwrap_or_default()
    }

    fn is_fresh(&self, now_millis: i64, ttl: Duration, trading_day: TradingDay) -> bool {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        // An age that does not fit in i64 counts as expired
        now_millis
            .checked_sub(self.fetched_at_epoch_millis)
            .is_some_and(|age| age < ttl_millis)
            && self.associated_trading_day == trading_day
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Served from a fresh entry, no upstream call
    Hit,
    /// Fetched upstream during this call
    Fetched,
    /// Upstream failed; served from an expired or other-day entry
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub freshness: Freshness,
    pub fetched_at: DateTime<Utc>,
}

impl<T> Cached<T> {
    pub fn is_degraded(&self) -> bool {
        self.freshness == Freshness::Stale
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Cached<U> {
        Cached {
            value: f(self.value),
            freshness: self.freshness,
            fetched_at: self.fetched_at,
        }
    }
}

enum Lookup<T> {
    Found(CacheEntry<T>),
    Absent,
    /// The store itself failed
    Unreadable,
}

impl<T> Lookup<T> {
    fn into_entry(self) -> Option<CacheEntry<T>> {
        match self {
            Lookup::Found(entry) => Some(entry),
            _ => None,
        }
    }
}

pub struct CacheStore {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Returns the cached payload for `key` or refreshes it through `fetch`.
    ///
    /// At most one `fetch` call and one store write per invocation; the
    /// store is read a second time only to pick a stale fallback. Fails only when `fetch` fails and no entry exists.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        trading_day: TradingDay,
        fetch: F,
    ) -> Result<Cached<T>, CacheError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, QuoteFetchError>> + Send,
    {
        let now = self.clock.now();
        let existing = match self.read_entry::<T>(key).await {
            Lookup::Found(entry) if entry.is_fresh(now.timestamp_millis(), ttl, trading_day) => {
                debug!(
                    "CacheStore: hit for {} (age {}ms, day {})",
                    key,
                    now.timestamp_millis().saturating_sub(entry.fetched_at_epoch_millis),
                    entry.associated_trading_day
                );
                let fetched_at = entry.fetched_at();
                return Ok(Cached {
                    value: entry.payload,
                    freshness: Freshness::Hit,
                    fetched_at,
                });
            }
            other => other,
        };

        info!("CacheStore: {} missing or outdated, fetching upstream", key);
        match fetch().await {
            Ok(payload) => {
                let entry = CacheEntry {
                    key: key.to_string(),
                    payload,
                    fetched_at_epoch_millis: now.timestamp_millis(),
                    associated_trading_day: trading_day,
                };
                self.write_entry(key, &entry).await;
                Ok(Cached {
                    value: entry.payload,
                    freshness: Freshness::Fetched,
                    fetched_at: now,
                })
            }
            Err(fetch_error) => {
                // Re-read: another writer may have stored an entry meanwhile
                let fallback = self
                    .read_entry::<T>(key)
                    .await
                    .into_entry()
                    .or_else(|| existing.into_entry());

                match fallback {
                    Some(entry) => {
                        warn!(
                            "CacheStore: upstream failed for {} ({}), serving stale entry from {}",
                            key, fetch_error, entry.associated_trading_day
                        );
                        let fetched_at = entry.fetched_at();
                        Ok(Cached {
                            value: entry.payload,
                            freshness: Freshness::Stale,
                            fetched_at,
                        })
                    }
                    None => {
                        error!(
                            "CacheStore: upstream failed for {} and no fallback exists: {}",
                            key, fetch_error
                        );
                        Err(CacheError::DataUnavailable {
                            key: key.to_string(),
                            source: fetch_error,
                        })
                    }
                }
            }
        }
    }

    /// An undecodable entry reads as absent.
    async fn read_entry<T: DeserializeOwned>(&self, key: &CacheKey) -> Lookup<T> {
        let raw = match self.store.get_document(&key.collection, &key.id).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Lookup::Absent,
            Err(e) => {
                warn!("CacheStore: read of {} failed: {}", key, e);
                return Lookup::Unreadable;
            }
        };

        match serde_json::from_value::<CacheEntry<T>>(raw) {
            Ok(entry) => Lookup::Found(entry),
            Err(e) => {
                warn!("CacheStore: ignoring undecodable entry at {}: {}", key, e);
                Lookup::Absent
            }
        }
    }

    /// Write-through failures are logged; the caller still gets fresh data.
    async fn write_entry<T: Serialize>(&self, key: &CacheKey, entry: &CacheEntry<T>) {
        let body: Value = match serde_json::to_value(entry) {
            Ok(body) => body,
            Err(e) => {
                warn!("CacheStore: cannot serialize entry for {}: {}", key, e);
                return;
            }
        };

        match self
            .store
            .set_document(&key.collection, &key.id, body, WriteMode::Replace)
            .await
        {
            Ok(()) => info!(
                "CacheStore: stored {} for {}",
                key, entry.associated_trading_day
            ),
            Err(e) => warn!("CacheStore: write-through of {} failed: {}", key, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::FixedClock;
    use crate::infrastructure::repositories::InMemoryDocumentStore;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn setup() -> (CacheStore, InMemoryDocumentStore, Arc<FixedClock>) {
        let store = InMemoryDocumentStore::new();
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 9, 15, 0, 0).unwrap(),
        ));
        let cache = CacheStore::new(Arc::new(store.clone()), clock.clone());
        (cache, store, clock)
    }

    fn day(raw: &str) -> TradingDay {
        raw.parse().unwrap()
    }

    fn network_error() -> QuoteFetchError {
        QuoteFetchError::Network {
            symbol: "AAPL".to_string(),
            reason: "down".to_string(),
        }
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_is_a_hit() {
        let (cache, store, _clock) = setup();
        let key = CacheKey::new("stockData", "AAPL-combined");
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..2 {
            let result: Cached<Vec<f64>> = cache
                .get_or_fetch(&key, DAY, day("2024-01-08"), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1.0, 2.0])
                })
                .await
                .unwrap();
            assert_eq!(result.value, vec![1.0, 2.0]);
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(store.writes(), 1);
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let (cache, _store, clock) = setup();
        let key = CacheKey::new("stockData", "AAPL-combined");

        let first: Cached<u32> = cache
            .get_or_fetch(&key, DAY, day("2024-01-08"), || async { Ok(1) })
            .await
            .unwrap();
        assert_eq!(first.freshness, Freshness::Fetched);

        clock.advance(chrono::Duration::hours(25));
        let second: Cached<u32> = cache
            .get_or_fetch(&key, DAY, day("2024-01-08"), || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(second.value, 2);
        assert_eq!(second.freshness, Freshness::Fetched);
    }

    #[tokio::test]
    async fn test_trading_day_change_invalidates_within_ttl() {
        let (cache, _store, _clock) = setup();
        let key = CacheKey::new("stockData", "AAPL-combined");

        let _: Cached<u32> = cache
            .get_or_fetch(&key, DAY, day("2024-01-05"), || async { Ok(1) })
            .await
            .unwrap();
        let result: Cached<u32> = cache
            .get_or_fetch(&key, DAY, day("2024-01-08"), || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(result.value, 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_serves_stale_entry() {
        let (cache, store, clock) = setup();
        let key = CacheKey::new("stockData", "AAPL-combined");

        let _: Cached<u32> = cache
            .get_or_fetch(&key, DAY, day("2024-01-08"), || async { Ok(7) })
            .await
            .unwrap();
        clock.advance(chrono::Duration::days(3));

        let result: Cached<u32> = cache
            .get_or_fetch(&key, DAY, day("2024-01-11"), || async { Err(network_error()) })
            .await
            .unwrap();
        assert_eq!(result.value, 7);
        assert!(result.is_degraded());
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_without_entry_is_unavailable() {
        let (cache, _store, _clock) = setup();
        let key = CacheKey::new("stockData", "MSFT-combined");

        let result: Result<Cached<u32>, _> = cache
            .get_or_fetch(&key, DAY, day("2024-01-08"), || async { Err(network_error()) })
            .await;
        match result {
            Err(CacheError::DataUnavailable { key, .. }) => {
                assert_eq!(key, "stockData/MSFT-combined")
            }
            other => panic!("expected DataUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_write_failure_still_returns_fresh_payload() {
        let (cache, store, _clock) = setup();
        store.set_fail_writes(true);
        let key = CacheKey::new("stockData", "AAPL-combined");

        let result: Cached<u32> = cache
            .get_or_fetch(&key, DAY, day("2024-01-08"), || async { Ok(3) })
            .await
            .unwrap();
        assert_eq!(result.value, 3);
        assert_eq!(result.freshness, Freshness::Fetched);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let (cache, store, _clock) = setup();
        store
            .insert("stockData", "AAPL-combined", json!({"unexpected": true}))
            .await;
        let key = CacheKey::new("stockData", "AAPL-combined");

        let result: Result<Cached<u32>, _> = cache
            .get_or_fetch(&key, DAY, day("2024-01-08"), || async { Err(network_error()) })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_out_of_range_timestamp_is_refetched() {
        let (cache, store, _clock) = setup();
        store
            .insert(
                "stockData",
                "AAPL-combined",
                json!({
                    "key": "stockData/AAPL-combined",
                    "payload": 1,
                    "fetched_at_epoch_millis": i64::MIN,
                    "associated_trading_day": "2024-01-08",
                }),
            )
            .await;
        let key = CacheKey::new("stockData", "AAPL-combined");

        let result: Cached<u32> = cache
            .get_or_fetch(&key, DAY, day("2024-01-08"), || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(result.value, 2);
        assert_eq!(result.freshness, Freshness::Fetched);

        let stale: Cached<u32> = cache
            .get_or_fetch(&key, DAY, day("2024-01-09"), || async { Err(network_error()) })
            .await
            .unwrap();
        assert_eq!(stale.value, 2);
    }

    #[tokio::test]
    async fn test_entry_layout() {
        let (cache, store, clock) = setup();
        let key = CacheKey::new("stockData", "AAPL-combined");
        let _: Cached<u32> = cache
            .get_or_fetch(&key, DAY, day("2024-01-08"), || async { Ok(5) })
            .await
            .unwrap();

        let raw = store
            .get_document("stockData", "AAPL-combined")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(raw["key"], "stockData/AAPL-combined");
        assert_eq!(raw["payload"], 5);
        assert_eq!(raw["associated_trading_day"], "2024-01-08");
        assert_eq!(raw["fetched_at_epoch_millis"], clock.now().timestamp_millis());
    }
}

use super::cache_store::{CacheKey, CacheStore, Cached};
use crate::domain::errors::CacheError;
use crate::domain::market::quotes::{
    DailyClose, SessionClose, WEEKLY_CLOSE_COUNT, latest_closes, session_closes,
};
use crate::domain::market::{MarketCalendar, TradingDay};
use crate::domain::ports::{Clock, QuoteFetcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DAILY_COLLECTION: &str = "stockData";
pub const SESSION_COLLECTION: &str = "specificTimesStockData";

/// Actual-price views of a symbol, served through the cache.
pub struct QuoteService {
    cache: Arc<CacheStore>,
    fetcher: Arc<dyn QuoteFetcher>,
    calendar: MarketCalendar,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl QuoteService {
    pub fn new(
        cache: Arc<CacheStore>,
        fetcher: Arc<dyn QuoteFetcher>,
        calendar: MarketCalendar,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            fetcher,
            calendar,
            clock,
            ttl,
        }
    }

    /// Trading day the cached quote views are pinned to
    pub fn last_trading_day(&self) -> TradingDay {
        self.calendar.last_trading_day(self.clock.now())
    }

    /// Most recent daily closes (newest first), one entry per symbol
    pub async fn weekly_closes(&self, symbol: &str) -> Result<Cached<Vec<DailyClose>>, CacheError> {
        let symbol = normalize_symbol(symbol);
        let day = self.last_trading_day();
        let key = CacheKey::new(DAILY_COLLECTION, format!("{symbol}-combined"));
        debug!("QuoteService: weekly closes for {} as of {}", symbol, day);

        let fetcher = self.fetcher.clone();
        self.cache
            .get_or_fetch(&key, self.ttl, day, move || async move {
                let series = fetcher.fetch_daily_series(&symbol).await?;
                Ok(latest_closes(&series, WEEKLY_CLOSE_COUNT))
            })
            .await
    }

    /// Intraday closes at the session slot times of the last trading day,
    /// one entry per symbol and day
    pub async fn session_closes(
        &self,
        symbol: &str,
    ) -> Result<(TradingDay, Cached<Vec<SessionClose>>), CacheError> {
        let symbol = normalize_symbol(symbol);
        let day = self.last_trading_day();
        let key = CacheKey::new(SESSION_COLLECTION, format!("{symbol}-{day}"));
        debug!("QuoteService: session closes for {} on {}", symbol, day);

        let fetcher = self.fetcher.clone();
        let closes = self
            .cache
            .get_or_fetch(&key, self.ttl, day, move || async move {
                let series = fetcher.fetch_intraday_series(&symbol).await?;
                Ok(session_closes(&series, day))
            })
            .await?;
        Ok((day, closes))
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

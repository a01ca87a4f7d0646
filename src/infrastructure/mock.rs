//! Deterministic in-process collaborators for mock mode and tests.

use crate::domain::errors::{PredictorError, QuoteFetchError};
use crate::domain::market::MarketCalendar;
use crate::domain::market::quotes::{
    DailySeries, IntradaySeries, SESSION_SLOTS, format_timestamp,
};
use crate::domain::ports::{Clock, Predictor, QuoteFetcher};
use crate::domain::predictions::{ModelMetrics, PredictionColumns, PredictorOutput};
use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, NaiveTime, Weekday};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::info;

const DAILY_HISTORY_DAYS: u64 = 40;
const INTRADAY_HISTORY_DAYS: u64 = 7;

/// Pseudo-random walk in [-0.5%, +0.5%] seeded by step
fn walk(base: f64, step: u64) -> f64 {
    let seed = step.wrapping_mul(1103515245).wrapping_add(12345);
    let random_val = (((seed / 65536) % 1000) as f64 / 1000.0) - 0.5;
    base * (1.0 + random_val * 0.01)
}

fn base_price(symbol: &str) -> f64 {
    let sum: u64 = symbol.bytes().map(u64::from).sum();
    50.0 + (sum % 400) as f64
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Weekdays from `days` calendar days ago through `until`, oldest first
fn weekdays_until(until: NaiveDate, days: u64) -> Vec<NaiveDate> {
    (0..=days)
        .rev()
        .filter_map(|back| until.checked_sub_days(Days::new(back)))
        .filter(|d| is_weekday(*d))
        .collect()
}

/// Quote fetcher producing series that end at the clock's local date
pub struct MockQuoteFetcher {
    calendar: MarketCalendar,
    clock: Arc<dyn Clock>,
    daily_calls: AtomicUsize,
    intraday_calls: AtomicUsize,
    failing: AtomicBool,
}

impl MockQuoteFetcher {
    pub fn new(calendar: MarketCalendar, clock: Arc<dyn Clock>) -> Self {
        Self {
            calendar,
            clock,
            daily_calls: AtomicUsize::new(0),
            intraday_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Makes every following fetch fail with a network error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn daily_calls(&self) -> usize {
        self.daily_calls.load(Ordering::SeqCst)
    }

    pub fn intraday_calls(&self) -> usize {
        self.intraday_calls.load(Ordering::SeqCst)
    }

    fn check_failing(&self, symbol: &str) -> Result<(), QuoteFetchError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(QuoteFetchError::Network {
                symbol: symbol.to_string(),
                reason: "mock outage".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl QuoteFetcher for MockQuoteFetcher {
    async fn fetch_daily_series(&self, symbol: &str) -> Result<DailySeries, QuoteFetchError> {
        self.daily_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(symbol)?;

        let today = self.calendar.local_date(self.clock.now());
        let base = base_price(symbol);
        let series: DailySeries = weekdays_until(today, DAILY_HISTORY_DAYS)
            .into_iter()
            .map(|date| (date, walk(base, date.num_days_from_ce() as u64)))
            .collect();

        info!("MockQuoteFetcher: {} daily closes for {}", series.len(), symbol);
        Ok(series)
    }

    async fn fetch_intraday_series(&self, symbol: &str) -> Result<IntradaySeries, QuoteFetchError> {
        self.intraday_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(symbol)?;

        let today = self.calendar.local_date(self.clock.now());
        let base = base_price(symbol);
        let mut series = IntradaySeries::new();
        for date in weekdays_until(today, INTRADAY_HISTORY_DAYS) {
            // 04:00 through 19:30, as the provider reports extended hours
            for slot in 0..32u32 {
                let minutes = 4 * 60 + slot * 30;
                if let Some(time) = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0) {
                    let step = date.num_days_from_ce() as u64 * 100 + u64::from(slot);
                    series.insert(date.and_time(time), walk(base, step));
                }
            }
        }

        info!("MockQuoteFetcher: {} intraday bars for {}", series.len(), symbol);
        Ok(series)
    }
}

/// Predictor returning canned or generated output for the next trading day
pub struct MockPredictor {
    calendar: MarketCalendar,
    clock: Arc<dyn Clock>,
    fixed: Option<PredictorOutput>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl MockPredictor {
    pub fn new(calendar: MarketCalendar, clock: Arc<dyn Clock>) -> Self {
        Self {
            calendar,
            clock,
            fixed: None,
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Always answers with `output`
    pub fn with_output(mut self, output: PredictorOutput) -> Self {
        self.fixed = Some(output);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn generate(&self, symbol: &str) -> PredictorOutput {
        let now = self.clock.now();
        let day = self.calendar.next_trading_day(now);
        let base = base_price(symbol);
        let step0 = now.timestamp() as u64 / 3600;

        let mut columns = PredictionColumns::default();
        for (i, (h, m)) in SESSION_SLOTS.iter().enumerate() {
            let Some(time) = NaiveTime::from_hms_opt(*h, *m, 0) else {
                continue;
            };
            let lstm = walk(base, step0 + i as u64);
            let transformer = walk(base, step0 + 1000 + i as u64);
            columns.times.push(format_timestamp(&day.date().and_time(time)));
            columns.lstm.push(lstm);
            columns.transformer.push(transformer);
            columns.average.push((lstm + transformer) / 2.0);
        }
        let daily_average = columns.average.iter().sum::<f64>() / columns.average.len() as f64;

        let metrics = |loss: f64| ModelMetrics {
            avg_train_loss: Some(loss),
            avg_val_loss: Some(loss * 1.2),
            avg_train_mae: Some(loss * 4.0),
            avg_val_mae: Some(loss * 4.5),
            avg_train_rmse: Some(loss.sqrt()),
            avg_val_rmse: Some((loss * 1.2).sqrt()),
            avg_train_r2: Some(0.91),
            avg_val_r2: Some(0.87),
        };

        PredictorOutput {
            symbol: symbol.to_string(),
            columns,
            daily_average,
            date: day.to_string(),
            lstm_metrics: metrics(0.0021),
            transformer_metrics: metrics(0.0034),
        }
    }
}

#[async_trait]
impl Predictor for MockPredictor {
    async fn predict(&self, symbol: &str) -> Result<PredictorOutput, PredictorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(PredictorError::Unavailable {
                symbol: symbol.to_string(),
                reason: "mock outage".to_string(),
            });
        }

        let output = match &self.fixed {
            Some(output) => output.clone(),
            None => self.generate(symbol),
        };
        info!(
            "MockPredictor: {} predictions for {} on {}",
            output.columns.times.len(),
            symbol,
            output.date
        );
        Ok(output)
    }
}

//! Chart-ready views combining cached actual prices with stored predictions.

use super::alignment::{align, project};
use crate::application::market_data::quote_service::{QuoteService, normalize_symbol};
use crate::application::predictions::PredictionService;
use crate::domain::charts::AlignedSeries;
use crate::domain::errors::{DashboardError, PredictionLookupError};
use crate::domain::market::TradingDay;
use crate::domain::market::quotes::{DailySeries, IntradaySeries};
use crate::domain::predictions::{PredictionRecord, PredictionsDocument};
use chrono::{NaiveDate, NaiveDateTime};
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Actual daily closes (`series_a`) against predicted daily averages (`series_b`)
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyChart {
    pub symbol: String,
    pub chart: AlignedSeries<NaiveDate, f64>,
    pub degraded: bool,
}

/// Actual session closes (`series_a`) against predicted averages
/// (`series_b`), plus each model's prediction at the same keys
#[derive(Debug, Clone, Serialize)]
pub struct HourlyChart {
    pub symbol: String,
    pub day: TradingDay,
    pub chart: AlignedSeries<NaiveDateTime, f64>,
    pub lstm: Vec<Option<f64>>,
    pub transformer: Vec<Option<f64>>,
    pub degraded: bool,
}

/// Predictions for the next trading day
#[derive(Debug, Clone, Serialize)]
pub struct Outlook {
    pub symbol: String,
    pub day: TradingDay,
    pub predictions: Vec<PredictionRecord>,
    pub daily_average: Option<f64>,
}

pub struct DashboardService {
    quotes: Arc<QuoteService>,
    predictions: Arc<PredictionService>,
    chart_window: usize,
}

impl DashboardService {
    pub fn new(
        quotes: Arc<QuoteService>,
        predictions: Arc<PredictionService>,
        chart_window: usize,
    ) -> Self {
        Self {
            quotes,
            predictions,
            chart_window,
        }
    }

    pub async fn weekly_chart(&self, symbol: &str) -> Result<WeeklyChart, DashboardError> {
        let symbol = normalize_symbol(symbol);
        let (actual, document) = tokio::join!(
            self.quotes.weekly_closes(&symbol),
            self.predictions.document(&symbol)
        );
        let actual = actual?;
        let document = or_empty(&symbol, document)?;

        let closes: DailySeries = actual.value.iter().map(|c| (c.date, c.close)).collect();
        let predicted = document.daily_average_series();
        let chart = align(&closes, &predicted, Some(self.chart_window));

        Ok(WeeklyChart {
            symbol,
            chart,
            degraded: actual.is_degraded(),
        })
    }

    /// Weekly charts for several symbols, fetched concurrently. One failing
    /// symbol does not affect the others.
    pub async fn weekly_charts(
        &self,
        symbols: &[String],
    ) -> Vec<(String, Result<WeeklyChart, DashboardError>)> {
        let charts = join_all(symbols.iter().map(|s| self.weekly_chart(s))).await;
        let failed = charts.iter().filter(|c| c.is_err()).count();
        if failed > 0 {
            warn!("DashboardService: {}/{} weekly charts failed", failed, symbols.len());
        }
        symbols
            .iter()
            .map(|s| normalize_symbol(s))
            .zip(charts)
            .collect()
    }

    pub async fn hourly_chart(&self, symbol: &str) -> Result<HourlyChart, DashboardError> {
        let symbol = normalize_symbol(symbol);
        let (actual, document) = tokio::join!(
            self.quotes.session_closes(&symbol),
            self.predictions.document(&symbol)
        );
        let (day, actual) = actual?;
        let document = or_empty(&symbol, document)?;

        let closes: IntradaySeries = actual.value.iter().map(|c| (c.time, c.close)).collect();
        let average = document.intraday_series_on(day, |p| p.average_price);
        let chart = align(&closes, &average, None);
        let lstm = project(&document.intraday_series_on(day, |p| p.lstm_price), &chart.keys);
        let transformer = project(
            &document.intraday_series_on(day, |p| p.transformer_price),
            &chart.keys,
        );

        info!(
            "DashboardService: hourly chart for {} on {} has {} points",
            symbol,
            day,
            chart.len()
        );
        Ok(HourlyChart {
            symbol,
            day,
            chart,
            lstm,
            transformer,
            degraded: actual.is_degraded(),
        })
    }

    pub async fn outlook(&self, symbol: &str) -> Result<Outlook, DashboardError> {
        let symbol = normalize_symbol(symbol);
        let day = self.predictions.next_trading_day();
        let document = self.predictions.document(&symbol).await?;

        Ok(Outlook {
            predictions: document.predictions_on(day).into_iter().cloned().collect(),
            daily_average: document.daily_average_on(day.date()),
            symbol,
            day,
        })
    }
}

/// Charts still render actual prices for a symbol never retrained
fn or_empty(
    symbol: &str,
    document: Result<PredictionsDocument, PredictionLookupError>,
) -> Result<PredictionsDocument, PredictionLookupError> {
    match document {
        Err(PredictionLookupError::NotFound { .. }) => Ok(PredictionsDocument::empty(symbol)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::market_data::cache_store::CacheStore;
    use crate::application::predictions::{PREDICTIONS_COLLECTION, PredictionMerger, RetrainService};
    use crate::domain::market::MarketCalendar;
    use crate::domain::ports::FixedClock;
    use crate::infrastructure::mock::{MockPredictor, MockQuoteFetcher};
    use crate::infrastructure::repositories::InMemoryDocumentStore;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use serde_json::json;
    use std::time::Duration;

    struct Harness {
        clock: Arc<FixedClock>,
        store: InMemoryDocumentStore,
        fetcher: Arc<MockQuoteFetcher>,
        dashboard: DashboardService,
    }

    fn harness() -> Harness {
        // Tuesday 2024-01-09 11:00 New York
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 9, 16, 0, 0).unwrap(),
        ));
        let store = InMemoryDocumentStore::new();
        let calendar = MarketCalendar::new_york();
        let fetcher = Arc::new(MockQuoteFetcher::new(calendar, clock.clone()));
        let cache = Arc::new(CacheStore::new(Arc::new(store.clone()), clock.clone()));
        let quotes = Arc::new(QuoteService::new(
            cache,
            fetcher.clone(),
            calendar,
            clock.clone(),
            Duration::from_secs(24 * 3600),
        ));
        let predictions = Arc::new(PredictionService::new(
            Arc::new(store.clone()),
            calendar,
            clock.clone(),
        ));
        Harness {
            clock,
            store,
            fetcher,
            dashboard: DashboardService::new(quotes, predictions, 7),
        }
    }

    #[tokio::test]
    async fn test_weekly_chart_without_predictions() {
        let h = harness();
        let chart = h.dashboard.weekly_chart("AAPL").await.unwrap();

        assert_eq!(chart.chart.len(), 7);
        assert!(chart.chart.series_a.iter().all(|v| v.is_some()));
        assert!(chart.chart.series_b.iter().all(|v| v.is_none()));
        assert!(!chart.degraded);
    }

    #[tokio::test]
    async fn test_weekly_chart_aligns_daily_averages() {
        let h = harness();
        h.store
            .insert(
                PREDICTIONS_COLLECTION,
                "AAPL",
                json!({
                    "symbol": "AAPL",
                    "daily_average": [
                        {"date": "2024-01-08", "daily_average": 180.0},
                        {"date": "2024-01-08", "daily_average": 999.0},
                        {"date": "2024-01-10", "daily_average": 182.0},
                    ],
                }),
            )
            .await;

        let chart = h.dashboard.weekly_chart("AAPL").await.unwrap().chart;
        // Window keeps the 7 most recent keys, the predicted 01-10 included
        assert_eq!(chart.len(), 7);
        assert_eq!(chart.keys.last(), NaiveDate::from_ymd_opt(2024, 1, 10).as_ref());
        assert_eq!(chart.series_a.last(), Some(&None));
        assert_eq!(chart.series_b.last(), Some(&Some(182.0)));

        let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let i = chart.keys.iter().position(|k| *k == monday).unwrap();
        assert_eq!(chart.series_b[i], Some(180.0));
        assert!(chart.series_a[i].is_some());
    }

    #[tokio::test]
    async fn test_hourly_chart_after_retrain() {
        let h = harness();
        // Retrain on Friday evening so the predictions target Monday 2024-01-08,
        // the last trading day as seen from the harness's Tuesday clock
        let friday = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 5, 22, 0, 0).unwrap(),
        ));
        let predictor = Arc::new(MockPredictor::new(MarketCalendar::new_york(), friday.clone()));
        let merger = Arc::new(PredictionMerger::new(Arc::new(h.store.clone())));
        RetrainService::new(predictor, merger, friday)
            .retrain("AAPL")
            .await
            .unwrap();

        let hourly = h.dashboard.hourly_chart("AAPL").await.unwrap();
        assert_eq!(hourly.day.to_string(), "2024-01-08");
        assert_eq!(hourly.chart.len(), 7);
        assert!(hourly.chart.series_a.iter().all(|v| v.is_some()));
        assert!(hourly.chart.series_b.iter().all(|v| v.is_some()));
        assert_eq!(hourly.lstm.len(), 7);
        assert!(hourly.transformer.iter().all(|v| v.is_some()));
    }

    #[tokio::test]
    async fn test_weekly_charts_isolate_failures() {
        let h = harness();
        h.dashboard.weekly_chart("AAPL").await.unwrap();

        // Next day: AAPL entry is stale but present, MSFT has nothing cached
        h.clock.advance(ChronoDuration::days(1));
        h.fetcher.set_failing(true);

        let results = h
            .dashboard
            .weekly_charts(&["aapl".to_string(), "MSFT".to_string()])
            .await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "AAPL");
        let aapl = results[0].1.as_ref().unwrap();
        assert!(aapl.degraded);
        assert!(matches!(results[1].1, Err(DashboardError::Quotes(_))));
    }

    #[tokio::test]
    async fn test_outlook_requires_predictions() {
        let h = harness();
        assert!(matches!(
            h.dashboard.outlook("AAPL").await,
            Err(DashboardError::Predictions(PredictionLookupError::NotFound { .. }))
        ));
    }
}

use super::merger::PREDICTIONS_COLLECTION;
use crate::application::market_data::quote_service::normalize_symbol;
use crate::domain::errors::{PredictionLookupError, StoreError};
use crate::domain::market::quotes::DailySeries;
use crate::domain::market::{MarketCalendar, TradingDay};
use crate::domain::ports::{Clock, DocumentStore};
use crate::domain::predictions::{ModelMetrics, PredictionRecord, PredictionsDocument};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Metrics of the latest training run as stored on the document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelReport {
    pub symbol: String,
    pub lstm: ModelMetrics,
    pub transformer: ModelMetrics,
    pub last_trained_at: Option<DateTime<Utc>>,
}

/// Read side of the `predictions` collection. Never goes through the cache.
pub struct PredictionService {
    store: Arc<dyn DocumentStore>,
    calendar: MarketCalendar,
    clock: Arc<dyn Clock>,
}

impl PredictionService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        calendar: MarketCalendar,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            calendar,
            clock,
        }
    }

    pub async fn document(
        &self,
        symbol: &str,
    ) -> Result<PredictionsDocument, PredictionLookupError> {
        let symbol = normalize_symbol(symbol);
        let store_error = |source| PredictionLookupError::Store {
            symbol: symbol.clone(),
            source,
        };

        let raw = self
            .store
            .get_document(PREDICTIONS_COLLECTION, &symbol)
            .await
            .map_err(store_error)?
            .ok_or_else(|| PredictionLookupError::NotFound {
                symbol: symbol.clone(),
            })?;

        serde_json::from_value(raw).map_err(|source| {
            store_error(StoreError::Serialization {
                collection: PREDICTIONS_COLLECTION.to_string(),
                id: symbol.clone(),
                source,
            })
        })
    }

    /// Trading day the outlook predictions target
    pub fn next_trading_day(&self) -> TradingDay {
        self.calendar.next_trading_day(self.clock.now())
    }

    /// Predictions for the trading day after now
    pub async fn next_day_predictions(
        &self,
        symbol: &str,
    ) -> Result<(TradingDay, Vec<PredictionRecord>), PredictionLookupError> {
        let day = self.next_trading_day();
        let records = self.predictions_on(symbol, day).await?;
        Ok((day, records))
    }

    pub async fn predictions_on(
        &self,
        symbol: &str,
        day: TradingDay,
    ) -> Result<Vec<PredictionRecord>, PredictionLookupError> {
        let document = self.document(symbol).await?;
        let records: Vec<PredictionRecord> =
            document.predictions_on(day).into_iter().cloned().collect();
        debug!(
            "PredictionService: {} predictions for {} on {}",
            records.len(),
            document.symbol,
            day
        );
        Ok(records)
    }

    /// First stored daily average for `date`, if any
    pub async fn daily_average(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<f64>, PredictionLookupError> {
        Ok(self.document(symbol).await?.daily_average_on(date))
    }

    pub async fn daily_averages(&self, symbol: &str) -> Result<DailySeries, PredictionLookupError> {
        Ok(self.document(symbol).await?.daily_average_series())
    }

    pub async fn model_report(&self, symbol: &str) -> Result<ModelReport, PredictionLookupError> {
        let document = self.document(symbol).await?;
        Ok(ModelReport {
            symbol: normalize_symbol(symbol),
            lstm: document.lstm_metrics,
            transformer: document.transformer_metrics,
            last_trained_at: document.last_trained_at,
        })
    }
}

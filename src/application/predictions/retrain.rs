use super::merger::{MergeOutcome, PredictionMerger};
use crate::application::market_data::quote_service::normalize_symbol;
use crate::domain::errors::RetrainError;
use crate::domain::ports::{Clock, Predictor};
use crate::domain::predictions::PredictionBatch;
use std::sync::Arc;
use tracing::{error, info};

/// Runs the predictor for a symbol and merges its output into storage.
pub struct RetrainService {
    predictor: Arc<dyn Predictor>,
    merger: Arc<PredictionMerger>,
    clock: Arc<dyn Clock>,
}

impl RetrainService {
    pub fn new(
        predictor: Arc<dyn Predictor>,
        merger: Arc<PredictionMerger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            predictor,
            merger,
            clock,
        }
    }

    pub async fn retrain(&self, symbol: &str) -> Result<MergeOutcome, RetrainError> {
        let symbol = normalize_symbol(symbol);
        info!("RetrainService: requesting predictions for {}", symbol);

        let output = self.predictor.predict(&symbol).await.inspect_err(|e| {
            error!("RetrainService: predictor failed for {}: {}", symbol, e);
        })?;

        let batch = PredictionBatch::from_columns(
            &symbol,
            output.columns,
            output.daily_average,
            &output.date,
            output.lstm_metrics,
            output.transformer_metrics,
            self.clock.now(),
        )?;

        let outcome = self.merger.merge_batch(batch).await?;
        info!(
            "RetrainService: stored {} predictions for {}",
            outcome.document.predictions.len(),
            symbol
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{MergeError, PredictorError};
    use crate::domain::market::MarketCalendar;
    use crate::domain::ports::FixedClock;
    use crate::domain::predictions::{PredictionColumns, PredictorOutput};
    use crate::infrastructure::mock::MockPredictor;
    use crate::infrastructure::repositories::InMemoryDocumentStore;
    use chrono::{TimeZone, Utc};

    fn setup() -> (Arc<FixedClock>, InMemoryDocumentStore, Arc<PredictionMerger>) {
        // Friday 2024-01-05 17:00 New York
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 5, 22, 0, 0).unwrap(),
        ));
        let store = InMemoryDocumentStore::new();
        let merger = Arc::new(PredictionMerger::new(Arc::new(store.clone())));
        (clock, store, merger)
    }

    #[tokio::test]
    async fn test_retrain_stamps_clock_and_merges() {
        let (clock, _store, merger) = setup();
        let predictor = Arc::new(MockPredictor::new(MarketCalendar::new_york(), clock.clone()));
        let service = RetrainService::new(predictor.clone(), merger, clock.clone());

        let first = service.retrain("aapl").await.unwrap();
        assert_eq!(first.document.symbol, "AAPL");
        assert_eq!(first.document.predictions.len(), 7);
        assert!(first.document.predictions[0].predicted_time.starts_with("2024-01-08"));
        assert_eq!(first.document.last_trained_at, Some(clock.now()));

        // Same target day again: every record replaced, one more daily average
        let second = service.retrain("AAPL").await.unwrap();
        assert_eq!(second.stats.replaced, 7);
        assert_eq!(second.document.predictions.len(), 7);
        assert_eq!(second.document.daily_averages.len(), 2);
        assert_eq!(predictor.calls(), 2);
    }

    #[tokio::test]
    async fn test_malformed_output_writes_nothing() {
        let (clock, store, merger) = setup();
        let output = PredictorOutput {
            symbol: "X".to_string(),
            columns: PredictionColumns {
                times: vec!["2024-01-08 10:30:00".to_string()],
                lstm: vec![1.0, 2.0],
                transformer: vec![1.0],
                average: vec![1.0],
            },
            daily_average: 1.0,
            date: "2024-01-08".to_string(),
            ..Default::default()
        };
        let predictor = Arc::new(
            MockPredictor::new(MarketCalendar::new_york(), clock.clone()).with_output(output),
        );
        let service = RetrainService::new(predictor, merger, clock);

        let result = service.retrain("X").await;
        assert!(matches!(
            result,
            Err(RetrainError::Merge(MergeError::MalformedBatch { .. }))
        ));
        assert_eq!(store.writes(), 0);
        assert_eq!(store.reads(), 0);
    }

    #[tokio::test]
    async fn test_predictor_outage_propagates() {
        let (clock, store, merger) = setup();
        let predictor = Arc::new(MockPredictor::new(MarketCalendar::new_york(), clock.clone()));
        predictor.set_failing(true);
        let service = RetrainService::new(predictor, merger, clock);

        assert!(matches!(
            service.retrain("X").await,
            Err(RetrainError::Predictor(PredictorError::Unavailable { .. }))
        ));
        assert!(store.is_empty().await);
    }
}

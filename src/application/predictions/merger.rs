//! Upsert-merge of prediction runs into the per-symbol document.
//!
//! The merge is a whole-document read-modify-write with no version check:
//! two concurrent merges for the same symbol race and the later write wins
//! for the entire document.

use crate::application::market_data::quote_service::normalize_symbol;
use crate::domain::errors::{MergeError, StoreError};
use crate::domain::ports::{DocumentStore, WriteMode};
use crate::domain::predictions::{
    DailyAverageRecord, PredictionBatch, PredictionRecord, PredictionsDocument, TrainingMetrics,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub const PREDICTIONS_COLLECTION: &str = "predictions";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub replaced: usize,
    pub appended: usize,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub document: PredictionsDocument,
    pub stats: MergeStats,
}

/// Applies one prediction run to `document` in memory.
///
/// Records are matched on exact `predicted_time` string equality: a match is
/// replaced in place, anything else is appended. The daily average is
/// appended unconditionally, even when an entry for the same date exists.
/// Metrics and the training stamp are overwritten.
pub fn merge_into(
    document: &mut PredictionsDocument,
    records: Vec<PredictionRecord>,
    daily_average: DailyAverageRecord,
    metrics: TrainingMetrics,
) -> MergeStats {
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (i, record) in document.predictions.iter().enumerate() {
        positions.entry(record.predicted_time.clone()).or_insert(i);
    }

    let mut stats = MergeStats::default();
    for record in records {
        match positions.get(&record.predicted_time) {
            Some(&i) => {
                document.predictions[i] = record;
                stats.replaced += 1;
            }
            None => {
                positions.insert(record.predicted_time.clone(), document.predictions.len());
                document.predictions.push(record);
                stats.appended += 1;
            }
        }
    }

    // Not deduplicated by date: a second run on the same day adds a second entry.
    document.daily_averages.push(daily_average);

    document.lstm_metrics = metrics.lstm;
    document.transformer_metrics = metrics.transformer;
    document.last_trained_at = Some(metrics.trained_at);

    stats
}

pub struct PredictionMerger {
    store: Arc<dyn DocumentStore>,
}

impl PredictionMerger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Reads the stored document (or starts an empty one), merges and
    /// writes the whole document back. On a failed write the stored
    /// document is left as it was.
    pub async fn merge(
        &self,
        symbol: &str,
        records: Vec<PredictionRecord>,
        daily_average: DailyAverageRecord,
        metrics: TrainingMetrics,
    ) -> Result<MergeOutcome, MergeError> {
        let symbol = normalize_symbol(symbol);
        let symbol = symbol.as_str();
        let mut document = self.load(symbol).await?;
        if document.symbol.is_empty() {
            document.symbol = symbol.to_string();
        }

        let before = document.predictions.len();
        let stats = merge_into(&mut document, records, daily_average, metrics);
        info!(
            "PredictionMerger: {} predictions {} -> {} ({} replaced, {} appended), {} averages",
            symbol,
            before,
            document.predictions.len(),
            stats.replaced,
            stats.appended,
            document.daily_averages.len()
        );

        self.persist(symbol, &document).await?;
        Ok(MergeOutcome { document, stats })
    }

    pub async fn merge_batch(&self, batch: PredictionBatch) -> Result<MergeOutcome, MergeError> {
        let PredictionBatch {
            symbol,
            records,
            daily_average,
            metrics,
        } = batch;
        self.merge(&symbol, records, daily_average, metrics).await
    }

    async fn load(&self, symbol: &str) -> Result<PredictionsDocument, MergeError> {
        let raw = self
            .store
            .get_document(PREDICTIONS_COLLECTION, symbol)
            .await
            .map_err(|source| MergeError::LoadFailed {
                symbol: symbol.to_string(),
                source,
            })?;

        match raw {
            None => Ok(PredictionsDocument::empty(symbol)),
            Some(value) => {
                serde_json::from_value(value).map_err(|source| MergeError::LoadFailed {
                    symbol: symbol.to_string(),
                    source: StoreError::Serialization {
                        collection: PREDICTIONS_COLLECTION.to_string(),
                        id: symbol.to_string(),
                        source,
                    },
                })
            }
        }
    }

    async fn persist(
        &self,
        symbol: &str,
        document: &PredictionsDocument,
    ) -> Result<(), MergeError> {
        let persist_failed = |source| MergeError::PersistFailed {
            symbol: symbol.to_string(),
            source,
        };

        let body = serde_json::to_value(document).map_err(|source| {
            persist_failed(StoreError::Serialization {
                collection: PREDICTIONS_COLLECTION.to_string(),
                id: symbol.to_string(),
                source,
            })
        })?;

        self.store
            .set_document(PREDICTIONS_COLLECTION, symbol, body, WriteMode::Replace)
            .await
            .map_err(|e| {
                warn!("PredictionMerger: write for {} failed: {}", symbol, e);
                persist_failed(e)
            })
    }
}

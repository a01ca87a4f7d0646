//! Prediction records and the per-symbol predictions document.

pub mod batch;
pub mod records;

pub use batch::{PredictionBatch, PredictionColumns};
pub use records::{
    DailyAverageRecord, ModelMetrics, PredictionRecord, PredictionsDocument, TrainingMetrics,
};

/// Raw output of one predictor run, before validation
#[derive(Debug, Clone, Default)]
pub struct PredictorOutput {
    pub symbol: String,
    pub columns: PredictionColumns,
    pub daily_average: f64,
    pub date: String,
    pub lstm_metrics: ModelMetrics,
    pub transformer_metrics: ModelMetrics,
}

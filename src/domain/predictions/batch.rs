use super::records::{DailyAverageRecord, ModelMetrics, PredictionRecord, TrainingMetrics};
use crate::domain::errors::MergeError;
use crate::domain::market::TradingDay;
use crate::domain::market::quotes::parse_timestamp;
use chrono::{DateTime, Utc};

/// Column-oriented predictor output: index `i` across all four vectors
/// describes one prediction.
#[derive(Debug, Clone, Default)]
pub struct PredictionColumns {
    pub times: Vec<String>,
    pub lstm: Vec<f64>,
    pub transformer: Vec<f64>,
    pub average: Vec<f64>,
}

/// Validated unit of work for the merger
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionBatch {
    pub symbol: String,
    pub records: Vec<PredictionRecord>,
    pub daily_average: DailyAverageRecord,
    pub metrics: TrainingMetrics,
}

impl PredictionBatch {
    /// Zips the parallel columns into records.
    ///
    /// Fails with [`MergeError::MalformedBatch`] on unequal or zero lengths,
    /// unparseable timestamps, non-finite prices, or a date that is not a
    /// trading day. Nothing is truncated.
    pub fn from_columns(
        symbol: &str,
        columns: PredictionColumns,
        daily_average: f64,
        date: &str,
        lstm_metrics: ModelMetrics,
        transformer_metrics: ModelMetrics,
        trained_at: DateTime<Utc>,
    ) -> Result<Self, MergeError> {
        let malformed = |reason: String| MergeError::MalformedBatch {
            symbol: symbol.to_string(),
            reason,
        };

        let n = columns.times.len();
        if columns.lstm.len() != n || columns.transformer.len() != n || columns.average.len() != n
        {
            return Err(malformed(format!(
                "column lengths differ: time={}, lstm={}, transformer={}, average={}",
                n,
                columns.lstm.len(),
                columns.transformer.len(),
                columns.average.len()
            )));
        }
        if n == 0 {
            return Err(malformed("batch contains no predictions".to_string()));
        }

        if !daily_average.is_finite() {
            return Err(malformed(format!("daily average {daily_average} is not finite")));
        }
        let date: TradingDay = date
            .parse()
            .map_err(|e| malformed(format!("daily average date: {e}")))?;

        let mut records = Vec::with_capacity(n);
        for (i, time) in columns.times.into_iter().enumerate() {
            if parse_timestamp(&time).is_none() {
                return Err(malformed(format!("timestamp '{time}' at index {i} is invalid")));
            }
            let (lstm, transformer, average) =
                (columns.lstm[i], columns.transformer[i], columns.average[i]);
            if ![lstm, transformer, average].iter().all(|p| p.is_finite()) {
                return Err(malformed(format!("non-finite price at index {i}")));
            }
            records.push(PredictionRecord::new(time, lstm, transformer, average));
        }

        Ok(Self {
            symbol: symbol.to_string(),
            records,
            daily_average: DailyAverageRecord {
                date,
                average: daily_average,
            },
            metrics: TrainingMetrics {
                lstm: lstm_metrics,
                transformer: transformer_metrics,
                trained_at,
            },
        })
    }
}

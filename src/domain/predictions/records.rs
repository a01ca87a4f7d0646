use crate::domain::market::quotes::{DailySeries, IntradaySeries, parse_timestamp};
use crate::domain::market::TradingDay;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One predicted price point. `predicted_time` is the natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub predicted_time: String,
    #[serde(rename = "lstm_predicted_price")]
    pub lstm_price: f64,
    #[serde(rename = "transformer_predicted_price")]
    pub transformer_price: f64,
    #[serde(rename = "predictions_average")]
    pub average_price: f64,
}

impl PredictionRecord {
    pub fn new(
        predicted_time: impl Into<String>,
        lstm_price: f64,
        transformer_price: f64,
        average_price: f64,
    ) -> Self {
        Self {
            predicted_time: predicted_time.into(),
            lstm_price,
            transformer_price,
            average_price,
        }
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.predicted_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAverageRecord {
    pub date: TradingDay,
    #[serde(rename = "daily_average")]
    pub average: f64,
}

/// Averaged training/validation metrics of one model run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelMetrics {
    pub avg_train_loss: Option<f64>,
    pub avg_val_loss: Option<f64>,
    pub avg_train_mae: Option<f64>,
    pub avg_val_mae: Option<f64>,
    pub avg_train_rmse: Option<f64>,
    pub avg_val_rmse: Option<f64>,
    pub avg_train_r2: Option<f64>,
    pub avg_val_r2: Option<f64>,
}

/// Metrics of the latest training run, overwritten on every merge
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingMetrics {
    pub lstm: ModelMetrics,
    pub transformer: ModelMetrics,
    pub trained_at: DateTime<Utc>,
}

/// Per-symbol prediction aggregate as persisted in the `predictions` collection.
///
/// `extra` carries any field this crate does not model so a read-modify-write
/// never drops it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionsDocument {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub predictions: Vec<PredictionRecord>,
    #[serde(default, rename = "daily_average")]
    pub daily_averages: Vec<DailyAverageRecord>,
    #[serde(default, rename = "lstm_avg_metrics")]
    pub lstm_metrics: ModelMetrics,
    #[serde(default, rename = "transformer_avg_metrics")]
    pub transformer_metrics: ModelMetrics,
    #[serde(default, rename = "last_trained_metrics")]
    pub last_trained_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PredictionsDocument {
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// Predictions whose timestamp falls on `day`, in stored order
    pub fn predictions_on(&self, day: TradingDay) -> Vec<&PredictionRecord> {
        self.predictions
            .iter()
            .filter(|p| day.matches_timestamp(&p.predicted_time))
            .collect()
    }

    /// Daily average stored for `date`.
    ///
    /// The list is not deduplicated on write, so the first entry for a date
    /// wins here.
    pub fn daily_average_on(&self, date: NaiveDate) -> Option<f64> {
        self.daily_averages
            .iter()
            .find(|entry| entry.date.date() == date)
            .map(|entry| entry.average)
    }

    /// Daily averages keyed by date, first entry per date
    pub fn daily_average_series(&self) -> DailySeries {
        let mut series = DailySeries::new();
        for entry in &self.daily_averages {
            series.entry(entry.date.date()).or_insert(entry.average);
        }
        series
    }

    /// Per-timestamp prediction series for `day`, projected through `price`.
    /// Records whose timestamp does not parse are skipped.
    pub fn intraday_series_on(
        &self,
        day: TradingDay,
        price: impl Fn(&PredictionRecord) -> f64,
    ) -> IntradaySeries {
        self.predictions_on(day)
            .into_iter()
            .filter_map(|p| p.timestamp().map(|ts| (ts, price(p))))
            .collect()
    }
}

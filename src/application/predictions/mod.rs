pub mod merger;
pub mod retrain;
pub mod service;

pub use merger::{MergeOutcome, MergeStats, PREDICTIONS_COLLECTION, PredictionMerger};
pub use retrain::RetrainService;
pub use service::{ModelReport, PredictionService};

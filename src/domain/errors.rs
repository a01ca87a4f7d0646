use thiserror::Error;

/// Errors raised by the upstream quote provider
#[derive(Debug, Error)]
pub enum QuoteFetchError {
    #[error("Quote request failed for {symbol}: {reason}")]
    Network { symbol: String, reason: String },

    #[error("Rate limit hit for {symbol}: {message}")]
    RateLimited { symbol: String, message: String },

    #[error("Invalid quote response for {symbol}: {reason}")]
    InvalidResponse { symbol: String, reason: String },

    #[error("Quote provider unavailable: {0}")]
    CircuitOpen(String),
}

/// Errors raised by the document store collaborator
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document store backend error on {collection}/{id}: {reason}")]
    Backend {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("Document {collection}/{id} could not be (de)serialized: {source}")]
    Serialization {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-through cache failures that survive the stale fallback
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Data unavailable for {key}: {source}")]
    DataUnavailable {
        key: String,
        #[source]
        source: QuoteFetchError,
    },
}

/// Prediction merge failures
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Malformed prediction batch for {symbol}: {reason}")]
    MalformedBatch { symbol: String, reason: String },

    #[error("Failed to load predictions for {symbol}: {source}")]
    LoadFailed {
        symbol: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to persist predictions for {symbol}: {source}")]
    PersistFailed {
        symbol: String,
        #[source]
        source: StoreError,
    },
}

/// Errors raised by the upstream predictor service
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Predictor request failed for {symbol}: {reason}")]
    Unavailable { symbol: String, reason: String },

    #[error("Predictor returned an error for {symbol}: {message}")]
    Rejected { symbol: String, message: String },

    #[error("Invalid predictor response for {symbol}: {reason}")]
    InvalidResponse { symbol: String, reason: String },
}

/// Failures of the retrain-and-store flow
#[derive(Debug, Error)]
pub enum RetrainError {
    #[error(transparent)]
    Predictor(#[from] PredictorError),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Failures reading stored predictions
#[derive(Debug, Error)]
pub enum PredictionLookupError {
    #[error("No predictions stored for {symbol}")]
    NotFound { symbol: String },

    #[error("Failed to read predictions for {symbol}: {source}")]
    Store {
        symbol: String,
        #[source]
        source: StoreError,
    },
}

/// Failures assembling a dashboard view
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Quotes(#[from] CacheError),

    #[error(transparent)]
    Predictions(#[from] PredictionLookupError),
}

impl QuoteFetchError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, QuoteFetchError::RateLimited { .. })
    }
}

pub mod alphavantage;
pub mod core;
pub mod mock;
pub mod persistence;
pub mod predictor;
pub mod repositories;

pub use alphavantage::AlphaVantageQuoteFetcher;
pub use predictor::HttpPredictor;
pub use repositories::InMemoryDocumentStore;

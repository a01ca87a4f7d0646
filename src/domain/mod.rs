// Trading calendar and quote series
pub mod market;

// Prediction records and documents
pub mod predictions;

// Aligned chart series
pub mod charts;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;

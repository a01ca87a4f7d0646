// Read-through quote cache and quote views
pub mod market_data;

// Prediction merge, reads and retraining
pub mod predictions;

// Series alignment and dashboard views
pub mod charts;

// Service wiring
pub mod system;

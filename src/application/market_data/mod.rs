// Cached quote access
pub mod cache_store;
pub mod quote_service;

//! Upstream provider configuration parsing from environment variables.
//!
//! - Alpha Vantage (quotes)
//! - Prediction service (model training and inference)

use crate::infrastructure::core::http_client_factory::HttpSettings;
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Alpha Vantage API configuration
#[derive(Debug, Clone)]
pub struct AlphaVantageConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl AlphaVantageConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: env::var("ALPHAVANTAGE_API_KEY").unwrap_or_default(),
            base_url: env::var("ALPHAVANTAGE_BASE_URL")
                .unwrap_or_else(|_| "https://www.alphavantage.co".to_string()),
            timeout_secs: env::var("ALPHAVANTAGE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Failed to parse ALPHAVANTAGE_TIMEOUT_SECS")?,
            max_retries: env::var("ALPHAVANTAGE_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("Failed to parse ALPHAVANTAGE_MAX_RETRIES")?,
        })
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            ..HttpSettings::default()
        }
    }
}

/// Prediction service configuration
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    pub base_url: String,
    /// One request trains both models, so this is long
    pub timeout_secs: u64,
}

impl PredictorConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: env::var("PREDICTOR_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5000".to_string()),
            timeout_secs: env::var("PREDICTOR_TIMEOUT_SECS")
                .unwrap_or_else(|_| "900".to_string())
                .parse()
                .context("Failed to parse PREDICTOR_TIMEOUT_SECS")?,
        })
    }

    /// Never retried: a repeated request would retrain
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: 0,
            ..HttpSettings::default()
        }
    }
}

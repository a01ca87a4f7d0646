//! Configuration module for Stockcast.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Providers, Cache, and Observability.

mod cache_config;
mod observability_config;
mod provider_config;

pub use cache_config::CacheEnvConfig;
pub use observability_config::{LogFormat, ObservabilityEnvConfig};
pub use provider_config::{AlphaVantageConfig, PredictorConfig};

use crate::domain::market::MarketCalendar;
use anyhow::{Result, anyhow};
use chrono_tz::Tz;
use std::env;
use std::str::FromStr;

/// Where quotes and predictions come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// In-process deterministic fetcher and predictor
    Mock,
    /// Alpha Vantage and the HTTP prediction service
    Live,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "live" => Ok(Mode::Live),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'mock' or 'live'", s),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub market_timezone: Tz,
    pub database_url: String,
    pub alphavantage: AlphaVantageConfig,
    pub predictor: PredictorConfig,
    pub cache: CacheEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mode: Mode = env::var("MODE")
            .unwrap_or_else(|_| "mock".to_string())
            .parse()?;

        let tz_name =
            env::var("MARKET_TIMEZONE").unwrap_or_else(|_| "America/New_York".to_string());
        let market_timezone = Tz::from_str(&tz_name)
            .map_err(|e| anyhow!("Invalid MARKET_TIMEZONE '{}': {}", tz_name, e))?;

        let alphavantage = AlphaVantageConfig::from_env()?;
        if mode == Mode::Live && alphavantage.api_key.trim().is_empty() {
            anyhow::bail!("ALPHAVANTAGE_API_KEY is required when MODE=live");
        }

        Ok(Config {
            mode,
            market_timezone,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/stockcast.db".to_string()),
            alphavantage,
            predictor: PredictorConfig::from_env()?,
            cache: CacheEnvConfig::from_env()?,
            observability: ObservabilityEnvConfig::from_env()?,
        })
    }

    pub fn calendar(&self) -> MarketCalendar {
        MarketCalendar::new(self.market_timezone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(Mode::from_str("mock").unwrap(), Mode::Mock);
        assert_eq!(Mode::from_str("LIVE").unwrap(), Mode::Live);
        assert!(Mode::from_str("alpaca").is_err());
    }
}

//! Quote cache and chart configuration parsing from environment variables.

use anyhow::{Context, Result, bail};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CacheEnvConfig {
    pub ttl_hours: u64,
    pub chart_window_days: usize,
}

impl Default for CacheEnvConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            chart_window_days: 7,
        }
    }
}

impl CacheEnvConfig {
    pub fn from_env() -> Result<Self> {
        let ttl_hours: u64 = env::var("CACHE_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .context("Failed to parse CACHE_TTL_HOURS")?;
        let chart_window_days: usize = env::var("CHART_WINDOW_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .context("Failed to parse CHART_WINDOW_DAYS")?;

        if chart_window_days == 0 {
            bail!("CHART_WINDOW_DAYS must be at least 1");
        }

        Ok(Self {
            ttl_hours,
            chart_window_days,
        })
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }
}

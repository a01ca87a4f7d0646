use crate::config::{Config, LogFormat, Mode};
use std::env;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::time::Duration;

// Global lock to prevent race conditions when modifying environment variables in tests
static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn get_env_lock() -> &'static Mutex<()> {
    ENV_LOCK.get_or_init(|| Mutex::new(()))
}

const VARS: [&str; 9] = [
    "MODE",
    "MARKET_TIMEZONE",
    "ALPHAVANTAGE_API_KEY",
    "PREDICTOR_BASE_URL",
    "CACHE_TTL_HOURS",
    "CHART_WINDOW_DAYS",
    "DATABASE_URL",
    "LOG_FORMAT",
    "PREDICTOR_TIMEOUT_SECS",
];

fn set(key: &str, value: &str) {
    // SAFETY: every test touching the environment holds ENV_LOCK
    unsafe { env::set_var(key, value) };
}

fn clear() {
    for key in VARS {
        // SAFETY: see `set`
        unsafe { env::remove_var(key) };
    }
}

#[test]
fn test_defaults() {
    let _guard = get_env_lock().lock().unwrap_or_else(|e| e.into_inner());
    clear();

    let config = Config::from_env().unwrap();
    assert_eq!(config.mode, Mode::Mock);
    assert_eq!(config.market_timezone, chrono_tz::America::New_York);
    assert_eq!(config.cache.ttl(), Duration::from_secs(24 * 3600));
    assert_eq!(config.cache.chart_window_days, 7);
    assert_eq!(config.database_url, "sqlite://data/stockcast.db");
    assert_eq!(config.predictor.base_url, "http://127.0.0.1:5000");
    assert_eq!(config.observability.log_format, LogFormat::Pretty);
}

#[test]
fn test_overrides() {
    let _guard = get_env_lock().lock().unwrap_or_else(|e| e.into_inner());
    clear();
    set("MARKET_TIMEZONE", "Europe/London");
    set("CACHE_TTL_HOURS", "6");
    set("CHART_WINDOW_DAYS", "14");
    set("LOG_FORMAT", "compact");

    let config = Config::from_env().unwrap();
    assert_eq!(config.market_timezone, chrono_tz::Europe::London);
    assert_eq!(config.cache.ttl(), Duration::from_secs(6 * 3600));
    assert_eq!(config.cache.chart_window_days, 14);
    assert_eq!(config.observability.log_format, LogFormat::Compact);

    clear();
}

#[test]
fn test_invalid_values_fail() {
    let _guard = get_env_lock().lock().unwrap_or_else(|e| e.into_inner());

    clear();
    set("MARKET_TIMEZONE", "Mars/Olympus_Mons");
    assert!(Config::from_env().is_err());

    clear();
    set("CACHE_TTL_HOURS", "a day");
    assert!(Config::from_env().is_err());

    clear();
    set("CHART_WINDOW_DAYS", "0");
    assert!(Config::from_env().is_err());

    clear();
    set("MODE", "paper");
    assert!(Config::from_env().is_err());

    clear();
}

#[test]
fn test_live_mode_requires_api_key() {
    let _guard = get_env_lock().lock().unwrap_or_else(|e| e.into_inner());
    clear();
    set("MODE", "live");
    assert!(Config::from_env().is_err());

    set("ALPHAVANTAGE_API_KEY", "demo");
    let config = Config::from_env().unwrap();
    assert_eq!(config.mode, Mode::Live);
    assert_eq!(config.predictor.http_settings().max_retries, 0);

    clear();
}

#[test]
fn test_huge_cache_ttl_saturates() {
    let _guard = get_env_lock().lock().unwrap_or_else(|e| e.into_inner());
    clear();
    set("CACHE_TTL_HOURS", &u64::MAX.to_string());

    let config = Config::from_env().unwrap();
    assert_eq!(config.cache.ttl(), Duration::from_secs(u64::MAX));

    clear();
}

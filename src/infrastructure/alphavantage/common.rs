use crate::domain::errors::QuoteFetchError;
use crate::domain::market::quotes::parse_timestamp;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

// ===== Constants =====

pub const DAILY_FUNCTION: &str = "TIME_SERIES_DAILY";
pub const INTRADAY_FUNCTION: &str = "TIME_SERIES_INTRADAY";
pub const INTRADAY_INTERVAL: &str = "30min";

pub const DAILY_SERIES_FIELD: &str = "Time Series (Daily)";
pub const INTRADAY_SERIES_FIELD: &str = "Time Series (30min)";

/// One bar of a time-series response. Prices arrive as strings.
#[derive(Debug, Deserialize, Clone)]
pub struct AlphaVantageBar {
    #[serde(rename = "4. close")]
    pub close: String,
}

/// Rejects provider notices before looking for the series object.
fn check_notices(symbol: &str, body: &Map<String, Value>) -> Result<(), QuoteFetchError> {
    for field in ["Note", "Information"] {
        if let Some(message) = body.get(field) {
            return Err(QuoteFetchError::RateLimited {
                symbol: symbol.to_string(),
                message: message.as_str().unwrap_or_default().to_string(),
            });
        }
    }
    if let Some(message) = body.get("Error Message") {
        return Err(QuoteFetchError::InvalidResponse {
            symbol: symbol.to_string(),
            reason: message.as_str().unwrap_or_default().to_string(),
        });
    }
    Ok(())
}

/// Extracts `field` as a close-price series keyed by `parse_key`.
/// Bars with an unparseable key or close are dropped.
fn parse_series<K: Ord>(
    symbol: &str,
    body: &Value,
    field: &str,
    parse_key: impl Fn(&str) -> Option<K>,
) -> Result<BTreeMap<K, f64>, QuoteFetchError> {
    let invalid = |reason: String| QuoteFetchError::InvalidResponse {
        symbol: symbol.to_string(),
        reason,
    };

    let object = body
        .as_object()
        .ok_or_else(|| invalid("response is not a JSON object".to_string()))?;
    check_notices(symbol, object)?;

    let raw = object
        .get(field)
        .ok_or_else(|| invalid(format!("missing '{field}'")))?;
    let bars: BTreeMap<String, AlphaVantageBar> = serde_json::from_value(raw.clone())
        .map_err(|e| invalid(format!("malformed '{field}': {e}")))?;

    let total = bars.len();
    let series: BTreeMap<K, f64> = bars
        .into_iter()
        .filter_map(|(key, bar)| {
            let close = bar.close.trim().parse::<f64>().ok().filter(|c| c.is_finite())?;
            Some((parse_key(&key)?, close))
        })
        .collect();

    if series.len() < total {
        debug!(
            "AlphaVantage: dropped {} unreadable bars for {}",
            total - series.len(),
            symbol
        );
    }
    Ok(series)
}

pub fn parse_daily_series(
    symbol: &str,
    body: &Value,
) -> Result<BTreeMap<NaiveDate, f64>, QuoteFetchError> {
    parse_series(symbol, body, DAILY_SERIES_FIELD, |key| {
        NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
    })
}

pub fn parse_intraday_series(
    symbol: &str,
    body: &Value,
) -> Result<BTreeMap<NaiveDateTime, f64>, QuoteFetchError> {
    parse_series(symbol, body, INTRADAY_SERIES_FIELD, parse_timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_daily_closes() {
        let body = json!({
            "Meta Data": {"2. Symbol": "IBM"},
            "Time Series (Daily)": {
                "2024-01-05": {"1. open": "160.00", "4. close": "159.16", "5. volume": "3"},
                "2024-01-04": {"1. open": "158.00", "4. close": "158.85", "5. volume": "3"},
                "garbage": {"4. close": "1.0"},
            }
        });
        let series = parse_daily_series("IBM", &body).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(
            series.get(&NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            Some(&159.16)
        );
    }

    #[test]
    fn test_intraday_closes() {
        let body = json!({
            "Time Series (30min)": {
                "2024-01-05 10:30:00": {"4. close": "159.50"},
                "2024-01-05 11:00:00": {"4. close": "not a number"},
            }
        });
        let series = parse_intraday_series("IBM", &body).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.values().next(), Some(&159.5));
    }

    #[test]
    fn test_missing_series_is_invalid() {
        let body = json!({"Meta Data": {}});
        assert!(matches!(
            parse_daily_series("IBM", &body),
            Err(QuoteFetchError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_notes_are_rate_limits() {
        for field in ["Note", "Information"] {
            let body = json!({ field: "Our standard API rate limit is 25 requests per day." });
            let err = parse_intraday_series("IBM", &body).unwrap_err();
            assert!(err.is_rate_limit(), "{field} should be a rate limit");
        }
    }

    #[test]
    fn test_error_message_is_invalid() {
        let body = json!({"Error Message": "Invalid API call."});
        let err = parse_daily_series("NOPE", &body).unwrap_err();
        assert!(err.to_string().contains("Invalid API call."));
    }
}

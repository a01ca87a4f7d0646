use super::common::{
    DAILY_FUNCTION, INTRADAY_FUNCTION, INTRADAY_INTERVAL, parse_daily_series,
    parse_intraday_series,
};
use crate::domain::errors::QuoteFetchError;
use crate::domain::market::quotes::{DailySeries, IntradaySeries};
use crate::domain::ports::QuoteFetcher;
use crate::infrastructure::core::circuit_breaker::{CircuitBreaker, CircuitBreakerError};
use crate::infrastructure::core::http_client_factory::{
    HttpClientFactory, HttpSettings, build_url_with_query,
};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

const BREAKER_FAILURES: usize = 5;
const BREAKER_SUCCESSES: usize = 1;
const BREAKER_COOLDOWN: Duration = Duration::from_secs(60);

/// Quote fetcher over the Alpha Vantage `query` endpoint
pub struct AlphaVantageQuoteFetcher {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl AlphaVantageQuoteFetcher {
    pub fn new(api_key: String, base_url: String, http: HttpSettings) -> Self {
        Self {
            client: HttpClientFactory::create_client(http),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            circuit_breaker: Arc::new(CircuitBreaker::new(
                "AlphaVantage",
                BREAKER_FAILURES,
                BREAKER_SUCCESSES,
                BREAKER_COOLDOWN,
            )),
        }
    }

    pub fn circuit_breaker(&self) -> Arc<CircuitBreaker> {
        self.circuit_breaker.clone()
    }

    /// Calls one `function` and returns the parsed body through `parse`.
    /// Provider-wide failures count against the breaker; an invalid
    /// response for one symbol does not.
    async fn query<T>(
        &self,
        symbol: &str,
        params: &[(&str, &str)],
        parse: impl FnOnce(&str, &Value) -> Result<T, QuoteFetchError>,
    ) -> Result<T, QuoteFetchError> {
        let network = |reason: String| QuoteFetchError::Network {
            symbol: symbol.to_string(),
            reason,
        };

        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("symbol", symbol));
        query.push(("apikey", &self.api_key));
        let url = build_url_with_query(&format!("{}/query", self.base_url), &query);

        self.circuit_breaker
            .call_counting(
                async {
                    let response = self
                        .client
                        .get(&url)
                        .send()
                        .await
                        .map_err(|e| network(e.to_string()))?;

                    let status = response.status();
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        error!("AlphaVantage: HTTP {} for {}: {}", status, symbol, body);
                        return Err(network(format!("HTTP {status}")));
                    }

                    let body: Value = response
                        .json()
                        .await
                        .map_err(|e| QuoteFetchError::InvalidResponse {
                            symbol: symbol.to_string(),
                            reason: e.to_string(),
                        })?;
                    parse(symbol, &body)
                },
                |e| !matches!(e, QuoteFetchError::InvalidResponse { .. }),
            )
            .await
            .map_err(|e| match e {
                CircuitBreakerError::Open(msg) => QuoteFetchError::CircuitOpen(msg),
                CircuitBreakerError::Inner(inner) => inner,
            })
    }
}

#[async_trait]
impl QuoteFetcher for AlphaVantageQuoteFetcher {
    async fn fetch_daily_series(&self, symbol: &str) -> Result<DailySeries, QuoteFetchError> {
        debug!("AlphaVantage: fetching daily series for {}", symbol);
        let series = self
            .query(symbol, &[("function", DAILY_FUNCTION)], parse_daily_series)
            .await?;
        info!("AlphaVantage: {} daily closes for {}", series.len(), symbol);
        Ok(series)
    }

    async fn fetch_intraday_series(&self, symbol: &str) -> Result<IntradaySeries, QuoteFetchError> {
        debug!("AlphaVantage: fetching intraday series for {}", symbol);
        let series = self
            .query(
                symbol,
                &[("function", INTRADAY_FUNCTION), ("interval", INTRADAY_INTERVAL)],
                parse_intraday_series,
            )
            .await?;
        info!("AlphaVantage: {} intraday bars for {}", series.len(), symbol);
        Ok(series)
    }
}


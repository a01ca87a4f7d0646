use crate::domain::errors::PredictorError;
use crate::domain::ports::Predictor;
use crate::domain::predictions::{ModelMetrics, PredictionColumns, PredictorOutput};
use crate::infrastructure::core::http_client_factory::{
    HttpClientFactory, HttpSettings, build_url_with_query,
};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

/// Body of `GET /api/predict`
#[derive(Debug, Deserialize)]
struct PredictResponse {
    symbol: String,
    time: Vec<String>,
    lstm_predicted_price: Vec<f64>,
    transformer_predicted_price: Vec<f64>,
    predictions_average: Vec<f64>,
    daily_average: f64,
    date: String,
    #[serde(default)]
    lstm_avg_metrics: ModelMetrics,
    #[serde(default)]
    transformer_avg_metrics: ModelMetrics,
}

impl From<PredictResponse> for PredictorOutput {
    fn from(r: PredictResponse) -> Self {
        PredictorOutput {
            symbol: r.symbol,
            columns: PredictionColumns {
                times: r.time,
                lstm: r.lstm_predicted_price,
                transformer: r.transformer_predicted_price,
                average: r.predictions_average,
            },
            daily_average: r.daily_average,
            date: r.date,
            lstm_metrics: r.lstm_avg_metrics,
            transformer_metrics: r.transformer_avg_metrics,
        }
    }
}

/// Decodes a predictor body. The service answers a bare JSON string when it
/// rejects the request.
pub fn parse_prediction(symbol: &str, body: Value) -> Result<PredictorOutput, PredictorError> {
    if let Value::String(message) = body {
        return Err(PredictorError::Rejected {
            symbol: symbol.to_string(),
            message,
        });
    }
    if let Some(message) = body.get("Error").and_then(Value::as_str) {
        return Err(PredictorError::Rejected {
            symbol: symbol.to_string(),
            message: message.to_string(),
        });
    }

    let response: PredictResponse =
        serde_json::from_value(body).map_err(|e| PredictorError::InvalidResponse {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })?;
    Ok(response.into())
}

/// Client of the model training/prediction service
pub struct HttpPredictor {
    client: ClientWithMiddleware,
    base_url: String,
}

impl HttpPredictor {
    /// A request retrains both models, so callers should pass settings
    /// without retries and a generous timeout.
    pub fn new(base_url: String, http: HttpSettings) -> Self {
        Self {
            client: HttpClientFactory::create_client(http),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    async fn predict(&self, symbol: &str) -> Result<PredictorOutput, PredictorError> {
        let unavailable = |reason: String| PredictorError::Unavailable {
            symbol: symbol.to_string(),
            reason,
        };

        let url = build_url_with_query(
            &format!("{}/api/predict", self.base_url),
            &[("symbol", symbol)],
        );
        info!("HttpPredictor: requesting {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("HttpPredictor: HTTP {} for {}: {}", status, symbol, body);
            return Err(unavailable(format!("HTTP {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PredictorError::InvalidResponse {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;
        parse_prediction(symbol, body)
    }
}

use crate::application::charts::DashboardService;
use crate::application::market_data::cache_store::CacheStore;
use crate::application::market_data::quote_service::QuoteService;
use crate::application::predictions::{PredictionMerger, PredictionService, RetrainService};
use crate::config::{Config, Mode};
use crate::domain::market::MarketCalendar;
use crate::domain::ports::{Clock, DocumentStore, Predictor, QuoteFetcher, SystemClock};
use crate::infrastructure::alphavantage::AlphaVantageQuoteFetcher;
use crate::infrastructure::mock::{MockPredictor, MockQuoteFetcher};
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::document_store::SqliteDocumentStore;
use crate::infrastructure::predictor::HttpPredictor;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Ports the engine is wired against
pub struct Collaborators {
    pub store: Arc<dyn DocumentStore>,
    pub fetcher: Arc<dyn QuoteFetcher>,
    pub predictor: Arc<dyn Predictor>,
    pub clock: Arc<dyn Clock>,
}

/// Fully wired services
pub struct Application {
    pub calendar: MarketCalendar,
    pub clock: Arc<dyn Clock>,
    pub quotes: Arc<QuoteService>,
    pub predictions: Arc<PredictionService>,
    pub retrain: Arc<RetrainService>,
    pub dashboard: Arc<DashboardService>,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self> {
        info!("Building Stockcast (Mode: {:?})...", config.mode);
        let calendar = config.calendar();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let (fetcher, predictor): (Arc<dyn QuoteFetcher>, Arc<dyn Predictor>) = match config.mode {
            Mode::Mock => {
                info!("Using mock quote fetcher and predictor");
                (
                    Arc::new(MockQuoteFetcher::new(calendar, clock.clone())),
                    Arc::new(MockPredictor::new(calendar, clock.clone())),
                )
            }
            Mode::Live => {
                info!(
                    "Using Alpha Vantage ({}) and predictor at {}",
                    config.alphavantage.base_url, config.predictor.base_url
                );
                (
                    Arc::new(AlphaVantageQuoteFetcher::new(
                        config.alphavantage.api_key.clone(),
                        config.alphavantage.base_url.clone(),
                        config.alphavantage.http_settings(),
                    )),
                    Arc::new(HttpPredictor::new(
                        config.predictor.base_url.clone(),
                        config.predictor.http_settings(),
                    )),
                )
            }
        };

        info!("Initializing Database at {}", config.database_url);
        let db = Database::new(&config.database_url)
            .await
            .context("Failed to initialize database")?;
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(db.pool.clone()));

        Ok(Self::from_parts(
            Collaborators {
                store,
                fetcher,
                predictor,
                clock,
            },
            calendar,
            config.cache.ttl(),
            config.cache.chart_window_days,
        ))
    }

    pub fn from_parts(
        parts: Collaborators,
        calendar: MarketCalendar,
        cache_ttl: Duration,
        chart_window: usize,
    ) -> Self {
        let Collaborators {
            store,
            fetcher,
            predictor,
            clock,
        } = parts;

        let cache = Arc::new(CacheStore::new(store.clone(), clock.clone()));
        let quotes = Arc::new(QuoteService::new(
            cache,
            fetcher,
            calendar,
            clock.clone(),
            cache_ttl,
        ));
        let predictions = Arc::new(PredictionService::new(store.clone(), calendar, clock.clone()));
        let merger = Arc::new(PredictionMerger::new(store));
        let retrain = Arc::new(RetrainService::new(predictor, merger, clock.clone()));
        let dashboard = Arc::new(DashboardService::new(
            quotes.clone(),
            predictions.clone(),
            chart_window,
        ));

        Self {
            calendar,
            clock,
            quotes,
            predictions,
            retrain,
            dashboard,
        }
    }
}

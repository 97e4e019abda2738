//! HTTP surface: axum router serving observations, forecasts and the static
//! overview map.
//!
//! Every handler answers 200; degraded results are flagged in the payload's
//! `source` / `error` fields instead of the status code.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::HeaderValue,
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{debug, info};

use crate::{
    aggregator::Aggregator,
    config::{Config, ServerConfig},
    forecast::{ForecastDeriver, ObservationSource, RemoteAggregator},
    model::{Coordinates, ForecastRecord, GlobalPoint, ObservationRecord, global_sample_points},
    provider::{http_client, providers_from_config},
};

/// Shared state accessible by all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    aggregator: Arc<Aggregator>,
    deriver: Arc<ForecastDeriver>,
}

impl AppState {
    pub fn new(aggregator: Arc<Aggregator>, deriver: Arc<ForecastDeriver>) -> Self {
        Self { aggregator, deriver }
    }

    /// Wire production providers. Forecasts use the remote aggregator when
    /// one is configured, otherwise the in-process one.
    pub fn from_config(config: &Config) -> Result<Self> {
        let aggregator = Arc::new(Aggregator::new(providers_from_config(config)?));

        let source: Arc<dyn ObservationSource> = match &config.endpoints.aggregator_url {
            Some(url) => {
                let http = http_client(config.endpoints.timeout())?;
                Arc::new(RemoteAggregator::new(http, url.clone()))
            }
            None => aggregator.clone(),
        };

        Ok(Self::new(aggregator, Arc::new(ForecastDeriver::new(source))))
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn deriver(&self) -> &ForecastDeriver {
        &self.deriver
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/data", get(data_root_handler))
        .route("/api/data/", get(data_root_handler))
        .route("/api/data/data", get(observation_handler))
        .route("/api/data/global", get(global_handler))
        .route("/api/data/test", get(test_handler))
        .route("/api/forecast", get(forecast_handler))
        .route("/api/forecast/", get(forecast_handler))
        .with_state(state)
}

/// CORS for the configured frontends, with credentials allowed.
pub fn cors_layer(config: &ServerConfig) -> Result<CorsLayer> {
    if config.allowed_origins.iter().any(|o| o.trim() == "*") {
        return Err(anyhow!("Wildcard origin cannot be combined with credentials"));
    }

    let origins = config
        .allowed_origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin: {o}")))
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    let app = router(state).layer(cors_layer(&config.server)?);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(addr = %addr, "Air quality API listening");

    axum::serve(listener, app).await.context("Server error")
}

// -- Route Handlers --

#[derive(Debug, Deserialize)]
struct ObservationQuery {
    #[serde(default = "default_lat")]
    lat: f64,
    #[serde(default = "default_lon")]
    lon: f64,
}

fn default_lat() -> f64 {
    34.05
}

fn default_lon() -> f64 {
    -118.24
}

#[derive(Debug, Deserialize)]
struct ForecastQuery {
    lat: f64,
    lon: f64,
    #[serde(default = "default_category")]
    category: String,
}

fn default_category() -> String {
    "general".to_string()
}

async fn data_root_handler() -> Json<Value> {
    Json(json!({ "message": "F-Air Data API is running!" }))
}

async fn test_handler() -> Json<Value> {
    Json(json!({ "message": "API is working!", "timestamp": Utc::now().to_rfc3339() }))
}

async fn observation_handler(
    State(state): State<AppState>,
    Query(q): Query<ObservationQuery>,
) -> Json<ObservationRecord> {
    debug!(lat = q.lat, lon = q.lon, "Observation requested");
    Json(state.aggregator.fetch_observation(Coordinates::new(q.lat, q.lon)).await)
}

async fn global_handler() -> Json<Vec<GlobalPoint>> {
    Json(global_sample_points())
}

async fn forecast_handler(
    State(state): State<AppState>,
    Query(q): Query<ForecastQuery>,
) -> Json<ForecastRecord> {
    debug!(lat = q.lat, lon = q.lon, category = %q.category, "Forecast requested");
    Json(state.deriver.derive_forecast(Coordinates::new(q.lat, q.lon), &q.category).await)
}

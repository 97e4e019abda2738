use reqwest::StatusCode;
use thiserror::Error;

use crate::provider::ProviderId;

/// Failure talking to a single upstream provider.
///
/// Every variant is recovered locally by the aggregator; none of them reach
/// an HTTP client.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {source}")]
    Unavailable {
        provider: ProviderId,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned status {status}: {body}")]
    Status {
        provider: ProviderId,
        status: StatusCode,
        body: String,
    },

    #[error("{provider} response contained no {what}")]
    DataMissing {
        provider: ProviderId,
        what: &'static str,
    },

    #[error("Failed to parse {provider} response: {source}")]
    Malformed {
        provider: ProviderId,
        #[source]
        source: serde_json::Error,
    },

    #[error("No credentials configured for {provider}")]
    MissingCredentials { provider: ProviderId },
}

impl ProviderError {
    pub fn provider(&self) -> ProviderId {
        match self {
            ProviderError::Unavailable { provider, .. }
            | ProviderError::Status { provider, .. }
            | ProviderError::DataMissing { provider, .. }
            | ProviderError::Malformed { provider, .. }
            | ProviderError::MissingCredentials { provider } => *provider,
        }
    }

    /// True for transport failures, timeouts and non-2xx answers.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ProviderError::Unavailable { .. } | ProviderError::Status { .. })
    }
}

/// Failure outside the per-provider fallbacks; replaces the whole record.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("Cannot derive AQI from pm25={0}")]
    AqiOutOfRange(f64),
}

/// Failure obtaining or using today's conditions for a forecast.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Aggregator request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Aggregator returned status {0}")]
    UpstreamStatus(StatusCode),

    #[error("Failed to parse aggregator response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid conditions for forecast: {0}")]
    InvalidConditions(String),
}

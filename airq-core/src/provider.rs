use crate::{
    Config,
    error::ProviderError,
    model::{Coordinates, SurfaceConditions},
    provider::{meteomatics::MeteomaticsProvider, openaq::OpenAqProvider, tempo::TempoProvider},
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::{fmt::Debug, sync::Arc, time::Duration};

pub mod meteomatics;
pub mod openaq;
pub mod tempo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenAq,
    Tempo,
    Meteomatics,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAq => "openaq",
            ProviderId::Tempo => "tempo",
            ProviderId::Meteomatics => "meteomatics",
        }
    }

    /// Name shown to API consumers in attribution fields.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::OpenAq => "OpenAQ",
            ProviderId::Tempo => "NASA TEMPO",
            ProviderId::Meteomatics => "Meteomatics",
        }
    }

}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ground-level fine particulate matter.
#[async_trait]
pub trait ParticulateProvider: Send + Sync + Debug {
    /// Most recent PM2.5 reading (µg/m³) near `at`, taken on or after `date`.
    async fn latest_pm25(&self, at: Coordinates, date: NaiveDate) -> Result<f64, ProviderError>;
}

/// Nitrogen dioxide column density.
#[async_trait]
pub trait TraceGasProvider: Send + Sync + Debug {
    /// NO2 in molecules/cm² near `at` for `date`.
    async fn no2_column(&self, at: Coordinates, date: NaiveDate) -> Result<f64, ProviderError>;
}

/// Near-surface temperature and wind.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Conditions for the one-hour window starting at `start`.
    async fn surface_conditions(
        &self,
        at: Coordinates,
        start: DateTime<Utc>,
    ) -> Result<SurfaceConditions, ProviderError>;
}

/// The full set of upstreams the aggregator reads from.
#[derive(Debug, Clone)]
pub struct Providers {
    pub particulate: Arc<dyn ParticulateProvider>,
    pub trace_gas: Arc<dyn TraceGasProvider>,
    pub trace_gas_secondary: Arc<dyn TraceGasProvider>,
    pub weather: Arc<dyn WeatherProvider>,
}

/// HTTP client shared by all providers; `timeout` bounds every request.
pub fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("airq/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))
}

/// Construct the production providers from config.
pub fn providers_from_config(config: &Config) -> anyhow::Result<Providers> {
    let http = http_client(config.endpoints.timeout())?;
    let endpoints = &config.endpoints;
    let credentials = &config.credentials;

    let openaq = Arc::new(OpenAqProvider::new(http.clone(), endpoints.openaq_base_url.clone()));

    let tempo = TempoProvider::new(
        http.clone(),
        endpoints.tempo_base_url.clone(),
        endpoints.tempo_api_key.clone(),
    )
    .with_earthdata_username(credentials.earthdata_username.clone());

    let meteomatics = MeteomaticsProvider::new(
        http,
        endpoints.meteomatics_base_url.clone(),
        credentials.weather_username.clone(),
        credentials.weather_password.clone(),
    )
    .with_model(endpoints.weather_model.clone());

    Ok(Providers {
        particulate: openaq.clone(),
        trace_gas: Arc::new(tempo),
        trace_gas_secondary: openaq,
        weather: Arc::new(meteomatics),
    })
}

/// Send `request`, require a 2xx status and decode the JSON body.
pub(crate) async fn get_json<T: DeserializeOwned>(
    provider: ProviderId,
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let res = request
        .send()
        .await
        .map_err(|source| ProviderError::Unavailable { provider, source })?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|source| ProviderError::Unavailable { provider, source })?;

    if !status.is_success() {
        return Err(ProviderError::Status { provider, status, body: truncate_body(&body) });
    }

    serde_json::from_str(&body).map_err(|source| ProviderError::Malformed { provider, source })
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_are_distinct() {
        let names: Vec<_> = [ProviderId::OpenAq, ProviderId::Tempo, ProviderId::Meteomatics]
            .iter()
            .map(|p| p.as_str())
            .collect();
        assert_eq!(names, ["openaq", "tempo", "meteomatics"]);
        assert_eq!(ProviderId::Tempo.display_name(), "NASA TEMPO");
        assert_eq!(ProviderId::Meteomatics.to_string(), "meteomatics");
    }

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("not found"), "not found");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let out = truncate_body(&body);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 203);
    }

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("http://a/", "/v3/x"), "http://a/v3/x");
        assert_eq!(join_url("http://a", "v3/x"), "http://a/v3/x");
    }

    #[test]
    fn providers_from_default_config_builds() {
        let providers = providers_from_config(&Config::default());
        assert!(providers.is_ok());
    }
}

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::ProviderError,
    model::Coordinates,
    provider::{ProviderId, TraceGasProvider, get_json, join_url},
};

/// NASA TEMPO tropospheric NO2.
///
/// The endpoint is a placeholder until TEMPO exposes a point query; the
/// expected payload is a flat object carrying `no2_value`.
#[derive(Debug, Clone)]
pub struct TempoProvider {
    base_url: String,
    api_key: String,
    earthdata_username: Option<String>,
    http: Client,
}

impl TempoProvider {
    pub fn new(http: Client, base_url: String, api_key: String) -> Self {
        Self { base_url, api_key, earthdata_username: None, http }
    }

    /// Attach the Earthdata account; empty names are ignored.
    pub fn with_earthdata_username(mut self, username: String) -> Self {
        self.earthdata_username = (!username.is_empty()).then_some(username);
        self
    }
}

#[derive(Debug, Deserialize)]
struct TempoResponse {
    no2_value: Option<f64>,
}

#[async_trait]
impl TraceGasProvider for TempoProvider {
    async fn no2_column(&self, at: Coordinates, date: NaiveDate) -> Result<f64, ProviderError> {
        let url = join_url(&self.base_url, "tempo/no2");

        let mut query = vec![
            ("lat", at.lat.to_string()),
            ("lon", at.lon.to_string()),
            ("date", date.format("%Y-%m-%d").to_string()),
            ("api_key", self.api_key.clone()),
        ];
        if let Some(user) = &self.earthdata_username {
            query.push(("earthdata_user", user.clone()));
        }

        let parsed: TempoResponse =
            get_json(ProviderId::Tempo, self.http.get(url).query(&query)).await?;

        parsed
            .no2_value
            .ok_or(ProviderError::DataMissing { provider: ProviderId::Tempo, what: "no2_value" })
    }
}

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::ProviderError,
    model::Coordinates,
    provider::{ParticulateProvider, ProviderId, TraceGasProvider, get_json, join_url},
};

/// OpenAQ reports NO2 as a surface concentration; this scales it to the
/// column-density magnitude the rest of the pipeline works in.
pub const NO2_COLUMN_FACTOR: f64 = 1e12;

/// OpenAQ v3 measurements.
///
/// Serves as the primary PM2.5 source and as the historical fallback for NO2.
#[derive(Debug, Clone)]
pub struct OpenAqProvider {
    base_url: String,
    http: Client,
}

impl OpenAqProvider {
    pub fn new(http: Client, base_url: String) -> Self {
        Self { base_url, http }
    }

    async fn first_value(
        &self,
        parameter: &str,
        at: Coordinates,
        date_from: Option<NaiveDate>,
    ) -> Result<f64, ProviderError> {
        let url = join_url(&self.base_url, "v3/measurements");
        let coordinates = format!("{},{}", at.lat, at.lon);

        let mut query = vec![("parameter", parameter.to_string()), ("coordinates", coordinates)];
        if let Some(date) = date_from {
            query.push(("date_from", format!("{}T00:00:00Z", date.format("%Y-%m-%d"))));
        }
        query.push(("limit", "1".to_string()));

        let parsed: OaMeasurements =
            get_json(ProviderId::OpenAq, self.http.get(url).query(&query)).await?;

        parsed
            .results
            .first()
            .map(|m| m.value)
            .ok_or(ProviderError::DataMissing { provider: ProviderId::OpenAq, what: "measurements" })
    }
}

#[derive(Debug, Deserialize)]
struct OaMeasurement {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct OaMeasurements {
    #[serde(default)]
    results: Vec<OaMeasurement>,
}

#[async_trait]
impl ParticulateProvider for OpenAqProvider {
    async fn latest_pm25(&self, at: Coordinates, date: NaiveDate) -> Result<f64, ProviderError> {
        self.first_value("pm25", at, Some(date)).await
    }
}

#[async_trait]
impl TraceGasProvider for OpenAqProvider {
    async fn no2_column(&self, at: Coordinates, _date: NaiveDate) -> Result<f64, ProviderError> {
        let value = self.first_value("no2", at, None).await?;
        Ok(value * NO2_COLUMN_FACTOR)
    }
}

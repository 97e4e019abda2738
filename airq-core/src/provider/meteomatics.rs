use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::ProviderError,
    model::{Coordinates, SurfaceConditions},
    provider::{ProviderId, WeatherProvider, get_json, join_url},
};

pub const TEMPERATURE_PARAM: &str = "t_2m:C";
pub const WIND_SPEED_PARAM: &str = "wind_speed_10m:ms";

/// Meteomatics time-series API, authenticated with HTTP basic auth.
#[derive(Debug, Clone)]
pub struct MeteomaticsProvider {
    base_url: String,
    username: String,
    password: String,
    model: String,
    http: Client,
}

impl MeteomaticsProvider {
    pub fn new(http: Client, base_url: String, username: String, password: String) -> Self {
        Self { base_url, username, password, model: "mix".to_string(), http }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Query `parameters` over `[start, start + window]` at one-hour steps.
    pub async fn query_time_series(
        &self,
        at: Coordinates,
        start: DateTime<Utc>,
        window: Duration,
        parameters: &[&str],
    ) -> Result<TimeSeries, ProviderError> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(ProviderError::MissingCredentials { provider: ProviderId::Meteomatics });
        }

        let end = start + window;
        let path = format!(
            "{}--{}:PT1H/{}/{},{}/json",
            start.format("%Y-%m-%dT%H:%M:%SZ"),
            end.format("%Y-%m-%dT%H:%M:%SZ"),
            parameters.join(","),
            at.lat,
            at.lon,
        );
        let url = join_url(&self.base_url, &path);

        let request = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("model", self.model.as_str())]);

        let parsed: MmResponse = get_json(ProviderId::Meteomatics, request).await?;
        Ok(TimeSeries::from(parsed))
    }
}

/// Values per parameter, indexed by time step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    columns: HashMap<String, Vec<f64>>,
}

impl TimeSeries {
    pub fn value(&self, parameter: &str, index: usize) -> Option<f64> {
        self.columns.get(parameter).and_then(|col| col.get(index)).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<MmResponse> for TimeSeries {
    fn from(response: MmResponse) -> Self {
        // Single-coordinate queries only: take the first location per parameter.
        let columns = response
            .data
            .into_iter()
            .filter_map(|series| {
                let location = series.coordinates.into_iter().next()?;
                let values = location.dates.into_iter().map(|d| d.value).collect();
                Some((series.parameter, values))
            })
            .collect();

        Self { columns }
    }
}

#[derive(Debug, Deserialize)]
struct MmDate {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct MmLocation {
    #[serde(default)]
    dates: Vec<MmDate>,
}

#[derive(Debug, Deserialize)]
struct MmSeries {
    parameter: String,
    #[serde(default)]
    coordinates: Vec<MmLocation>,
}

#[derive(Debug, Deserialize)]
pub struct MmResponse {
    #[serde(default)]
    data: Vec<MmSeries>,
}

#[async_trait]
impl WeatherProvider for MeteomaticsProvider {
    async fn surface_conditions(
        &self,
        at: Coordinates,
        start: DateTime<Utc>,
    ) -> Result<SurfaceConditions, ProviderError> {
        let series = self
            .query_time_series(at, start, Duration::hours(1), &[TEMPERATURE_PARAM, WIND_SPEED_PARAM])
            .await?;

        let missing = |what: &'static str| ProviderError::DataMissing {
            provider: ProviderId::Meteomatics,
            what,
        };

        Ok(SurfaceConditions {
            temperature: series.value(TEMPERATURE_PARAM, 0).ok_or_else(|| missing("temperature"))?,
            wind_speed: series.value(WIND_SPEED_PARAM, 0).ok_or_else(|| missing("wind speed"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_series_indexes_by_parameter_and_step() {
        let raw = r#"{
            "version": "3.0",
            "status": "OK",
            "data": [
                {"parameter": "t_2m:C", "coordinates": [
                    {"lat": 34.05, "lon": -118.24, "dates": [
                        {"date": "2026-10-18T07:00:00Z", "value": 18.4},
                        {"date": "2026-10-18T08:00:00Z", "value": 19.1}
                    ]}
                ]},
                {"parameter": "wind_speed_10m:ms", "coordinates": [
                    {"lat": 34.05, "lon": -118.24, "dates": [
                        {"date": "2026-10-18T07:00:00Z", "value": 3.2}
                    ]}
                ]}
            ]
        }"#;

        let parsed: MmResponse = serde_json::from_str(raw).unwrap();
        let series = TimeSeries::from(parsed);

        assert_eq!(series.value(TEMPERATURE_PARAM, 0), Some(18.4));
        assert_eq!(series.value(TEMPERATURE_PARAM, 1), Some(19.1));
        assert_eq!(series.value(WIND_SPEED_PARAM, 0), Some(3.2));
        assert_eq!(series.value(WIND_SPEED_PARAM, 1), None);
        assert_eq!(series.value("precip_1h:mm", 0), None);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn empty_payload_gives_empty_series() {
        let parsed: MmResponse = serde_json::from_str("{}").unwrap();
        assert!(TimeSeries::from(parsed).is_empty());
    }

    #[tokio::test]
    async fn missing_credentials_short_circuit() {
        let provider = MeteomaticsProvider::new(
            Client::new(),
            "http://127.0.0.1:9".to_string(),
            String::new(),
            String::new(),
        );

        let err = provider
            .surface_conditions(Coordinates::new(0.0, 0.0), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::MissingCredentials { .. }));
    }
}

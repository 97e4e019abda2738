//! Observation aggregation with per-provider fallbacks.
//!
//! Each measurement is resolved independently: a live value when its
//! provider answers, otherwise a synthetic draw from a fixed range. A second,
//! coarser net around the whole pipeline replaces the entire record with
//! constants when something outside the provider calls goes wrong.

use std::sync::Arc;

use chrono::{DateTime, DurationRound, NaiveDate, TimeDelta, Utc};
use tracing::{debug, error, warn};

use crate::{
    error::{AggregationError, ProviderError},
    model::{AQI_PER_PM25, Coordinates, DataSources, ObservationRecord, SourceTag, SurfaceConditions},
    provider::Providers,
    random::{Clock, SeededRandom, SharedRandom, SystemClock, shared, with_random},
};

pub const PM25_FALLBACK_RANGE: (f64, f64) = (10.0, 50.0);
pub const NO2_FALLBACK_RANGE: (f64, f64) = (1e15, 5e15);
pub const TEMPERATURE_FALLBACK_RANGE: (f64, f64) = (10.0, 35.0);
pub const WIND_FALLBACK_RANGE: (f64, f64) = (0.0, 20.0);

#[derive(Debug, Clone)]
pub struct Aggregator {
    providers: Providers,
    random: SharedRandom,
    clock: Arc<dyn Clock>,
}

impl Aggregator {
    pub fn new(providers: Providers) -> Self {
        Self {
            providers,
            random: shared(SeededRandom::from_entropy()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_random(mut self, random: SharedRandom) -> Self {
        self.random = random;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Aggregate current conditions at `at`. Always produces a record.
    pub async fn fetch_observation(&self, at: Coordinates) -> ObservationRecord {
        match self.aggregate(at).await {
            Ok(record) => record,
            Err(e) => {
                error!(lat = at.lat, lon = at.lon, error = %e, "Aggregation failed, returning constant record");
                ObservationRecord::fallback(at, e.to_string())
            }
        }
    }

    async fn aggregate(&self, at: Coordinates) -> Result<ObservationRecord, AggregationError> {
        if !at.is_finite() {
            return Err(AggregationError::InvalidCoordinates { lat: at.lat, lon: at.lon });
        }

        let now = self.clock.now();
        let date = now.date_naive();

        let (pm25, weather, no2) = tokio::join!(
            self.providers.particulate.latest_pm25(at, date),
            self.providers.weather.surface_conditions(at, hour_start(now)),
            self.no2_with_secondary(at, date),
        );

        // Draw order is fixed (pm25, weather, no2) so seeded runs repeat.
        let pm25 = self.resolve("pm25", pm25, PM25_FALLBACK_RANGE);
        let weather = self.resolve_weather(weather);
        let no2 = self.resolve("no2", no2, NO2_FALLBACK_RANGE);

        let aqi = aqi_from_pm25(pm25)?;

        Ok(ObservationRecord {
            latitude: at.lat,
            longitude: at.lon,
            pm25,
            no2,
            temperature: weather.temperature,
            wind_speed: weather.wind_speed,
            aqi,
            source: SourceTag::RealData,
            data_sources: Some(DataSources::default()),
            error: None,
        })
    }

    /// Primary trace-gas provider, then the historical one.
    async fn no2_with_secondary(&self, at: Coordinates, date: NaiveDate) -> Result<f64, ProviderError> {
        match self.providers.trace_gas.no2_column(at, date).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(
                    provider = %e.provider(),
                    unavailable = e.is_unavailable(),
                    error = %e,
                    "Primary NO2 source failed, trying secondary"
                );
                self.providers.trace_gas_secondary.no2_column(at, date).await
            }
        }
    }

    fn resolve(&self, measurement: &str, result: Result<f64, ProviderError>, range: (f64, f64)) -> f64 {
        match result {
            Ok(value) => {
                debug!(measurement, value, "Live value");
                value
            }
            Err(e) => {
                let value = with_random(&self.random, |r| r.uniform(range.0, range.1));
                warn!(
                    measurement,
                    provider = %e.provider(),
                    unavailable = e.is_unavailable(),
                    error = %e,
                    value,
                    "Using synthetic fallback"
                );
                value
            }
        }
    }

    fn resolve_weather(&self, result: Result<SurfaceConditions, ProviderError>) -> SurfaceConditions {
        match result {
            Ok(conditions) => {
                debug!(
                    temperature = conditions.temperature,
                    wind_speed = conditions.wind_speed,
                    "Live weather"
                );
                conditions
            }
            Err(e) => {
                let conditions = with_random(&self.random, |r| SurfaceConditions {
                    temperature: r.uniform(TEMPERATURE_FALLBACK_RANGE.0, TEMPERATURE_FALLBACK_RANGE.1),
                    wind_speed: r.uniform(WIND_FALLBACK_RANGE.0, WIND_FALLBACK_RANGE.1),
                });
                warn!(
                    provider = %e.provider(),
                    unavailable = e.is_unavailable(),
                    error = %e,
                    "Using synthetic weather"
                );
                conditions
            }
        }
    }
}

/// `pm25 * 4`, truncated toward zero.
pub fn aqi_from_pm25(pm25: f64) -> Result<i64, AggregationError> {
    let scaled = pm25 * AQI_PER_PM25;
    if !scaled.is_finite() || scaled.abs() >= i64::MAX as f64 {
        return Err(AggregationError::AqiOutOfRange(pm25));
    }
    Ok(scaled.trunc() as i64)
}

/// Start of the current hour.
pub fn hour_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now)
}

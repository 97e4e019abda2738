use serde::{Deserialize, Serialize};

use crate::provider::ProviderId;

/// Multiplier turning a PM2.5 concentration into the simplified AQI proxy.
pub const AQI_PER_PM25: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    RealData,
    FallbackData,
}

/// Which upstream each measurement is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSources {
    pub pm25: String,
    pub no2: String,
    pub weather: String,
    pub forecast: String,
}

impl Default for DataSources {
    fn default() -> Self {
        Self {
            pm25: ProviderId::OpenAq.display_name().to_string(),
            no2: ProviderId::Tempo.display_name().to_string(),
            weather: ProviderId::Meteomatics.display_name().to_string(),
            forecast: "Machine Learning".to_string(),
        }
    }
}

/// One aggregated snapshot of conditions at a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    pub pm25: f64,
    pub no2: f64,
    #[serde(rename = "temp")]
    pub temperature: f64,
    #[serde(rename = "wind")]
    pub wind_speed: f64,
    pub aqi: i64,
    pub source: SourceTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_sources: Option<DataSources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ObservationRecord {
    /// Constant record returned when aggregation fails outright.
    pub fn fallback(at: Coordinates, error: String) -> Self {
        Self {
            latitude: at.lat,
            longitude: at.lon,
            pm25: 25.0,
            no2: 3e15,
            temperature: 20.0,
            wind_speed: 5.0,
            aqi: 100,
            source: SourceTag::FallbackData,
            data_sources: None,
            error: Some(error),
        }
    }
}

/// Temperature and wind for the current hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceConditions {
    pub temperature: f64,
    pub wind_speed: f64,
}

/// The subset of today's observation the forecast needs.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TodayConditions {
    #[serde(default = "default_today_aqi")]
    pub aqi: i64,
    #[serde(rename = "wind", default = "default_today_wind")]
    pub wind_speed: f64,
    #[serde(rename = "temp", default = "default_today_temp")]
    pub temperature: f64,
}

fn default_today_aqi() -> i64 {
    50
}

fn default_today_wind() -> f64 {
    5.0
}

fn default_today_temp() -> f64 {
    20.0
}

impl From<&ObservationRecord> for TodayConditions {
    fn from(record: &ObservationRecord) -> Self {
        Self {
            aqi: record.aqi,
            wind_speed: record.wind_speed,
            temperature: record.temperature,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastSource {
    MeteorologicalForecast,
    BasicForecast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub tomorrow_aqi: i64,
    pub today_aqi: i64,
    pub tip: String,
    pub source: ForecastSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Marker on the static world overview map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalPoint {
    pub lat: f64,
    pub lon: f64,
    pub aqi: i64,
    pub color: String,
}

/// Demo points for the overview map; not derived from live data.
pub fn global_sample_points() -> Vec<GlobalPoint> {
    vec![
        GlobalPoint { lat: 34.05, lon: -118.24, aqi: 50, color: "green".to_string() },
        GlobalPoint { lat: 40.71, lon: -74.01, aqi: 80, color: "yellow".to_string() },
    ]
}

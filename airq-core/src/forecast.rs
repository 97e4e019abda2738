//! Next-day AQI projection.
//!
//! A heuristic, not a trained model: today's AQI is nudged by a normal draw
//! and by wind, cold and weekend effects, then clamped twice.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Weekday};
use reqwest::Client;
use tracing::{debug, warn};

use crate::{
    aggregator::Aggregator,
    error::ForecastError,
    model::{Confidence, Coordinates, ForecastRecord, ForecastSource, TodayConditions},
    provider::join_url,
    random::{Clock, SeededRandom, SharedRandom, SystemClock, shared, with_random},
    tips::select_tip,
};

pub const BASE_CHANGE_STD_DEV: f64 = 3.0;
pub const MAX_DAILY_CHANGE: f64 = 15.0;
pub const AQI_FLOOR: f64 = 0.0;
pub const AQI_CEILING: f64 = 300.0;

pub const BASIC_FORECAST_TODAY_AQI: i64 = 75;
pub const BASIC_FORECAST_TIP: &str = "Using basic forecasting - check back for updates!";

/// Where the deriver gets today's conditions from.
#[async_trait]
pub trait ObservationSource: Send + Sync + Debug {
    async fn today(&self, at: Coordinates) -> Result<TodayConditions, ForecastError>;
}

#[async_trait]
impl ObservationSource for Aggregator {
    async fn today(&self, at: Coordinates) -> Result<TodayConditions, ForecastError> {
        let record = self.fetch_observation(at).await;
        Ok(TodayConditions::from(&record))
    }
}

/// An aggregator running as a separate service.
#[derive(Debug, Clone)]
pub struct RemoteAggregator {
    base_url: String,
    http: Client,
}

impl RemoteAggregator {
    pub fn new(http: Client, base_url: String) -> Self {
        Self { base_url, http }
    }
}

#[async_trait]
impl ObservationSource for RemoteAggregator {
    async fn today(&self, at: Coordinates) -> Result<TodayConditions, ForecastError> {
        let url = join_url(&self.base_url, "api/data/data");

        let res = self.http.get(url).query(&[("lat", at.lat), ("lon", at.lon)]).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(ForecastError::UpstreamStatus(status));
        }

        let body = res.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[derive(Debug, Clone)]
pub struct ForecastDeriver {
    source: Arc<dyn ObservationSource>,
    random: SharedRandom,
    clock: Arc<dyn Clock>,
}

impl ForecastDeriver {
    pub fn new(source: Arc<dyn ObservationSource>) -> Self {
        Self {
            source,
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

    /// Forecast tomorrow's AQI at `at`. Always produces a record.
    pub async fn derive_forecast(&self, at: Coordinates, category: &str) -> ForecastRecord {
        match self.try_derive(at, category).await {
            Ok(record) => record,
            Err(e) => {
                warn!(lat = at.lat, lon = at.lon, error = %e, "Forecast failed, using basic forecast");
                self.basic_forecast(e.to_string())
            }
        }
    }

    async fn try_derive(&self, at: Coordinates, category: &str) -> Result<ForecastRecord, ForecastError> {
        let today = self.source.today(at).await?;
        let base_change = with_random(&self.random, |r| r.normal(0.0, BASE_CHANGE_STD_DEV));
        let weekday = self.clock.now().weekday();

        let tomorrow_aqi = project_tomorrow(&today, weekday, base_change)?;
        debug!(today = today.aqi, tomorrow = tomorrow_aqi, base_change, "Projected AQI");

        Ok(ForecastRecord {
            tomorrow_aqi,
            today_aqi: today.aqi,
            tip: select_tip(tomorrow_aqi, category),
            source: ForecastSource::MeteorologicalForecast,
            confidence: Some(Confidence::Medium),
            change: Some(tomorrow_aqi - today.aqi),
            data_sources: vec![
                "OpenAQ PM2.5".to_string(),
                "Weather Patterns".to_string(),
                "Historical Trends".to_string(),
            ],
            error: None,
        })
    }

    fn basic_forecast(&self, error: String) -> ForecastRecord {
        let step = with_random(&self.random, |r| r.uniform_int(-5, 5));
        let tomorrow_aqi = (BASIC_FORECAST_TODAY_AQI + step).clamp(AQI_FLOOR as i64, AQI_CEILING as i64);

        ForecastRecord {
            tomorrow_aqi,
            today_aqi: BASIC_FORECAST_TODAY_AQI,
            tip: BASIC_FORECAST_TIP.to_string(),
            source: ForecastSource::BasicForecast,
            confidence: None,
            change: None,
            data_sources: Vec::new(),
            error: Some(error),
        }
    }
}

/// Apply the adjustment model to today's conditions.
///
/// The [0, 300] clamp runs before the ±15 clamp; ties round to even.
pub fn project_tomorrow(
    today: &TodayConditions,
    weekday: Weekday,
    base_change: f64,
) -> Result<i64, ForecastError> {
    if !today.wind_speed.is_finite() || !today.temperature.is_finite() || !base_change.is_finite() {
        return Err(ForecastError::InvalidConditions(format!(
            "wind={}, temp={}, base_change={}",
            today.wind_speed, today.temperature, base_change
        )));
    }

    let current = today.aqi as f64;
    let wind_effect = -0.5 * today.wind_speed;
    let temp_effect = if today.temperature < 5.0 { 1.0 } else { 0.0 };
    let weekday_effect = if matches!(weekday, Weekday::Sat | Weekday::Sun) { -3.0 } else { 0.0 };

    let raw = current + base_change + wind_effect + temp_effect + weekday_effect;
    let wide = raw.clamp(AQI_FLOOR, AQI_CEILING);
    let narrow = wide.clamp(current - MAX_DAILY_CHANGE, current + MAX_DAILY_CHANGE);

    Ok(narrow.round_ties_even() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{FixedClock, FixedRandom};
    use chrono::{TimeZone, Utc};
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn today(aqi: i64, wind_speed: f64, temperature: f64) -> TodayConditions {
        TodayConditions { aqi, wind_speed, temperature }
    }

    #[derive(Debug)]
    struct StubSource(Option<TodayConditions>);

    #[async_trait]
    impl ObservationSource for StubSource {
        async fn today(&self, _: Coordinates) -> Result<TodayConditions, ForecastError> {
            self.0.ok_or_else(|| ForecastError::InvalidConditions("aggregator down".into()))
        }
    }

    // 2026-10-14 is a Wednesday, 2026-10-17 a Saturday.
    fn wednesday() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()))
    }

    fn saturday() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()))
    }

    #[test]
    fn effects_add_up() {
        assert_eq!(project_tomorrow(&today(100, 4.0, 20.0), Weekday::Wed, 0.0).unwrap(), 98);
        assert_eq!(project_tomorrow(&today(100, 4.0, 20.0), Weekday::Sun, 0.0).unwrap(), 95);
        assert_eq!(project_tomorrow(&today(100, 4.0, 2.0), Weekday::Wed, 0.0).unwrap(), 99);
        assert_eq!(project_tomorrow(&today(100, 0.0, 20.0), Weekday::Wed, 2.2).unwrap(), 102);
    }

    #[test]
    fn wide_clamp_applies_before_narrow() {
        assert_eq!(project_tomorrow(&today(10, 40.0, 20.0), Weekday::Mon, 0.0).unwrap(), 0);
        assert_eq!(project_tomorrow(&today(295, 0.0, 20.0), Weekday::Mon, 10.0).unwrap(), 300);
    }

    #[test]
    fn narrow_clamp_limits_daily_change() {
        assert_eq!(project_tomorrow(&today(100, 0.0, 20.0), Weekday::Mon, 30.0).unwrap(), 115);
        assert_eq!(project_tomorrow(&today(100, 60.0, 20.0), Weekday::Sat, 0.0).unwrap(), 85);
    }

    #[test]
    fn ties_round_to_even() {
        assert_eq!(project_tomorrow(&today(40, 0.0, 20.0), Weekday::Mon, 0.5).unwrap(), 40);
        assert_eq!(project_tomorrow(&today(40, 0.0, 20.0), Weekday::Mon, 1.5).unwrap(), 42);
    }

    #[test]
    fn non_finite_inputs_are_rejected() {
        assert!(project_tomorrow(&today(40, f64::NAN, 20.0), Weekday::Mon, 0.0).is_err());
        assert!(project_tomorrow(&today(40, 1.0, 20.0), Weekday::Mon, f64::INFINITY).is_err());
    }

    #[test]
    fn projection_stays_bounded_over_random_trials() {
        let mut rng = StdRng::seed_from_u64(2026);
        let mut noise = SeededRandom::seeded(7);
        let weekdays = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];

        for _ in 0..5000 {
            let input = today(
                rng.gen_range(0..=300),
                rng.gen_range(0.0..40.0),
                rng.gen_range(-20.0..45.0),
            );
            let weekday = weekdays[rng.gen_range(0..weekdays.len())];
            let base_change = crate::random::RandomSource::normal(&mut noise, 0.0, 3.0);

            let tomorrow = project_tomorrow(&input, weekday, base_change).unwrap();

            assert!((0..=300).contains(&tomorrow), "{input:?} -> {tomorrow}");
            assert!((tomorrow - input.aqi).abs() <= 15, "{input:?} -> {tomorrow}");
        }
    }

    #[tokio::test]
    async fn forecast_success_carries_metadata() {
        let deriver = ForecastDeriver::new(Arc::new(StubSource(Some(today(40, 10.0, 2.0)))))
            .with_random(shared(FixedRandom::midpoint()))
            .with_clock(wednesday());

        let rec = deriver.derive_forecast(Coordinates::new(0.0, 0.0), "elderly").await;

        assert_eq!(rec.today_aqi, 40);
        assert_eq!(rec.tomorrow_aqi, 36);
        assert_eq!(rec.change, Some(-4));
        assert_eq!(rec.source, ForecastSource::MeteorologicalForecast);
        assert_eq!(rec.confidence, Some(Confidence::Medium));
        assert_eq!(rec.tip, select_tip(36, "elderly"));
        assert_eq!(rec.data_sources.len(), 3);
        assert!(rec.error.is_none());
    }

    #[tokio::test]
    async fn weekend_lowers_forecast() {
        let deriver = ForecastDeriver::new(Arc::new(StubSource(Some(today(40, 10.0, 2.0)))))
            .with_random(shared(FixedRandom::midpoint()))
            .with_clock(saturday());

        let rec = deriver.derive_forecast(Coordinates::new(0.0, 0.0), "general").await;

        assert_eq!(rec.tomorrow_aqi, 33);
    }

    #[tokio::test]
    async fn category_clause_follows_tomorrow_aqi() {
        let deriver = ForecastDeriver::new(Arc::new(StubSource(Some(today(120, 0.0, 20.0)))))
            .with_random(shared(FixedRandom::midpoint()))
            .with_clock(wednesday());

        let rec = deriver.derive_forecast(Coordinates::new(0.0, 0.0), "child").await;

        assert_eq!(rec.tomorrow_aqi, 120);
        assert!(rec.tip.ends_with("Keep children indoors as much as possible."));
    }

    #[tokio::test]
    async fn upstream_failure_gives_basic_forecast() {
        let random = FixedRandom { fraction: 0.5, normal_offset: 0.0, int_offset: -4 };
        let deriver =
            ForecastDeriver::new(Arc::new(StubSource(None))).with_random(shared(random));

        let rec = deriver.derive_forecast(Coordinates::new(0.0, 0.0), "asthmatic").await;

        assert_eq!(rec.today_aqi, 75);
        assert_eq!(rec.tomorrow_aqi, 71);
        assert_eq!(rec.tip, BASIC_FORECAST_TIP);
        assert_eq!(rec.source, ForecastSource::BasicForecast);
        assert!(rec.confidence.is_none());
        assert!(rec.change.is_none());
        assert!(rec.error.unwrap().contains("aggregator down"));
    }

    #[tokio::test]
    async fn basic_forecast_stays_near_baseline() {
        for seed in 0..100 {
            let deriver = ForecastDeriver::new(Arc::new(StubSource(None)))
                .with_random(shared(SeededRandom::seeded(seed)));

            let rec = deriver.derive_forecast(Coordinates::new(0.0, 0.0), "general").await;

            assert!((70..=80).contains(&rec.tomorrow_aqi));
        }
    }
}

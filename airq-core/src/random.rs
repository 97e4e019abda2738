//! Injectable sources of randomness and time.
//!
//! Fallback values and the forecast's base change are sampled through
//! [`RandomSource`], and every "now" goes through [`Clock`], so tests can pin
//! both down.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

pub trait RandomSource: Send + Debug {
    /// Float drawn uniformly from `[low, high)`.
    fn uniform(&mut self, low: f64, high: f64) -> f64;

    /// Sample from a normal distribution. Returns `mean` when `std_dev` is
    /// negative or not finite.
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64;

    /// Integer drawn uniformly from `[low, high]`.
    fn uniform_int(&mut self, low: i64, high: i64) -> i64;
}

/// Random source shared between requests.
pub type SharedRandom = Arc<Mutex<dyn RandomSource>>;

pub fn shared<R: RandomSource + 'static>(source: R) -> SharedRandom {
    Arc::new(Mutex::new(source))
}

/// Run `f` with the locked source. A poisoned lock is still usable: the
/// generator state cannot be left half-written by a panic.
pub fn with_random<T>(random: &SharedRandom, f: impl FnOnce(&mut dyn RandomSource) -> T) -> T {
    let mut guard = random.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut *guard)
}

#[derive(Debug)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl RandomSource for SeededRandom {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..high)
    }

    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        if std_dev.is_nan() || std_dev < 0.0 {
            return mean;
        }
        match Normal::new(mean, std_dev) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => mean,
        }
    }

    fn uniform_int(&mut self, low: i64, high: i64) -> i64 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Deterministic source: every uniform draw lands at the same fraction of
/// its range, normals return `mean + normal_offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedRandom {
    pub fraction: f64,
    pub normal_offset: f64,
    pub int_offset: i64,
}

impl FixedRandom {
    pub fn midpoint() -> Self {
        Self { fraction: 0.5, normal_offset: 0.0, int_offset: 0 }
    }
}

impl RandomSource for FixedRandom {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.fraction
    }

    fn normal(&mut self, mean: f64, _std_dev: f64) -> f64 {
        mean + self.normal_offset
    }

    fn uniform_int(&mut self, low: i64, high: i64) -> i64 {
        (low + (high - low) / 2 + self.int_offset).clamp(low, high)
    }
}

pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

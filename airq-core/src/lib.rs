//! Core library for the `airq` air-quality service.
//!
//! This crate defines:
//! - Configuration & injected upstream credentials
//! - Clients for the particulate, trace-gas and weather providers
//! - The observation aggregator and its fallback policy
//! - The next-day forecast and health tips
//! - The HTTP router exposing all of the above
//!
//! It is used by `airq-cli`, but can also be embedded in other binaries or services.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod forecast;
pub mod model;
pub mod provider;
pub mod random;
pub mod server;
pub mod tips;

pub use aggregator::Aggregator;
pub use config::{Config, Credentials, Endpoints, ServerConfig};
pub use error::{AggregationError, ForecastError, ProviderError};
pub use forecast::{ForecastDeriver, ObservationSource, RemoteAggregator};
pub use model::{Coordinates, ForecastRecord, ObservationRecord, SourceTag};
pub use provider::{ProviderId, Providers};
pub use tips::select_tip;

use airq_core::{Config, Coordinates, server};
use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, Text};
use serde::Serialize;

use crate::logging;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "airq", version, about = "Air quality aggregation and forecast service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store upstream credentials (Meteomatics login, NASA Earthdata user).
    Configure,

    /// Run the HTTP API.
    Serve {
        /// Address to bind, overrides the config file.
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on, overrides the config file.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print current conditions for a coordinate as JSON.
    Current {
        #[arg(long, default_value_t = 34.05, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, default_value_t = -118.24, allow_negative_numbers = true)]
        lon: f64,
    },

    /// Print tomorrow's AQI forecast for a coordinate as JSON.
    Forecast {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Audience for the health tip, e.g. "asthmatic" or "athlete".
        #[arg(long, default_value = "general")]
        category: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;

        // Prompts and log lines would interleave on the terminal.
        if !matches!(self.command, Command::Configure) {
            logging::init_logging(&config.log_level)?;
            tracing::debug!(endpoints = ?config.endpoints, "Configuration loaded");
        }

        match self.command {
            Command::Configure => configure(config)?,
            Command::Serve { bind, port } => {
                if let Some(bind) = bind {
                    config.server.bind = bind;
                }
                if let Some(port) = port {
                    config.server.port = port;
                }
                server::serve(&config).await?;
            }
            Command::Current { lat, lon } => {
                let state = server::AppState::from_config(&config)?;
                let record = state.aggregator().fetch_observation(Coordinates::new(lat, lon)).await;
                print_json(&record)?;
            }
            Command::Forecast { lat, lon, category } => {
                let state = server::AppState::from_config(&config)?;
                let record =
                    state.deriver().derive_forecast(Coordinates::new(lat, lon), &category).await;
                print_json(&record)?;
            }
        }

        Ok(())
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let creds = &mut config.credentials;

    creds.weather_username =
        Text::new("Meteomatics username:").with_default(&creds.weather_username).prompt()?;
    creds.weather_password = Password::new("Meteomatics password:").without_confirmation().prompt()?;
    creds.earthdata_username =
        Text::new("NASA Earthdata username:").with_default(&creds.earthdata_username).prompt()?;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}

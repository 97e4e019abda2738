use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::PathBuf, time::Duration};

/// Upstream credentials. Injected into the providers, never compiled in.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub weather_username: String,
    pub weather_password: String,
    pub earthdata_username: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.weather_password.is_empty() { "" } else { "***" };
        f.debug_struct("Credentials")
            .field("weather_username", &self.weather_username)
            .field("weather_password", &password)
            .field("earthdata_username", &self.earthdata_username)
            .finish()
    }
}

/// Where the upstream services live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub openaq_base_url: String,
    pub tempo_base_url: String,
    pub tempo_api_key: String,
    pub meteomatics_base_url: String,
    pub weather_model: String,

    /// When set, forecasts read today's conditions from this aggregator
    /// instead of aggregating in-process.
    pub aggregator_url: Option<String>,

    pub timeout_secs: u64,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            openaq_base_url: "https://api.openaq.org".to_string(),
            tempo_base_url: "https://api.nasa.gov".to_string(),
            tempo_api_key: "DEMO_KEY".to_string(),
            meteomatics_base_url: "https://api.meteomatics.com".to_string(),
            weather_model: "mix".to_string(),
            aggregator_url: None,
            timeout_secs: 10,
        }
    }
}

impl Endpoints {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "https://f-air-air-quality-app-ctfq.vercel.app".to_string(),
            ],
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// log_level = "info"
///
/// [credentials]
/// weather_username = "..."
/// weather_password = "..."
/// earthdata_username = "..."
///
/// [endpoints]
/// aggregator_url = "http://localhost:8000"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub credentials: Credentials,
    pub endpoints: Endpoints,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            credentials: Credentials::default(),
            endpoints: Endpoints::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load config from disk (or defaults on first run), then overlay
    /// `.env` and process environment variables.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = Self::config_file_path()?;
        let mut cfg = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        cfg.apply_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "airq", "airq")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay values from `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AIRQ_WEATHER_USERNAME") {
            self.credentials.weather_username = v;
        }
        if let Some(v) = get("AIRQ_WEATHER_PASSWORD") {
            self.credentials.weather_password = v;
        }
        if let Some(v) = get("NASA_EARTHDATA_USERNAME") {
            self.credentials.earthdata_username = v;
        }
        if let Some(v) = get("AIRQ_AGGREGATOR_URL") {
            self.endpoints.aggregator_url = Some(v);
        }
        if let Some(v) = get("AIRQ_LOG_LEVEL") {
            self.log_level = v;
        }
    }
}

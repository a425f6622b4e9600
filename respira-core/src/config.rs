use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf, time::Duration};

use crate::{
    alerts::AlertRule, cache::FRESHNESS_WINDOW, dashboard::REFRESH_INTERVAL, fetcher::SourceKind,
};

pub const DEFAULT_ENDPOINT: &str = "https://81ocg9.buildship.run/latestAirQuality-bc7943d5c68b";

pub const ENDPOINT_ENV: &str = "RESPIRA_ENDPOINT";
pub const SIMULATED_ENV: &str = "RESPIRA_SIMULATED";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// use_simulated_source = false
/// default_location = 5
///
/// [[alerts]]
/// id = "default-aqi"
/// metric = "aqi"
/// threshold = 150.0
/// active = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint returning the latest readings as a JSON array.
    pub endpoint: Option<String>,

    /// Serve generated readings instead of calling the endpoint.
    pub use_simulated_source: bool,

    /// Location id selected on start; the first registry entry if unset.
    pub default_location: Option<u32>,

    pub cache_ttl_secs: u64,
    pub refresh_interval_secs: u64,
    pub request_timeout_secs: u64,

    pub alerts: Vec<AlertRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            use_simulated_source: false,
            default_location: None,
            cache_ttl_secs: FRESHNESS_WINDOW.as_secs(),
            refresh_interval_secs: REFRESH_INTERVAL.as_secs(),
            request_timeout_secs: 15,
            alerts: AlertRule::defaults(),
        }
    }
}

impl Config {
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn source_kind(&self) -> SourceKind {
        if self.use_simulated_source { SourceKind::Simulated } else { SourceKind::Live }
    }

    pub fn set_source(&mut self, kind: SourceKind) {
        self.use_simulated_source = kind == SourceKind::Simulated;
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    /// Environment overrides are applied on top.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;

        let mut cfg = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        cfg.apply_overrides(
            env::var(ENDPOINT_ENV).ok(),
            env::var(SIMULATED_ENV).ok(),
        )?;
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
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
        let dirs = ProjectDirs::from("dev", "respira", "respira")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            return Err(anyhow!("refresh_interval_secs must be greater than zero"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be greater than zero"));
        }
        Ok(())
    }

    fn apply_overrides(
        &mut self,
        endpoint: Option<String>,
        simulated: Option<String>,
    ) -> Result<()> {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            self.endpoint = Some(endpoint);
        }

        if let Some(flag) = simulated {
            self.use_simulated_source = match flag.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => {
                    return Err(anyhow!(
                        "Invalid value '{other}' for {SIMULATED_ENV}.\n\
                         Hint: use true or false."
                    ));
                }
            };
        }

        Ok(())
    }
}

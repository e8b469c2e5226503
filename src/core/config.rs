use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_COUNTRIES_URL: &str = "https://restcountries.com";
pub const DEFAULT_RATES_URL: &str = "https://open.er-api.com";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default = "default_countries_source")]
    pub countries: SourceConfig,
    #[serde(default = "default_rates_source")]
    pub rates: SourceConfig,
}

fn default_countries_source() -> SourceConfig {
    SourceConfig {
        base_url: DEFAULT_COUNTRIES_URL.to_string(),
    }
}

fn default_rates_source() -> SourceConfig {
    SourceConfig {
        base_url: DEFAULT_RATES_URL.to_string(),
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            countries: default_countries_source(),
            rates: default_rates_source(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct SummaryConfig {
    /// Where the rendered summary is written. Defaults under `data_path`.
    pub path: Option<String>,
    /// Font embedded into the summary; the generic family is used when unset
    /// or unreadable.
    pub font_path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub summary: SummaryConfig,
    pub data_path: Option<String>,
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            server: ServerConfig::default(),
            cache_ttl_secs: default_cache_ttl_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            summary: SummaryConfig::default(),
            data_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults
    /// when no file exists there yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "gdpx", "gdpx")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "gdpx", "gdpx")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn summary_path(&self) -> Result<PathBuf> {
        match &self.summary.path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(self.data_path()?.join("cache").join("summary.svg")),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config.with_env_overrides())
    }

    /// Applies `PORT` and `CACHE_TTL_SECONDS` from the environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Some(ttl) = lookup("CACHE_TTL_SECONDS") {
            match ttl.parse() {
                Ok(ttl) => self.cache_ttl_secs = ttl,
                Err(_) => warn!("Ignoring invalid CACHE_TTL_SECONDS value: {}", ttl),
            }
        }
        self
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings file for the dashboard.
///
/// Every field has a default, so the file is optional. It is loaded from
/// the current directory or from a path given with `--config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DashboardConfig {
    /// Number of most recent versions to show
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Page auto-refresh interval
    #[serde(default = "default_refresh_seconds")]
    pub refresh_seconds: u64,

    /// Deadline for building one page
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Concurrent `input_to` queries per page (defaults to `limit`)
    pub max_in_flight: Option<usize>,

    /// Jobs to show when neither `--jobs` nor standard input provides them
    #[serde(default)]
    pub jobs: Vec<String>,

    /// Stylesheets linked from the page head
    #[serde(default = "default_stylesheets")]
    pub stylesheets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Address used with `--local`
    #[serde(default = "default_local_addr")]
    pub local_addr: String,

    /// Port used without `--local` when `PORT` is unset
    pub port: Option<u16>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            refresh_seconds: default_refresh_seconds(),
            request_timeout_seconds: default_request_timeout_seconds(),
            max_in_flight: None,
            jobs: Vec::new(),
            stylesheets: default_stylesheets(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            local_addr: default_local_addr(),
            port: None,
        }
    }
}

fn default_limit() -> usize {
    5
}

fn default_refresh_seconds() -> u64 {
    30
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_stylesheets() -> Vec<String> {
    vec![
        "https://bootswatch.com/4/darkly/bootstrap.css".to_string(),
        "https://bootswatch.com/_assets/css/custom.min.css".to_string(),
    ]
}

fn default_local_addr() -> String {
    "127.0.0.1:12345".to_string()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./progress-board.toml
    /// 3. ./progress-board.json
    /// 4. ./progress-board.yaml
    /// 5. ./progress-board.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if path.exists() {
                return Self::load_from_path(path);
            }
            log::warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let candidates = [
            "progress-board.toml",
            "progress-board.json",
            "progress-board.yaml",
            "progress-board.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        let config: Self = match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

/// Immutable per-process settings handed to every request.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub limit: usize,
    pub max_in_flight: usize,
    pub refresh_seconds: u64,
    pub request_timeout: Duration,
    pub stylesheets: Vec<String>,
}

impl From<&DashboardConfig> for DashboardSettings {
    fn from(config: &DashboardConfig) -> Self {
        let limit = config.limit.max(1);
        Self {
            limit,
            max_in_flight: config.max_in_flight.unwrap_or(limit).max(1),
            refresh_seconds: config.refresh_seconds,
            request_timeout: Duration::from_secs(config.request_timeout_seconds.max(1)),
            stylesheets: config.stylesheets.clone(),
        }
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self::from(&DashboardConfig::default())
    }
}

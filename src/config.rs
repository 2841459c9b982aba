//! Application configuration
//!
//! The configuration is a JSON file in the platform config directory.
//! Missing files and missing fields fall back to defaults; CLI flags and
//! their environment variables override the file.

use anyhow::{Context, Result};
use app_core::ConferenceTimezone;
use conference_client::ApiClientConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default API server
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Companion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// API base URL including the `/api` prefix
    pub api_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for reads that hit a network error; 0 sends each read once
    pub read_retries: usize,
    /// Directory for the session token and preferences
    pub data_dir: Option<PathBuf>,
    /// Agenda file replacing the bundled agenda
    pub agenda_file: Option<PathBuf>,
    /// Conference timezone replacing the agenda's own
    pub timezone: Option<ConferenceTimezone>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let api = ApiClientConfig::default();
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: api.timeout.as_secs(),
            read_retries: api.read_retries,
            data_dir: None,
            agenda_file: None,
            timezone: None,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the platform default location
    ///
    /// A missing file yields the defaults; an unreadable one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::config_path() {
                Some(path) => path,
                None => {
                    tracing::debug!("no config directory on this platform, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Save to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply CLI overrides
    pub fn with_overrides(mut self, api_url: Option<String>, data_dir: Option<PathBuf>) -> Self {
        if let Some(api_url) = api_url {
            self.api_url = api_url;
        }
        if data_dir.is_some() {
            self.data_dir = data_dir;
        }
        self
    }

    /// HTTP client configuration
    pub fn api_config(&self) -> ApiClientConfig {
        ApiClientConfig::new(self.api_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_read_retries(self.read_retries)
    }

    /// Data directory, falling back to the platform data directory
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .context("Failed to determine the data directory; pass --data-dir")
    }

    /// Default platform-specific configuration path
    pub fn config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "conference", "companion")
}

//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file. Root folder resolution
//! follows the priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ROOT_FOLDER_ENV: &str = "COMPETHINK_ROOT_FOLDER";
pub const DATABASE_FILE: &str = "compethink.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the SQLite store
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// SEO-metrics provider credential (lowest-priority source)
    #[serde(default)]
    pub seo_api_key: Option<String>,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub relays: RelayConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Provider endpoints and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_seo_base_url")]
    pub seo_base_url: String,
    /// Regional database queried on the SEO-metrics provider
    #[serde(default = "default_seo_database")]
    pub seo_database: String,
    /// Number of AI keyword records requested per domain
    #[serde(default = "default_ai_keyword_limit")]
    pub ai_keyword_limit: u32,

    #[serde(default = "default_performance_base_url")]
    pub performance_base_url: String,
    #[serde(default)]
    pub performance_api_key: Option<String>,

    #[serde(default = "default_ai_base_url")]
    pub ai_base_url: String,
    #[serde(default = "default_ai_model")]
    pub ai_model: String,
    #[serde(default)]
    pub ai_api_key: Option<String>,
    #[serde(default = "default_ai_timeout_ms")]
    pub ai_timeout_ms: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            seo_base_url: default_seo_base_url(),
            seo_database: default_seo_database(),
            ai_keyword_limit: default_ai_keyword_limit(),
            performance_base_url: default_performance_base_url(),
            performance_api_key: None,
            ai_base_url: default_ai_base_url(),
            ai_model: default_ai_model(),
            ai_api_key: None,
            ai_timeout_ms: default_ai_timeout_ms(),
        }
    }
}

/// Public relays used to reach the SEO-metrics provider
///
/// Each template must contain `{url}`, replaced by the percent-encoded target
/// URL. `{nonce}` (optional) is replaced by a cache-busting timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_templates")]
    pub templates: Vec<String>,
    /// Retries per relay after the first attempt
    #[serde(default = "default_relay_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_relay_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_relay_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            templates: default_relay_templates(),
            max_retries: default_relay_max_retries(),
            initial_backoff_ms: default_relay_backoff_ms(),
            timeout_ms: default_relay_timeout_ms(),
        }
    }
}

/// Retry budget for the page-performance provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_performance_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_performance_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_performance_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_retries: default_performance_max_retries(),
            initial_backoff_ms: default_performance_backoff_ms(),
            timeout_ms: default_performance_timeout_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_seo_base_url() -> String {
    "https://apiv2.seozoom.com/api/v2/domains/".to_string()
}

fn default_seo_database() -> String {
    "it".to_string()
}

fn default_ai_keyword_limit() -> u32 {
    100
}

fn default_performance_base_url() -> String {
    "https://www.googleapis.com/pagespeedonline/v5/runPagespeed".to_string()
}

fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_ai_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_ai_timeout_ms() -> u64 {
    120_000
}

fn default_relay_templates() -> Vec<String> {
    vec![
        "https://api.allorigins.win/get?url={url}&_={nonce}".to_string(),
        "https://corsproxy.io/?{url}".to_string(),
        "https://api.codetabs.com/v1/proxy?quest={url}".to_string(),
    ]
}

fn default_relay_max_retries() -> u32 {
    1
}

fn default_relay_backoff_ms() -> u64 {
    1500
}

fn default_relay_timeout_ms() -> u64 {
    25_000
}

fn default_performance_max_retries() -> u32 {
    2
}

fn default_performance_backoff_ms() -> u64 {
    2000
}

fn default_performance_timeout_ms() -> u64 {
    60_000
}

impl TomlConfig {
    /// Reject configurations the sync engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.relays.templates.is_empty() {
            return Err(Error::Config("at least one relay template is required".to_string()));
        }
        if let Some(bad) = self.relays.templates.iter().find(|t| !t.contains("{url}")) {
            return Err(Error::Config(format!(
                "relay template '{}' has no {{url}} placeholder",
                bad
            )));
        }
        if self.relays.timeout_ms == 0
            || self.performance.timeout_ms == 0
            || self.providers.ai_timeout_ms == 0
        {
            return Err(Error::Config("timeouts must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Load a TOML configuration file
///
/// A missing file yields the built-in defaults; a malformed file is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No TOML config found, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;
    config.validate()?;

    tracing::info!(path = %path.display(), "Loaded TOML config");
    Ok(config)
}

/// Write a TOML configuration file, replacing it atomically
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("compethink").join("config.toml"))
}

/// Resolve the root folder holding the store
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    get_default_root_folder()
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("compethink"))
        .unwrap_or_else(|| PathBuf::from("./compethink_data"))
}

//! Credential resolution
//!
//! Provides multi-tier resolution with Store → ENV → TOML priority. The
//! resolved SEO key is kept in the audit itself (`api_key`), so the store
//! tier is the current audit.

use compethink_common::config::{load_toml_config, write_toml_config, TomlConfig};
use compethink_common::model::MarketAudit;
use compethink_common::{Error, Result};
use std::path::Path;
use tracing::{info, warn};

pub const SEO_API_KEY_ENV: &str = "COMPETHINK_SEO_API_KEY";
pub const AI_API_KEY_ENV: &str = "COMPETHINK_AI_API_KEY";

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the SEO-metrics credential
///
/// **Priority:** current audit → `COMPETHINK_SEO_API_KEY` → TOML `seo_api_key`
pub fn resolve_seo_api_key(audit: &MarketAudit, toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var(SEO_API_KEY_ENV).ok();
    let candidates = [
        ("store", Some(audit.api_key.as_str())),
        ("environment", env_key.as_deref()),
        ("TOML", toml_config.seo_api_key.as_deref()),
    ];

    let valid: Vec<(&str, &str)> = candidates
        .iter()
        .filter_map(|(source, key)| key.filter(|k| is_valid_key(k)).map(|k| (*source, k)))
        .collect();

    if valid.len() > 1 {
        let sources: Vec<&str> = valid.iter().map(|(source, _)| *source).collect();
        warn!(
            "SEO API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    match valid.first() {
        Some((source, key)) => {
            info!("SEO API key loaded from {}", source);
            Ok(key.trim().to_string())
        }
        None => Err(Error::Config(format!(
            "SEO API key not configured. Configure it with one of:\n\
             1. CLI: compethink set-key <key>\n\
             2. Environment: {SEO_API_KEY_ENV}=your-key\n\
             3. TOML config: seo_api_key = \"your-key\""
        ))),
    }
}

/// Resolve the AI-simulation credential (environment → TOML); optional
pub fn resolve_ai_api_key(toml_config: &TomlConfig) -> Option<String> {
    if let Some(key) = std::env::var(AI_API_KEY_ENV).ok().filter(|k| is_valid_key(k)) {
        info!("AI API key loaded from environment variable");
        return Some(key.trim().to_string());
    }
    let key = toml_config
        .providers
        .ai_api_key
        .as_deref()
        .filter(|k| is_valid_key(k))
        .map(|k| k.trim().to_string());
    if key.is_none() {
        info!("No AI API key configured; AI simulation will be skipped");
    }
    key
}

/// Write the SEO key back to the TOML file so a fresh store can recover it
pub fn sync_seo_key_to_toml(key: &str, toml_path: &Path) -> Result<()> {
    let mut config = load_toml_config(toml_path)?;
    if config.seo_api_key.as_deref() == Some(key) {
        return Ok(());
    }
    config.seo_api_key = Some(key.to_string());
    write_toml_config(&config, toml_path)?;
    info!(path = %toml_path.display(), "SEO API key written back to TOML config");
    Ok(())
}

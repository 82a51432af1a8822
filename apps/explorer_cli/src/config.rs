use std::{fs, path::Path};

use anyhow::Context;
use client_core::{processing::normalize_base_url, DEFAULT_API_BASE_URL};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "explorer.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `None` when configured as empty; requests then fail as unavailable.
    pub api_base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: Some(DEFAULT_API_BASE_URL.into()),
            request_timeout_secs: 60,
            log_filter: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    log_filter: Option<String>,
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(CONFIG_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then `path` if it exists, then the environment.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();
    let mut api_base_url = DEFAULT_API_BASE_URL.to_string();

    if let Ok(raw) = fs::read_to_string(path) {
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse '{}'", path.display()))?;
        if let Some(v) = file_cfg.api_base_url {
            api_base_url = v;
        }
        if let Some(v) = file_cfg.request_timeout_secs {
            settings.request_timeout_secs = v;
        }
        if let Some(v) = file_cfg.log_filter {
            settings.log_filter = v;
        }
    }

    if let Some(v) = env("API_BASE_URL") {
        api_base_url = v;
    }
    if let Some(v) = env("APP__API_BASE_URL") {
        api_base_url = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    settings.api_base_url = configured_base_url(&api_base_url)?;
    Ok(settings)
}

/// An empty value means no processing service is configured.
pub fn configured_base_url(raw: &str) -> anyhow::Result<Option<String>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    normalize_base_url(raw).map(Some)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

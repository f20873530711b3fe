//! Configuration management for the WIS speech-to-text adapter.
//!
//! The adapter reads a single JSON file at `~/.wis-stt/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (WIS_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `WIS_STT_URL` → stt.url
//! - `WIS_STT_BACKUP_URL` → stt.backup_url
//! - `WIS_STT_MODEL` → stt.model
//! - `WIS_STT_LANGUAGE` → stt.language
//! - `WIS_STT_CERT_VALIDATION` → stt.cert_validation
//! - `WIS_LOG_LEVEL` → observability.log_level
//! - `WIS_LOG_FORMAT` → observability.log_format

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ResultExt};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".wis-stt"),
        |dirs| dirs.home_dir().join(".wis-stt"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Speech-to-text entry
// ============================================================================

/// Settings for one WIS speech-to-text entry.
///
/// Mirrors the fields a host stores for a configured entry. Every value is
/// passed explicitly into the transcriber; nothing reads it globally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SttConfig {
    /// Host-assigned entry identifier, used to derive the unique id.
    #[serde(default = "default_entry_id")]
    pub entry_id: String,

    /// Primary transcription endpoint.
    #[serde(default)]
    pub url: String,

    /// Backup endpoint. Empty means no backup.
    #[serde(default)]
    pub backup_url: String,

    /// Validate TLS certificates of the endpoints.
    #[serde(default = "default_true")]
    pub cert_validation: bool,

    /// Model requested from the server.
    #[serde(default = "default_model")]
    pub model: String,

    /// Ask the server to detect the spoken language.
    #[serde(default)]
    pub detect_language: bool,

    /// Language to return and force.
    #[serde(default = "default_language")]
    pub language: String,

    /// Beam search width.
    #[serde(default = "default_beam_size")]
    pub beam_size: u32,

    /// Speaker identifier forwarded to the server.
    #[serde(default)]
    pub speaker: String,

    /// Ask the server to keep a copy of the audio.
    #[serde(default)]
    pub save_audio: bool,

    /// Whole-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            entry_id: default_entry_id(),
            url: String::new(),
            backup_url: String::new(),
            cert_validation: true,
            model: default_model(),
            detect_language: false,
            language: default_language(),
            beam_size: default_beam_size(),
            speaker: String::new(),
            save_audio: false,
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl SttConfig {
    /// Backup endpoint, if one is configured.
    pub fn backup_url(&self) -> Option<&str> {
        let url = self.backup_url.trim();
        (!url.is_empty()).then_some(url)
    }
}

fn default_entry_id() -> String {
    "wisstt-local".into()
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    "medium".into()
}

fn default_language() -> String {
    "en".into()
}

fn default_beam_size() -> u32 {
    1
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to hold at `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Speech-to-text entry
    #[serde(default)]
    pub stt: SttConfig,

    /// Logging
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration (default path or `path`) with environment overrides.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("WIS_STT_URL") {
            self.stt.url = url;
        }
        if let Some(url) = lookup("WIS_STT_BACKUP_URL") {
            self.stt.backup_url = url;
        }
        if let Some(model) = lookup("WIS_STT_MODEL") {
            self.stt.model = model;
        }
        if let Some(language) = lookup("WIS_STT_LANGUAGE") {
            self.stt.language = language;
        }
        if let Some(flag) = lookup("WIS_STT_CERT_VALIDATION") {
            match parse_flag(&flag) {
                Some(v) => self.stt.cert_validation = v,
                None => tracing::warn!(
                    value = %flag,
                    keep = self.stt.cert_validation,
                    "Ignoring unrecognized WIS_STT_CERT_VALIDATION"
                ),
            }
        }

        if let Some(level) = lookup("WIS_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("WIS_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }
}

/// Boolean env value: true/false, 1/0, yes/no, on/off in any case.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

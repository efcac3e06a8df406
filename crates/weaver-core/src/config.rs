//! Configuration types.
//!
//! `config.toml` carries [`AppConfig`]; `secret.json` carries [`SecretConfig`].
//! Loading and path resolution live in `weaver-infrastructure`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_MODEL_NAME: &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_REPORT_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 60;

/// Root of `config.toml`. Missing tables and keys fall back to defaults.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// `[model]` table.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ModelConfig {
    pub model_name: String,
    pub base_url: String,
    pub report_timeout_secs: u64,
    pub chat_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            report_timeout_secs: DEFAULT_REPORT_TIMEOUT_SECS,
            chat_timeout_secs: DEFAULT_CHAT_TIMEOUT_SECS,
        }
    }
}

impl ModelConfig {
    pub fn timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            report: Duration::from_secs(self.report_timeout_secs),
            chat: Duration::from_secs(self.chat_timeout_secs),
        }
    }
}

/// `[log]` table.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Deadlines applied to model calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    pub report: Duration,
    pub chat: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        ModelConfig::default().timeouts()
    }
}

/// Root configuration structure for secret.json
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SecretConfig {
    #[serde(default)]
    pub gemini: Option<GeminiConfig>,
}

impl SecretConfig {
    /// The Gemini key, if configured and not blank.
    pub fn gemini_api_key(&self) -> Option<&str> {
        self.gemini
            .as_ref()
            .map(|gemini| gemini.api_key.trim())
            .filter(|key| !key.is_empty())
    }
}

/// Gemini API configuration
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key: String,
    #[serde(default)]
    pub model_name: Option<String>,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model_name", &self.model_name)
            .finish()
    }
}

//! Secret service implementation.
//!
//! Reads API keys from `secret.json` and lets environment variables take
//! precedence over the file.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use weaver_core::config::SecretConfig;
use weaver_core::secret::SecretService;
use weaver_core::{Result, WeaverError};

use crate::paths::WeaverPaths;

/// Environment variables checked for the Gemini key, highest priority first.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Loads `secret.json` once and caches it.
#[derive(Clone)]
pub struct SecretServiceImpl {
    path: PathBuf,
    secrets: Arc<RwLock<Option<SecretConfig>>>,
}

impl SecretServiceImpl {
    pub fn new(paths: &WeaverPaths) -> Self {
        Self {
            path: paths.secret_file(),
            secrets: Arc::new(RwLock::new(None)),
        }
    }

    async fn load_from_file(&self) -> Result<SecretConfig> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no secret file");
                return Ok(SecretConfig::default());
            }
            Err(err) => return Err(err.into()),
        };
        // serde_json errors may quote the input, so only the position is kept.
        serde_json::from_str(&text).map_err(|err| {
            WeaverError::config(format!(
                "{} is not valid JSON (line {}, column {})",
                self.path.display(),
                err.line(),
                err.column()
            ))
        })
    }
}

#[async_trait::async_trait]
impl SecretService for SecretServiceImpl {
    async fn load_secrets(&self) -> Result<SecretConfig> {
        if let Some(cached) = self.secrets.read().await.as_ref() {
            return Ok(cached.clone());
        }
        let loaded = self.load_from_file().await?;
        *self.secrets.write().await = Some(loaded.clone());
        Ok(loaded)
    }

    async fn secret_file_exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }
}

/// Resolves the Gemini API key from the process environment and the secrets.
pub fn resolve_api_key(secrets: &SecretConfig) -> Result<String> {
    resolve_api_key_with(secrets, |name| std::env::var(name).ok())
}

/// Resolves the key with a custom environment lookup.
///
/// `GEMINI_API_KEY` wins over `API_KEY`, which wins over `secret.json`.
/// Blank values are skipped. No key at all is a `Config` error.
pub fn resolve_api_key_with<F>(secrets: &SecretConfig, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    for name in API_KEY_ENV_VARS {
        if let Some(value) = lookup(name) {
            let value = value.trim();
            if !value.is_empty() {
                tracing::debug!(source = name, "using API key from environment");
                return Ok(value.to_string());
            }
        }
    }
    secrets
        .gemini_api_key()
        .map(str::to_string)
        .ok_or_else(|| {
            WeaverError::config(
                "no Gemini API key: set GEMINI_API_KEY or fill in gemini.api_key in secret.json",
            )
        })
}

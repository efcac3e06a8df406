//! Unified path management for Dreamweaver configuration files.
//!
//! ```text
//! ~/.config/dreamweaver/       # Config directory
//! ├── config.toml              # Application configuration
//! ├── secret.json              # API keys
//! └── logs/                    # Application logs
//!     └── weaver.log.YYYY-MM-DD
//! ```

use std::path::{Path, PathBuf};

use weaver_core::config::{GeminiConfig, SecretConfig};
use weaver_core::{Result, WeaverError};

const APP_DIR_NAME: &str = "dreamweaver";

/// Resolves every file location from one config directory.
///
/// The directory is the platform config dir joined with `dreamweaver`, unless
/// an explicit base path is given (the `--config-dir` flag, or a temp dir in
/// tests).
#[derive(Debug, Clone)]
pub struct WeaverPaths {
    config_dir: PathBuf,
}

impl WeaverPaths {
    pub fn new(base_path: Option<&Path>) -> Result<Self> {
        let config_dir = match base_path {
            Some(base) => base.to_path_buf(),
            None => dirs::config_dir()
                .ok_or_else(|| WeaverError::config("Cannot find home directory"))?
                .join(APP_DIR_NAME),
        };
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Path to `secret.json`.
    ///
    /// Keep this file at mode 600.
    pub fn secret_file(&self) -> PathBuf {
        self.config_dir.join("secret.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.config_dir.join("logs")
    }

    /// Ensures the secret file exists, creating it with a template if it doesn't.
    ///
    /// The template holds an empty Gemini key. On Unix the new file gets mode 600.
    pub fn ensure_secret_file(&self) -> Result<PathBuf> {
        let secret_path = self.secret_file();
        if secret_path.exists() {
            return Ok(secret_path);
        }
        std::fs::create_dir_all(&self.config_dir)?;

        let template = SecretConfig {
            gemini: Some(GeminiConfig {
                api_key: String::new(),
                model_name: None,
            }),
        };
        std::fs::write(&secret_path, serde_json::to_string_pretty(&template)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&secret_path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::info!(path = %secret_path.display(), "created secret file template");
        Ok(secret_path)
    }
}

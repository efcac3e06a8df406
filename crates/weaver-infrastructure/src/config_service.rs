//! Configuration service implementation.
//!
//! Loads [`AppConfig`] from `config.toml` in the config directory.

use std::sync::{Arc, PoisonError, RwLock};

use weaver_core::config::AppConfig;
use weaver_core::{Result, WeaverError};

use crate::paths::WeaverPaths;

/// Loads and caches the application configuration.
///
/// A missing file yields defaults; a malformed one is a `Config` error.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: WeaverPaths,
    config: Arc<RwLock<Option<AppConfig>>>,
}

impl ConfigService {
    pub fn new(paths: WeaverPaths) -> Self {
        Self {
            paths,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<AppConfig> {
        if let Some(cached) = self
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(cached.clone());
        }

        let loaded = self.load_config()?;
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded.clone());
        Ok(loaded)
    }

    fn load_config(&self) -> Result<AppConfig> {
        let path = self.paths.config_file();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(AppConfig::default());
            }
            Err(err) => return Err(err.into()),
        };

        AppConfig::from_toml_str(&text).map_err(|err| {
            WeaverError::config(format!("{}: {}", path.display(), err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use weaver_core::config::DEFAULT_MODEL_NAME;

    fn service_in(dir: &TempDir) -> ConfigService {
        ConfigService::new(WeaverPaths::new(Some(dir.path())).unwrap())
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = service_in(&dir).get_config().unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.model.model_name, DEFAULT_MODEL_NAME);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[model]\nchat_timeout_secs = 15\n\n[log]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = service_in(&dir).get_config().unwrap();
        assert_eq!(config.model.chat_timeout_secs, 15);
        assert_eq!(config.model.report_timeout_secs, 90);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[model\nmodel_name = ").unwrap();

        let err = service_in(&dir).get_config().unwrap_err();
        assert!(matches!(err, WeaverError::Config(ref msg) if msg.contains("config.toml")));
    }

    #[test]
    fn config_is_read_once() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);
        assert_eq!(service.get_config().unwrap().log.level, "info");

        std::fs::write(dir.path().join("config.toml"), "[log]\nlevel = \"warn\"\n").unwrap();
        assert_eq!(service.get_config().unwrap().log.level, "info");
        assert_eq!(service_in(&dir).get_config().unwrap().log.level, "warn");
    }
}

//! File-backed configuration for Dreamweaver.
//!
//! Resolves the config directory, loads `config.toml` and `secret.json`,
//! and applies environment overrides for the API key.

pub mod config_service;
pub mod paths;
pub mod secret_service;

pub use config_service::ConfigService;
pub use paths::WeaverPaths;
pub use secret_service::{SecretServiceImpl, resolve_api_key};

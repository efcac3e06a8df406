//! Domain layer for Dreamweaver.
//!
//! Value types for dream entries, reports and chat, the error taxonomy, and
//! the [`model::ModelClient`] seam every session talks through.

pub mod chat;
pub mod config;
pub mod dream;
pub mod error;
pub mod model;
pub mod report;
pub mod secret;

pub use error::{Result, WeaverError};

//! The seam between Dreamweaver and the hosted generative-model provider.
//!
//! Sessions only ever talk to a [`ModelClient`]; the concrete REST client
//! lives in `weaver-interaction` and tests substitute scripted doubles.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::ChatRole;

/// One prior or current turn of conversational context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: ChatRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// A single outbound generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerateRequest {
    /// System-level instruction sent alongside the contents.
    pub system_instruction: Option<String>,
    /// Ordered turns; the last one is the new user input.
    pub contents: Vec<Turn>,
    /// Output schema. When present the provider must answer with JSON.
    pub response_schema: Option<serde_json::Value>,
}

impl GenerateRequest {
    /// Text of the newest user turn, if any.
    pub fn latest_user_text(&self) -> Option<&str> {
        self.contents
            .iter()
            .rev()
            .find(|turn| turn.role == ChatRole::User)
            .map(|turn| turn.text.as_str())
    }
}

/// Failures at the provider boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The request never produced an HTTP response.
    #[error("model request failed: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("model provider returned {status}: {message}")]
    Http {
        status: u16,
        message: String,
        is_retryable: bool,
        retry_after: Option<Duration>,
    },

    /// No answer within the configured deadline.
    #[error("model request timed out after {0:?}")]
    Timeout(Duration),

    /// The provider answered with a body we could not read.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { is_retryable, .. } => *is_retryable,
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::InvalidResponse(_) => false,
        }
    }
}

/// Generative-model backend.
///
/// Returns the concatenated text of the first candidate. An empty string is a
/// valid answer; callers decide what an empty reply means.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Model identifier used for logging.
    fn model_name(&self) -> &str;

    async fn generate(&self, request: GenerateRequest) -> Result<String, ModelError>;
}

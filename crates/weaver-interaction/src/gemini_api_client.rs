//! GeminiApiClient - Direct REST API implementation for Gemini.
//!
//! Calls `models/{model}:generateContent` with optional system instruction,
//! multi-turn contents and a JSON response schema.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use weaver_core::config::{DEFAULT_BASE_URL, ModelConfig};
use weaver_core::model::{GenerateRequest, ModelClient, ModelError, Turn};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client implementation that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiApiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    http_timeout: Option<Duration>,
}

impl GeminiApiClient {
    /// Creates a new client with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http_timeout: None,
        }
    }

    /// Builds a client from the `[model]` config table.
    ///
    /// The transport timeout is the longer of the two session deadlines.
    pub fn from_config(api_key: impl Into<String>, config: &ModelConfig) -> Result<Self, ModelError> {
        let timeouts = config.timeouts();
        let client = Self::new(api_key, config.model_name.clone())
            .with_base_url(config.base_url.clone())
            .with_http_timeout(timeouts.report.max(timeouts.chat))?;
        Ok(client)
    }

    /// Points the client at another endpoint (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Rebuilds the HTTP client with a whole-request timeout.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Result<Self, ModelError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ModelError::Transport(format!("failed to build HTTP client: {err}")))?;
        self.http_timeout = Some(timeout);
        Ok(self)
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String, ModelError> {
        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            tracing::warn!(
                model = %self.model,
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Gemini API returned an error status"
            );
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| ModelError::InvalidResponse(format!("Failed to parse Gemini response: {err}")))?;

        let text = extract_text_response(parsed);
        tracing::debug!(
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            reply_len = text.len(),
            "Gemini API call completed"
        );
        Ok(text)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ModelError {
        if err.is_timeout() {
            if let Some(timeout) = self.http_timeout {
                return ModelError::Timeout(timeout);
            }
        }
        ModelError::Transport(format!("Gemini API request failed: {err}"))
    }
}

impl std::fmt::Debug for GeminiApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiApiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("http_timeout", &self.http_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ModelClient for GeminiApiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ModelError> {
        let body = GenerateContentRequest::from(request);
        self.send_request(&body).await
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl From<GenerateRequest> for GenerateContentRequest {
    fn from(request: GenerateRequest) -> Self {
        let contents = request.contents.into_iter().map(Content::from).collect();
        let system_instruction = request.system_instruction.map(|text| SystemInstruction {
            parts: vec![Part { text }],
        });
        let generation_config = request.response_schema.map(|schema| GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: schema,
        });
        Self {
            contents,
            system_instruction,
            generation_config,
        }
    }
}

#[derive(Serialize, Debug)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

impl From<Turn> for Content {
    fn from(turn: Turn) -> Self {
        Self {
            role: turn.role.as_str(),
            parts: vec![Part { text: turn.text }],
        }
    }
}

#[derive(Serialize, Debug)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize, Debug)]
struct Part {
    text: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[allow(dead_code)]
    code: Option<i32>,
    message: Option<String>,
    status: Option<String>,
}

/// Concatenated text of the first candidate; empty when there is none.
fn extract_text_response(response: GenerateContentResponse) -> String {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        tracing::warn!(block_reason = reason, "Gemini blocked the prompt");
    }

    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> ModelError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    ModelError::Http {
        status: status.as_u16(),
        message,
        is_retryable,
        retry_after,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    // HTTP-date form is not used by Gemini
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

//! Minimal Google Gemini API client.
//!
//! This crate provides a focused client for Gemini's `generateContent`
//! endpoint with:
//! - Single-turn and multi-turn text completions
//! - System instructions and sampling configuration
//! - Typed API errors that keep the server's status and reason

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Errors that can occur when using the Gemini client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        /// Canonical status name, e.g. `RESOURCE_EXHAUSTED`.
        code: Option<String>,
        /// First `reason` found in the error details, e.g. `API_KEY_INVALID`.
        reason: Option<String>,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Response contained no text (finish reason: {0:?})")]
    EmptyResponse(Option<FinishReason>),
}

impl Error {
    /// Whether the server rejected the credential.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Error::NoApiKey => true,
            Error::Api {
                status,
                reason,
                message,
                ..
            } => {
                matches!(status, 401 | 403)
                    || reason.as_deref() == Some("API_KEY_INVALID")
                    || message.contains("API key not valid")
                    || message.contains("API_KEY_INVALID")
            }
            _ => false,
        }
    }

    /// Whether the request failed because the quota is exhausted.
    pub fn is_quota_error(&self) -> bool {
        match self {
            Error::Api {
                status,
                code,
                message,
                ..
            } => {
                *status == 429
                    || code.as_deref() == Some("RESOURCE_EXHAUSTED")
                    || message.to_lowercase().contains("quota")
            }
            _ => false,
        }
    }
}

/// Gemini API client.
#[derive(Clone)]
pub struct Gemini {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for Gemini {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gemini")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Gemini {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Create a Gemini client from the GEMINI_API_KEY environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| Error::NoApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// A copy of this client that authenticates with another key.
    ///
    /// The underlying connection pool is shared.
    pub fn with_api_key(&self, api_key: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            api_key: api_key.into(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
        }
    }

    /// The model used when a request does not name one.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a completion request and return the full response.
    pub async fn complete(&self, request: Request) -> Result<Response, Error> {
        let headers = self.build_headers()?;
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let api_request = build_api_request(&request);

        tracing::debug!(model = %model, messages = request.messages.len(), "gemini generateContent");

        let response = self
            .client
            .post(format!("{}/models/{model}:generateContent", self.base_url))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(parse_api_error(status, &body));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(parse_response(api_response, model))
    }

    /// Convenience wrapper: send a request and return its text, failing if
    /// the model produced none.
    pub async fn generate_text(&self, request: Request) -> Result<String, Error> {
        let response = self.complete(request).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(Error::EmptyResponse(response.finish_reason));
        }
        Ok(text)
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        if self.api_key.trim().is_empty() {
            return Err(Error::NoApiKey);
        }
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(self.api_key.trim())
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }
}

fn build_api_request(request: &Request) -> ApiRequest {
    let contents = request
        .messages
        .iter()
        .map(|m| ApiContent {
            role: Some(
                match m.role {
                    Role::User => "user",
                    Role::Model => "model",
                }
                .to_string(),
            ),
            parts: vec![ApiPart {
                text: Some(m.text.clone()),
            }],
        })
        .collect();

    let system_instruction = request.system.as_ref().map(|s| ApiContent {
        role: None,
        parts: vec![ApiPart {
            text: Some(s.clone()),
        }],
    });

    let config = &request.config;
    let generation_config = if config.is_empty() {
        None
    } else {
        Some(ApiGenerationConfig {
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
        })
    };

    ApiRequest {
        contents,
        system_instruction,
        generation_config,
    }
}

fn parse_response(api_response: ApiResponse, requested_model: String) -> Response {
    let candidate = api_response.candidates.into_iter().next();

    let (text, finish_reason) = match candidate {
        Some(c) => {
            let text = c
                .content
                .map(|content| {
                    content
                        .parts
                        .into_iter()
                        .filter_map(|p| p.text)
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default();
            (text, c.finish_reason.as_deref().map(FinishReason::from_api))
        }
        None => (String::new(), None),
    };

    let usage = api_response
        .usage_metadata
        .map(|u| Usage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    Response {
        model: api_response.model_version.unwrap_or(requested_model),
        text,
        finish_reason,
        usage,
    }
}

fn parse_api_error(status: u16, body: &str) -> Error {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => Error::Api {
            status,
            code: envelope.error.status,
            reason: envelope
                .error
                .details
                .into_iter()
                .find_map(|d| d.reason),
            message: envelope.error.message,
        },
        Err(_) => Error::Api {
            status,
            code: None,
            reason: None,
            message: body.to_string(),
        },
    }
}

// ============================================================================
// Public types
// ============================================================================

/// A completion request to send to Gemini.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub model: Option<String>,
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub config: GenerationConfig,
}

impl Request {
    /// Create a new request with the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Create a single-turn request from a user prompt.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(vec![Message::user(text)])
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.config.top_k = Some(top_k);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.config.top_p = Some(top_p);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.config.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// Sampling parameters. Unset fields use the server defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerationConfig {
    fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.top_k.is_none()
            && self.top_p.is_none()
            && self.max_output_tokens.is_none()
    }
}

/// A message in the conversation.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Create a model message.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// A completion response from Gemini.
#[derive(Debug, Clone)]
pub struct Response {
    pub model: String,
    /// Text of the first candidate, all parts concatenated.
    pub text: String,
    pub finish_reason: Option<FinishReason>,
    pub usage: Usage,
}

impl Response {
    pub fn text(&self) -> String {
        self.text.clone()
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other,
}

impl FinishReason {
    fn from_api(s: &str) -> Self {
        match s {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            _ => FinishReason::Other,
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<ApiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    usage_metadata: Option<ApiUsage>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

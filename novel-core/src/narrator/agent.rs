//! The storyteller.
//!
//! [`StoryGenerator`] is the seam between the chapter pipeline and the text
//! model. [`Narrator`] is the production implementation backed by Gemini;
//! tests use [`crate::testing::MockGenerator`].

use super::memory::KeyEventLog;
use super::prompts;
use crate::world::Character;
use async_trait::async_trait;
use gemini::{Gemini, Request};
use thiserror::Error;

/// Characters of the running chapter sent back as context.
pub const RECENT_TEXT_CHARS: usize = 1_500;

/// Errors from the generation collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("No API key provided")]
    MissingCredential,

    #[error("API key rejected: {0}")]
    InvalidCredential(String),

    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Generation service failed: {0}")]
    Service(String),

    #[error("Storyteller returned no text")]
    EmptyResponse,
}

impl GenerationError {
    /// The message shown to the player.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::MissingCredential => {
                "Lỗi: API Key chưa được cung cấp. Vui lòng nhập API Key trước khi tiếp tục.".to_string()
            }
            GenerationError::InvalidCredential(detail) => format!(
                "Lỗi API: API Key không hợp lệ. Vui lòng kiểm tra lại key đã nhập. (Lỗi: {detail})"
            ),
            GenerationError::QuotaExhausted(detail) => format!(
                "Lỗi API: Đã hết hạn ngạch sử dụng cho API Key này. Vui lòng thử lại sau hoặc dùng key khác. (Lỗi: {detail})"
            ),
            GenerationError::Service(detail) => {
                format!("Đã xảy ra lỗi khi kết nối với AI: {detail}. Hãy thử lại sau.")
            }
            GenerationError::EmptyResponse => {
                "AI không trả về nội dung nào. Hãy thử lại hành động của bạn.".to_string()
            }
        }
    }

    /// Whether the player has to enter a different credential to continue.
    pub fn is_credential_problem(&self) -> bool {
        matches!(
            self,
            GenerationError::MissingCredential | GenerationError::InvalidCredential(_)
        )
    }
}

impl From<gemini::Error> for GenerationError {
    fn from(err: gemini::Error) -> Self {
        match err {
            gemini::Error::NoApiKey => GenerationError::MissingCredential,
            gemini::Error::EmptyResponse(_) => GenerationError::EmptyResponse,
            ref e if e.is_auth_error() => GenerationError::InvalidCredential(e.to_string()),
            ref e if e.is_quota_error() => GenerationError::QuotaExhausted(e.to_string()),
            e => GenerationError::Service(e.to_string()),
        }
    }
}

/// Everything the storyteller needs to continue the current chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryContext {
    pub character: Character,
    /// Tail of the running chapter buffer.
    pub recent_text: String,
    pub chapter_number: u32,
    /// Length of the running chapter buffer, in characters.
    pub chapter_len: usize,
    pub key_events_summary: Option<String>,
}

impl StoryContext {
    /// Build the context for the next round from the session state.
    ///
    /// Only the newest `events_in_prompt` key events are summarized.
    pub fn compose(
        character: &Character,
        buffer: &str,
        chapter_number: u32,
        events: &KeyEventLog,
        events_in_prompt: usize,
    ) -> Self {
        let chapter_len = buffer.chars().count();
        let recent_text = buffer
            .chars()
            .skip(chapter_len.saturating_sub(RECENT_TEXT_CHARS))
            .collect();

        Self {
            character: character.clone(),
            recent_text,
            chapter_number,
            chapter_len,
            key_events_summary: events.summary(events_in_prompt),
        }
    }
}

/// Source of story text.
///
/// Implementations return the raw model output; directive extraction and
/// title cleanup happen in the pipeline.
#[async_trait]
pub trait StoryGenerator: Send + Sync {
    /// Continue the story after a player action.
    async fn generate_segment(
        &self,
        credential: &str,
        context: &StoryContext,
        action: &str,
    ) -> Result<String, GenerationError>;

    /// Write the opening passage for a new character.
    async fn generate_opening(
        &self,
        credential: &str,
        character: &Character,
    ) -> Result<String, GenerationError>;

    /// Propose a title for a finished chapter.
    async fn generate_title(
        &self,
        credential: &str,
        chapter_text: &str,
        character: &Character,
        chapter_number: u32,
    ) -> Result<String, GenerationError>;
}

/// Sampling parameters for one kind of request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
}

impl Sampling {
    pub fn new(temperature: f32) -> Self {
        Self {
            temperature,
            top_k: None,
            top_p: None,
        }
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    fn apply(&self, mut request: Request) -> Request {
        request = request.with_temperature(self.temperature);
        if let Some(top_k) = self.top_k {
            request = request.with_top_k(top_k);
        }
        if let Some(top_p) = self.top_p {
            request = request.with_top_p(top_p);
        }
        request
    }
}

/// Configuration for the [`Narrator`].
#[derive(Debug, Clone)]
pub struct NarratorConfig {
    /// Model override. The client's default model is used when `None`.
    pub model: Option<String>,
    pub segment: Sampling,
    pub opening: Sampling,
    pub title: Sampling,
    /// Extra instructions appended to the segment system prompt.
    pub custom_system_prompt: Option<String>,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            model: None,
            segment: Sampling::new(0.7).with_top_k(40).with_top_p(0.95),
            opening: Sampling::new(0.75),
            title: Sampling::new(0.6).with_top_k(30).with_top_p(0.9),
            custom_system_prompt: None,
        }
    }
}

impl NarratorConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_custom_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_system_prompt = Some(prompt.into());
        self
    }
}

/// Gemini-backed storyteller.
///
/// The credential is supplied per call, so one narrator can serve a player
/// who changes keys mid-session.
#[derive(Debug, Clone)]
pub struct Narrator {
    client: Gemini,
    config: NarratorConfig,
}

impl Narrator {
    pub fn new() -> Self {
        Self {
            client: Gemini::new(""),
            config: NarratorConfig::default(),
        }
    }

    /// Use a preconfigured client (custom base URL, model).
    pub fn with_client(mut self, client: Gemini) -> Self {
        self.client = client;
        self
    }

    pub fn with_config(mut self, config: NarratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &NarratorConfig {
        &self.config
    }

    fn client_for(&self, credential: &str) -> Result<Gemini, GenerationError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(GenerationError::MissingCredential);
        }
        Ok(self.client.with_api_key(credential))
    }

    fn request(&self, system: impl Into<String>, prompt: String, sampling: &Sampling) -> Request {
        let mut request = Request::prompt(prompt).with_system(system);
        if let Some(ref model) = self.config.model {
            request = request.with_model(model);
        }
        sampling.apply(request)
    }

    async fn run(&self, credential: &str, request: Request, kind: &'static str) -> Result<String, GenerationError> {
        let client = self.client_for(credential)?;
        match client.generate_text(request).await {
            Ok(text) => {
                tracing::debug!(kind, chars = text.chars().count(), "storyteller responded");
                Ok(text)
            }
            Err(e) => {
                tracing::warn!(kind, error = %e, "storyteller request failed");
                Err(e.into())
            }
        }
    }
}

impl Default for Narrator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoryGenerator for Narrator {
    async fn generate_segment(
        &self,
        credential: &str,
        context: &StoryContext,
        action: &str,
    ) -> Result<String, GenerationError> {
        let mut system = prompts::segment_system();
        if let Some(ref custom) = self.config.custom_system_prompt {
            system.push_str("\n\n");
            system.push_str(custom);
        }
        let prompt = prompts::segment_prompt(context, action);
        tracing::debug!(
            chapter = context.chapter_number,
            prompt_chars = prompt.chars().count(),
            "composed segment prompt"
        );
        let request = self.request(system, prompt, &self.config.segment);
        self.run(credential, request, "segment").await
    }

    async fn generate_opening(
        &self,
        credential: &str,
        character: &Character,
    ) -> Result<String, GenerationError> {
        let request = self.request(
            prompts::opening_system(),
            prompts::opening_prompt(character),
            &self.config.opening,
        );
        self.run(credential, request, "opening").await
    }

    async fn generate_title(
        &self,
        credential: &str,
        chapter_text: &str,
        character: &Character,
        chapter_number: u32,
    ) -> Result<String, GenerationError> {
        let request = self.request(
            prompts::title_system(),
            prompts::title_prompt(chapter_text, character, chapter_number),
            &self.config.title,
        );
        self.run(credential, request, "title").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::create_sample_character;

    fn api_error(status: u16, code: Option<&str>, reason: Option<&str>, message: &str) -> gemini::Error {
        gemini::Error::Api {
            status,
            code: code.map(String::from),
            reason: reason.map(String::from),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            GenerationError::from(gemini::Error::NoApiKey),
            GenerationError::MissingCredential
        );
        assert!(matches!(
            GenerationError::from(api_error(400, Some("INVALID_ARGUMENT"), Some("API_KEY_INVALID"), "API key not valid. Please pass a valid API key.")),
            GenerationError::InvalidCredential(_)
        ));
        assert!(matches!(
            GenerationError::from(api_error(429, Some("RESOURCE_EXHAUSTED"), None, "You exceeded your current quota")),
            GenerationError::QuotaExhausted(_)
        ));
        assert!(matches!(
            GenerationError::from(api_error(500, Some("INTERNAL"), None, "Internal error")),
            GenerationError::Service(_)
        ));
        assert!(matches!(
            GenerationError::from(gemini::Error::Network("timed out".into())),
            GenerationError::Service(_)
        ));
        assert_eq!(
            GenerationError::from(gemini::Error::EmptyResponse(None)),
            GenerationError::EmptyResponse
        );
    }

    #[test]
    fn test_user_messages() {
        assert!(GenerationError::MissingCredential.user_message().contains("API Key"));
        assert!(GenerationError::QuotaExhausted("x".into())
            .user_message()
            .contains("hạn ngạch"));
        assert!(GenerationError::InvalidCredential("x".into()).is_credential_problem());
        assert!(!GenerationError::Service("x".into()).is_credential_problem());
    }

    #[test]
    fn test_context_takes_buffer_tail() {
        let character = create_sample_character("Tiểu Minh");
        let buffer = format!("{}{}", "ă".repeat(500), "b".repeat(RECENT_TEXT_CHARS));
        let mut events = KeyEventLog::new();
        events.push("Gặp được sư phụ");

        let context = StoryContext::compose(&character, &buffer, 2, &events, 5);
        assert_eq!(context.chapter_len, 500 + RECENT_TEXT_CHARS);
        assert_eq!(context.recent_text, "b".repeat(RECENT_TEXT_CHARS));
        assert_eq!(context.key_events_summary.as_deref(), Some("- Gặp được sư phụ"));
    }

    #[test]
    fn test_context_with_short_buffer() {
        let character = create_sample_character("Tiểu Minh");
        let context = StoryContext::compose(&character, "Ngắn.", 1, &KeyEventLog::new(), 5);
        assert_eq!(context.recent_text, "Ngắn.");
        assert_eq!(context.chapter_len, 5);
        assert!(context.key_events_summary.is_none());
    }

    #[test]
    fn test_default_sampling() {
        let config = NarratorConfig::default();
        assert_eq!(config.segment.top_k, Some(40));
        assert_eq!(config.opening.temperature, 0.75);
        assert_eq!(config.title.top_p, Some(0.9));
    }

    #[tokio::test]
    async fn test_blank_credential_rejected_without_network() {
        let narrator = Narrator::new();
        let result = narrator
            .generate_opening("  ", &create_sample_character("Tiểu Minh"))
            .await;
        assert_eq!(result, Err(GenerationError::MissingCredential));
    }
}

//! Testing utilities for the novel engine.
//!
//! This module provides tools for integration testing:
//! - `MockGenerator` for deterministic stories without API calls
//! - `TestHarness` for scripted play-through scenarios

use crate::narrator::{GenerationError, StoryContext, StoryGenerator};
use crate::session::{GameSession, RoundOutcome, SessionConfig, SessionError};
use crate::world::{Character, CharacterSettings};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Credential used by [`TestHarness`] sessions.
pub const TEST_CREDENTIAL: &str = "test-key";

/// A request received by the [`MockGenerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Segment {
        credential: String,
        context: StoryContext,
        action: String,
    },
    Opening {
        credential: String,
        character: Character,
    },
    Title {
        credential: String,
        chapter_text: String,
        character: Character,
        chapter_number: u32,
    },
}

type Script = Mutex<VecDeque<Result<String, GenerationError>>>;

/// A storyteller that returns scripted responses in order.
///
/// Each kind of request has its own queue. When a queue runs dry a fixed
/// placeholder is returned. Every call is recorded.
#[derive(Debug, Default)]
pub struct MockGenerator {
    segments: Script,
    openings: Script,
    titles: Script,
    calls: Mutex<Vec<MockCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_segment(&self, response: Result<String, GenerationError>) {
        lock(&self.segments).push_back(response);
    }

    pub fn queue_opening(&self, response: Result<String, GenerationError>) {
        lock(&self.openings).push_back(response);
    }

    pub fn queue_title(&self, response: Result<String, GenerationError>) {
        lock(&self.titles).push_back(response);
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Contexts of every segment request, in order.
    pub fn segment_contexts(&self) -> Vec<StoryContext> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                MockCall::Segment { context, .. } => Some(context.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of title requests received.
    pub fn title_requests(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| matches!(call, MockCall::Title { .. }))
            .count()
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl StoryGenerator for MockGenerator {
    async fn generate_segment(
        &self,
        credential: &str,
        context: &StoryContext,
        action: &str,
    ) -> Result<String, GenerationError> {
        self.record(MockCall::Segment {
            credential: credential.to_string(),
            context: context.clone(),
            action: action.to_string(),
        });
        lock(&self.segments)
            .pop_front()
            .unwrap_or_else(|| Ok("Câu chuyện tiếp diễn.".to_string()))
    }

    async fn generate_opening(
        &self,
        credential: &str,
        character: &Character,
    ) -> Result<String, GenerationError> {
        self.record(MockCall::Opening {
            credential: credential.to_string(),
            character: character.clone(),
        });
        lock(&self.openings)
            .pop_front()
            .unwrap_or_else(|| Ok(format!("{} mở mắt giữa một vùng đất lạ.", character.name)))
    }

    async fn generate_title(
        &self,
        credential: &str,
        chapter_text: &str,
        character: &Character,
        chapter_number: u32,
    ) -> Result<String, GenerationError> {
        self.record(MockCall::Title {
            credential: credential.to_string(),
            chapter_text: chapter_text.to_string(),
            character: character.clone(),
            chapter_number,
        });
        lock(&self.titles)
            .pop_front()
            .unwrap_or_else(|| Ok("Tiêu Đề Mẫu".to_string()))
    }
}

/// Settings for the character used by [`TestHarness`].
pub fn sample_settings(name: &str) -> CharacterSettings {
    CharacterSettings {
        name: name.to_string(),
        age: 16,
        initial_location: "Thôn Thanh Thủy".to_string(),
        personality: "Kiên nhẫn, tò mò".to_string(),
        interests: "Cổ tịch, luyện đan".to_string(),
    }
}

/// Test harness for scripted play-throughs.
///
/// The session is already past credential entry and character setup, and
/// is awaiting its opening.
pub struct TestHarness {
    pub session: GameSession<MockGenerator>,
}

impl TestHarness {
    /// Harness with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Harness with a custom configuration.
    pub fn with_config(config: SessionConfig) -> Self {
        let mut session = GameSession::new(
            MockGenerator::new(),
            config,
            Some(TEST_CREDENTIAL.to_string()),
        );
        if let Err(e) = session.setup_character(&sample_settings("Tiểu Minh")) {
            panic!("test character setup failed: {e}");
        }
        Self { session }
    }

    pub fn generator(&self) -> &MockGenerator {
        self.session.generator()
    }

    /// Queue a segment response.
    pub fn expect_segment(&mut self, text: impl Into<String>) -> &mut Self {
        self.generator().queue_segment(Ok(text.into()));
        self
    }

    /// Queue a failing segment response.
    pub fn expect_segment_error(&mut self, error: GenerationError) -> &mut Self {
        self.generator().queue_segment(Err(error));
        self
    }

    /// Queue a title response.
    pub fn expect_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.generator().queue_title(Ok(title.into()));
        self
    }

    /// Queue a failing title response.
    pub fn expect_title_error(&mut self, error: GenerationError) -> &mut Self {
        self.generator().queue_title(Err(error));
        self
    }

    /// Generate the opening from `text`.
    pub async fn begin(&mut self, text: &str) -> Result<String, SessionError> {
        self.generator().queue_opening(Ok(text.to_string()));
        self.session.begin_story().await
    }

    /// Send a player action.
    pub async fn act(&mut self, action: &str) -> Result<RoundOutcome, SessionError> {
        self.session.player_action(action).await
    }

    pub fn character(&self) -> &Character {
        match self.session.character() {
            Some(character) => character,
            None => panic!("harness session has no character"),
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::Phase;

    #[tokio::test]
    async fn test_mock_generator_scripted_order() {
        let generator = MockGenerator::new();
        generator.queue_segment(Ok("một".into()));
        generator.queue_segment(Err(GenerationError::EmptyResponse));

        let character = crate::world::create_sample_character("A");
        let context = StoryContext {
            character: character.clone(),
            recent_text: String::new(),
            chapter_number: 1,
            chapter_len: 0,
            key_events_summary: None,
        };

        assert_eq!(generator.generate_segment("k", &context, "a").await, Ok("một".into()));
        assert_eq!(
            generator.generate_segment("k", &context, "b").await,
            Err(GenerationError::EmptyResponse)
        );
        assert!(generator.generate_segment("k", &context, "c").await.is_ok());
        assert_eq!(generator.calls().len(), 3);
        assert_eq!(generator.segment_contexts().len(), 3);
    }

    #[tokio::test]
    async fn test_harness_starts_playing() {
        let mut harness = TestHarness::new();
        assert_eq!(harness.session.phase(), Phase::Playing);
        assert!(harness.session.is_awaiting_first_generation());

        let opening = harness.begin("Sương sớm phủ kín thôn.").await.unwrap();
        assert_eq!(opening, "Sương sớm phủ kín thôn.");
        assert!(!harness.session.is_awaiting_first_generation());
    }
}

//! GameSession - the primary public API for playing a story.
//!
//! A session owns the character, the running chapter buffer, the finished
//! chapters and the key event log, and is the only place that sequences
//! mutations to them. Each [`GameSession::player_action`] call is one round
//! of the chapter pipeline:
//!
//! 1. compose a [`StoryContext`] and ask the storyteller to continue,
//! 2. extract directives and apply the character update,
//! 3. append the cleaned segment to the chapter buffer,
//! 4. close the chapter when it reaches the length threshold.
//!
//! State is only written after every storyteller call of the round has
//! returned, so a failed or dropped round leaves the session untouched.

use crate::directive::{self, clean_title};
use crate::narrator::{
    GenerationError, KeyEventLog, Narrator, StoryContext, StoryGenerator, KEY_EVENTS_IN_PROMPT,
    MAX_KEY_EVENTS,
};
use crate::phase::{Phase, PhaseController, PhaseError};
use crate::rules::{apply_update, CharacterUpdate};
use crate::segment::{segment, trim_to_sensible_break, Segmentation, DEFAULT_CHAPTER_CHARS};
use crate::world::{
    default_chapter_title, Character, CharacterSettings, KeyStoryEvent, StoryChapter, StoryId,
};
use thiserror::Error;

/// Default number of chapters before the story ends.
pub const DEFAULT_TARGET_CHAPTERS: u32 = 100;

/// Errors from GameSession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not available during {actual} (requires {expected})")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("API key must not be empty")]
    InvalidCredential,

    #[error("Invalid character settings: {0}")]
    InvalidSettings(&'static str),

    #[error("The story has not begun yet")]
    NotStarted,

    #[error("The story has already begun")]
    AlreadyStarted,

    #[error("Action must not be empty")]
    EmptyAction,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Phase(#[from] PhaseError),
}

impl SessionError {
    /// The message shown to the player.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Generation(e) => e.user_message(),
            SessionError::NotStarted => "Vui lòng bắt đầu cuộc phiêu lưu trước.".to_string(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for a game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Chapter length threshold, in characters.
    pub chapter_chars: usize,

    /// The story ends once this many chapters are finished.
    pub target_chapters: u32,

    /// Capacity of the key event log.
    pub max_key_events: usize,

    /// Number of recent key events sent with each prompt.
    pub key_events_in_prompt: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chapter_chars: DEFAULT_CHAPTER_CHARS,
            target_chapters: DEFAULT_TARGET_CHAPTERS,
            max_key_events: MAX_KEY_EVENTS,
            key_events_in_prompt: KEY_EVENTS_IN_PROMPT,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `NOVEL_CHAPTER_CHARS` and
    /// `NOVEL_TARGET_CHAPTERS` when set.
    pub fn from_env() -> Result<Self, SessionError> {
        let mut config = Self::default();
        if let Some(chars) = env_number::<usize>("NOVEL_CHAPTER_CHARS")? {
            config = config.with_chapter_chars(chars);
        }
        if let Some(chapters) = env_number::<u32>("NOVEL_TARGET_CHAPTERS")? {
            config = config.with_target_chapters(chapters);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_chapter_chars(mut self, chars: usize) -> Self {
        self.chapter_chars = chars;
        self
    }

    pub fn with_target_chapters(mut self, chapters: u32) -> Self {
        self.target_chapters = chapters;
        self
    }

    pub fn with_max_key_events(mut self, max: usize) -> Self {
        self.max_key_events = max;
        self
    }

    pub fn with_key_events_in_prompt(mut self, n: usize) -> Self {
        self.key_events_in_prompt = n;
        self
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.chapter_chars == 0 {
            return Err(SessionError::Config("chapter length must be positive".into()));
        }
        if self.target_chapters == 0 {
            return Err(SessionError::Config("target chapters must be positive".into()));
        }
        if self.max_key_events == 0 {
            return Err(SessionError::Config("key event capacity must be positive".into()));
        }
        Ok(())
    }

    /// Raise zero limits to one, the same way chapter segmentation treats a
    /// zero threshold.
    pub fn clamped(mut self) -> Self {
        self.chapter_chars = self.chapter_chars.max(1);
        self.target_chapters = self.target_chapters.max(1);
        self.max_key_events = self.max_key_events.max(1);
        self
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>, SessionError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SessionError::Config(format!("{key} is not a valid number: {value:?}"))),
        Err(_) => Ok(None),
    }
}

// ============================================================================
// Round results
// ============================================================================

/// Result of one player action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    /// The cleaned segment appended to the story.
    pub segment: String,

    /// Whether the character record changed this round.
    pub character_changed: bool,

    /// Key events recorded this round.
    pub new_events: Vec<KeyStoryEvent>,

    /// Chapters finished this round, in order. At most two: the chapter that
    /// crossed the threshold and, when the story ended, the leftover.
    pub finalized: Vec<StoryChapter>,

    /// Whether the story reached its target this round.
    pub ended: bool,
}

/// How far along the story is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub chapter_number: u32,
    pub target_chapters: u32,
    pub completed_chapters: usize,
    /// Current chapter length as a percentage of the threshold, capped at 100.
    pub chapter_percent: f64,
    /// Whole story, as a percentage of the target, capped at 100.
    pub overall_percent: f64,
}

// ============================================================================
// Session
// ============================================================================

/// An interactive novel session.
///
/// Generic over the storyteller so tests can script responses; production
/// code uses the Gemini-backed [`Narrator`].
pub struct GameSession<G: StoryGenerator = Narrator> {
    id: StoryId,
    generator: G,
    config: SessionConfig,
    credential: Option<String>,
    phases: PhaseController,
    character: Option<Character>,
    chapter_number: u32,
    buffer: String,
    chapters: Vec<StoryChapter>,
    key_events: KeyEventLog,
    last_error: Option<String>,
}

impl<G: StoryGenerator> GameSession<G> {
    /// Create a session. It starts at character setup when a non-empty
    /// credential is given, otherwise at credential entry. Zero limits in
    /// `config` are raised to one.
    pub fn new(generator: G, config: SessionConfig, credential: Option<String>) -> Self {
        let config = config.clamped();
        let credential = credential
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let key_events = KeyEventLog::with_capacity(config.max_key_events);

        Self {
            id: StoryId::new(),
            generator,
            phases: PhaseController::new(credential.is_some()),
            credential,
            config,
            character: None,
            chapter_number: 1,
            buffer: String::new(),
            chapters: Vec::new(),
            key_events,
            last_error: None,
        }
    }

    /// Restore key events persisted by a previous run.
    pub fn with_key_events(mut self, events: impl IntoIterator<Item = KeyStoryEvent>) -> Self {
        self.key_events.extend(events);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn id(&self) -> StoryId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phases.phase()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn character(&self) -> Option<&Character> {
        self.character.as_ref()
    }

    /// Number of the chapter currently being written.
    pub fn chapter_number(&self) -> u32 {
        self.chapter_number
    }

    /// The running, not yet finished chapter.
    pub fn current_chapter_text(&self) -> &str {
        &self.buffer
    }

    pub fn chapters(&self) -> &[StoryChapter] {
        &self.chapters
    }

    pub fn key_events(&self) -> &KeyEventLog {
        &self.key_events
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Playing, but the opening has not been generated yet.
    pub fn is_awaiting_first_generation(&self) -> bool {
        self.phase() == Phase::Playing && self.buffer.is_empty() && self.chapters.is_empty()
    }

    pub fn progress(&self) -> Option<Progress> {
        self.character.as_ref()?;

        let chapter_fraction =
            (self.buffer.chars().count() as f64 / self.config.chapter_chars as f64).min(1.0);
        let target = f64::from(self.config.target_chapters);
        let done = f64::from(self.chapter_number.saturating_sub(1));
        let overall = if self.phase() == Phase::Ended {
            1.0
        } else {
            ((done + chapter_fraction) / target).min(1.0)
        };

        Some(Progress {
            chapter_number: self.chapter_number,
            target_chapters: self.config.target_chapters,
            completed_chapters: self.chapters.len(),
            chapter_percent: chapter_fraction * 100.0,
            overall_percent: overall * 100.0,
        })
    }

    // ------------------------------------------------------------------------
    // Phase transitions
    // ------------------------------------------------------------------------

    /// Store the API key and move on to character setup.
    pub fn submit_credential(&mut self, credential: &str) -> Result<Phase, SessionError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(SessionError::InvalidCredential);
        }
        let phase = self.phases.submit_credential()?;
        self.credential = Some(credential.to_string());
        Ok(phase)
    }

    /// Go back from character setup to credential entry.
    pub fn change_credential(&mut self) -> Result<Phase, SessionError> {
        Ok(self.phases.require_credential()?)
    }

    /// Swap the API key without leaving the current phase, e.g. after the
    /// old one ran out of quota mid-story.
    pub fn replace_credential(&mut self, credential: &str) -> Result<(), SessionError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(SessionError::InvalidCredential);
        }
        if self.phase() == Phase::CredentialEntry {
            return Err(SessionError::WrongPhase {
                expected: Phase::SettingsSetup,
                actual: Phase::CredentialEntry,
            });
        }
        self.credential = Some(credential.to_string());
        self.last_error = None;
        Ok(())
    }

    /// Create the character and start playing.
    ///
    /// Starts a fresh story: chapter 1, empty buffer, no key events.
    pub fn setup_character(&mut self, settings: &CharacterSettings) -> Result<&Character, SessionError> {
        self.require_phase(Phase::SettingsSetup)?;
        settings.validate().map_err(SessionError::InvalidSettings)?;
        self.phases.complete_setup()?;

        self.id = StoryId::new();
        self.chapter_number = 1;
        self.buffer.clear();
        self.chapters.clear();
        self.key_events.clear();
        self.last_error = None;

        let character = Character::new(settings);
        tracing::info!(story = %self.id, name = %character.name, "character created");
        Ok(self.character.insert(character))
    }

    /// End the story early. Any leftover text becomes the last chapter.
    pub fn finish(&mut self) -> Result<Option<StoryChapter>, SessionError> {
        self.require_phase(Phase::Playing)?;
        self.phases.end()?;
        tracing::info!(story = %self.id, chapters = self.chapters.len(), "story finished early");
        Ok(self.finalize_leftover())
    }

    /// Discard the story and return to character setup.
    ///
    /// The key event log is cleared as well.
    pub fn reset(&mut self) -> Result<Phase, SessionError> {
        let phase = self.phases.reset()?;
        tracing::info!(story = %self.id, "story reset");

        self.id = StoryId::new();
        self.character = None;
        self.chapter_number = 1;
        self.buffer.clear();
        self.chapters.clear();
        self.key_events.clear();
        self.last_error = None;
        Ok(phase)
    }

    // ------------------------------------------------------------------------
    // Story progression
    // ------------------------------------------------------------------------

    /// Generate the opening passage. Only valid once, right after setup.
    ///
    /// On failure the session stays awaiting the opening, so it can be
    /// retried.
    pub async fn begin_story(&mut self) -> Result<String, SessionError> {
        self.require_phase(Phase::Playing)?;
        if !self.is_awaiting_first_generation() {
            return Err(SessionError::AlreadyStarted);
        }
        let character = self.character.clone().ok_or(SessionError::NotStarted)?;
        let credential = self.credential.clone().unwrap_or_default();

        self.last_error = None;
        let result = self.generator.generate_opening(&credential, &character).await;
        let raw = result.map_err(|e| self.record_error(e))?;

        let opening = directive::strip_markup(&raw);
        if opening.is_empty() {
            return Err(self.record_error(GenerationError::EmptyResponse));
        }

        tracing::info!(story = %self.id, chars = opening.chars().count(), "story opened");
        self.buffer = opening.clone();
        Ok(opening)
    }

    /// Run one round of the chapter pipeline for a player action.
    pub async fn player_action(&mut self, action: &str) -> Result<RoundOutcome, SessionError> {
        self.require_phase(Phase::Playing)?;
        let action = action.trim();
        if action.is_empty() {
            return Err(SessionError::EmptyAction);
        }
        if self.is_awaiting_first_generation() {
            return Err(SessionError::NotStarted);
        }
        let character = self.character.clone().ok_or(SessionError::NotStarted)?;
        let credential = self.credential.clone().unwrap_or_default();

        self.last_error = None;

        // Compose and invoke
        let context = StoryContext::compose(
            &character,
            &self.buffer,
            self.chapter_number,
            &self.key_events,
            self.config.key_events_in_prompt,
        );
        tracing::debug!(
            story = %self.id,
            chapter = context.chapter_number,
            chapter_len = context.chapter_len,
            "requesting story segment"
        );
        let result = self
            .generator
            .generate_segment(&credential, &context, action)
            .await;
        let raw = result.map_err(|e| self.record_error(e))?;

        // Extract
        let extraction = directive::extract(&raw, &character);
        let updated = apply_update(&character, &extraction.update);
        let character_changed = updated != character;
        tracing::debug!(
            story = %self.id,
            character_changed,
            events = extraction.events.len(),
            "extracted directives"
        );

        // Merge
        let merged = if self.buffer.is_empty() {
            extraction.text.clone()
        } else if extraction.text.is_empty() {
            self.buffer.clone()
        } else {
            format!("{}\n\n{}", self.buffer, extraction.text)
        };

        // Segment
        let closed = match segment(&merged, self.config.chapter_chars) {
            Segmentation::Open(text) => {
                self.commit_round(updated, &extraction.events, text);
                return Ok(RoundOutcome {
                    segment: extraction.text,
                    character_changed,
                    new_events: extraction.events,
                    finalized: Vec::new(),
                    ended: false,
                });
            }
            Segmentation::Closed { chapter, remainder } => (chapter, remainder),
        };
        let (chapter_text, remainder) = closed;

        let number = self.chapter_number;
        let title = self.request_title(&credential, &chapter_text, &updated, number).await;
        let chapter = StoryChapter::new(number, title, chapter_text);
        tracing::info!(
            story = %self.id,
            chapter = number,
            title = %chapter.title,
            chars = chapter.content.chars().count(),
            "chapter finalized"
        );

        self.commit_round(updated, &extraction.events, remainder);
        self.chapters.push(chapter.clone());
        self.chapter_number += 1;

        let mut finalized = vec![chapter];
        let mut ended = false;
        if self.chapter_number > self.config.target_chapters {
            self.phases.end()?;
            ended = true;
            tracing::info!(story = %self.id, chapters = self.chapters.len(), "target reached");
            finalized.extend(self.finalize_leftover());
        }

        Ok(RoundOutcome {
            segment: extraction.text,
            character_changed,
            new_events: extraction.events,
            finalized,
            ended,
        })
    }

    /// Apply a direct edit to the character.
    pub fn update_character(&mut self, update: &CharacterUpdate) -> Result<&Character, SessionError> {
        self.require_phase(Phase::Playing)?;
        let character = self.character.as_ref().ok_or(SessionError::NotStarted)?;
        let updated = apply_update(character, update);
        Ok(self.character.insert(updated))
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn require_phase(&self, expected: Phase) -> Result<(), SessionError> {
        let actual = self.phase();
        if actual != expected {
            return Err(SessionError::WrongPhase { expected, actual });
        }
        Ok(())
    }

    fn record_error(&mut self, error: GenerationError) -> SessionError {
        tracing::warn!(story = %self.id, error = %error, "generation failed");
        self.last_error = Some(error.user_message());
        SessionError::Generation(error)
    }

    fn commit_round(&mut self, character: Character, events: &[KeyStoryEvent], buffer: String) {
        self.character = Some(character);
        self.key_events.extend(events.iter().cloned());
        self.buffer = buffer;
    }

    async fn request_title(
        &self,
        credential: &str,
        chapter_text: &str,
        character: &Character,
        number: u32,
    ) -> String {
        match self
            .generator
            .generate_title(credential, chapter_text, character, number)
            .await
        {
            Ok(raw) => {
                let title = clean_title(&raw);
                if title.is_empty() {
                    tracing::warn!(story = %self.id, chapter = number, "empty chapter title, using default");
                    default_chapter_title(number)
                } else {
                    title
                }
            }
            Err(e) => {
                tracing::warn!(story = %self.id, chapter = number, error = %e, "title generation failed, using default");
                default_chapter_title(number)
            }
        }
    }

    /// Turn a non-empty buffer into the closing chapter.
    fn finalize_leftover(&mut self) -> Option<StoryChapter> {
        let leftover = std::mem::take(&mut self.buffer);
        let leftover = leftover.trim();
        if leftover.is_empty() {
            return None;
        }

        let number = self.chapters.len() as u32 + 1;
        let chapter = StoryChapter::new(
            number,
            format!("{} (Phần cuối)", default_chapter_title(number)),
            trim_to_sensible_break(leftover, None),
        );
        tracing::info!(story = %self.id, chapter = number, "leftover finalized");
        self.chapters.push(chapter.clone());
        Some(chapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.chapter_chars, 10_000);
        assert_eq!(config.target_chapters, 100);
        assert_eq!(config.max_key_events, 15);
        assert_eq!(config.key_events_in_prompt, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder_and_validation() {
        let config = SessionConfig::new()
            .with_chapter_chars(500)
            .with_target_chapters(3);
        assert_eq!(config.chapter_chars, 500);
        assert_eq!(config.target_chapters, 3);

        assert!(matches!(
            SessionConfig::new().with_chapter_chars(0).validate(),
            Err(SessionError::Config(_))
        ));
        assert!(matches!(
            SessionConfig::new().with_target_chapters(0).validate(),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn test_clamped_raises_zero_limits() {
        let config = SessionConfig::new()
            .with_chapter_chars(0)
            .with_target_chapters(0)
            .with_max_key_events(0)
            .clamped();
        assert_eq!(config.chapter_chars, 1);
        assert_eq!(config.target_chapters, 1);
        assert_eq!(config.max_key_events, 1);
        assert!(config.validate().is_ok());

        let untouched = SessionConfig::new().with_chapter_chars(500).clamped();
        assert_eq!(untouched.chapter_chars, 500);
    }

    #[test]
    fn test_user_message_for_generation_error() {
        let err = SessionError::from(GenerationError::MissingCredential);
        assert_eq!(err.user_message(), GenerationError::MissingCredential.user_message());
    }
}

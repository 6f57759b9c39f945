//! Interactive cultivation novel engine.
//!
//! This crate provides:
//! - Directive extraction from storyteller output (`[CHARACTER_UPDATE: ...]`,
//!   `[KEY_EVENT: ...]`)
//! - Chapter segmentation at sensible sentence boundaries
//! - A character reducer that keeps realm and stage consistent
//! - The chapter assembly pipeline and phase state machine
//! - A Gemini-backed storyteller, profile persistence and text exports
//!
//! # Quick Start
//!
//! ```ignore
//! use novel_core::{CharacterSettings, GameSession, Narrator, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = GameSession::new(
//!         Narrator::new(),
//!         SessionConfig::default(),
//!         std::env::var("GEMINI_API_KEY").ok(),
//!     );
//!
//!     session.setup_character(&CharacterSettings {
//!         name: "Lâm Phong".into(),
//!         age: 16,
//!         initial_location: "Thôn Thanh Thủy".into(),
//!         personality: "Trầm tĩnh".into(),
//!         interests: "Cổ tịch".into(),
//!     })?;
//!
//!     println!("{}", session.begin_story().await?);
//!     let outcome = session.player_action("Tôi đi về phía ngọn núi").await?;
//!     println!("{}", outcome.segment);
//!     Ok(())
//! }
//! ```

pub mod directive;
pub mod export;
pub mod narrator;
pub mod persist;
pub mod phase;
pub mod rules;
pub mod segment;
pub mod session;
pub mod testing;
pub mod world;

// Primary public API
pub use directive::{clean_title, extract, parse_update, Extraction};
pub use export::{ExportError, StoryExport};
pub use narrator::{
    GenerationError, KeyEventLog, Narrator, NarratorConfig, StoryContext, StoryGenerator,
};
pub use persist::{PersistError, ProfileStore, StoredProfile};
pub use phase::{Phase, PhaseController, PhaseError};
pub use rules::{apply_update, CharacterUpdate};
pub use segment::{segment, trim_to_sensible_break, Segmentation};
pub use session::{GameSession, Progress, RoundOutcome, SessionConfig, SessionError};
pub use testing::{MockGenerator, TestHarness};
pub use world::{
    Character, CharacterSettings, Faction, KeyStoryEvent, Realm, StoryChapter, StoryId,
};

//! Storyteller module.
//!
//! Contains the generation seam, the Gemini-backed narrator, prompt
//! composition, and the key event log fed back into prompts.

mod agent;
pub mod memory;
pub mod prompts;

pub use agent::{
    GenerationError, Narrator, NarratorConfig, Sampling, StoryContext, StoryGenerator,
    RECENT_TEXT_CHARS,
};
pub use memory::{KeyEventLog, KEY_EVENTS_IN_PROMPT, MAX_KEY_EVENTS};

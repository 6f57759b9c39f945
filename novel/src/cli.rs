//! Command line arguments.

use clap::Parser;
use novel_core::{SessionConfig, SessionError};
use std::path::PathBuf;

/// Già Thiên Kỳ Truyện - an interactive cultivation novel written with Gemini
#[derive(Parser, Debug)]
#[command(name = "novel")]
#[command(version)]
pub struct Args {
    /// Gemini API key. Overrides the key remembered from a previous run
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL")]
    pub model: Option<String>,

    /// Number of chapters before the story ends [env: NOVEL_TARGET_CHAPTERS]
    #[arg(long)]
    pub target_chapters: Option<u32>,

    /// Chapter length, in characters [env: NOVEL_CHAPTER_CHARS]
    #[arg(long)]
    pub chapter_chars: Option<usize>,

    /// Directory for chapter and story exports
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Profile file holding the API key and key events
    #[arg(long)]
    pub profile: Option<PathBuf>,
}

impl Args {
    /// Session configuration from the environment, with the command line
    /// overrides applied on top.
    pub fn session_config(&self) -> Result<SessionConfig, SessionError> {
        let mut config = SessionConfig::from_env()?;
        if let Some(chars) = self.chapter_chars {
            config = config.with_chapter_chars(chars);
        }
        if let Some(chapters) = self.target_chapters {
            config = config.with_target_chapters(chapters);
        }
        config.validate()?;
        Ok(config)
    }
}

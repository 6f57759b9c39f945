//! Già Thiên Kỳ Truyện terminal frontend.
//!
//! A line-oriented interface: the player types actions, the storyteller
//! continues the novel, and finished chapters are written to text files.
//!
//! ```bash
//! cargo run -p novel -- --target-chapters 10 --output-dir truyen
//! ```
//!
//! Logs go to stderr and are controlled with `RUST_LOG` (default `warn`).

mod cli;
mod terminal;

use anyhow::Context;
use clap::Parser;
use novel_core::{GameSession, Narrator, NarratorConfig, ProfileStore};
use std::io;

use cli::Args;
use terminal::Terminal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let config = args.session_config().context("invalid session configuration")?;

    let store = match args.profile.clone().or_else(ProfileStore::default_path) {
        Some(path) => Some(ProfileStore::new(path)),
        None => {
            tracing::warn!("no data directory available, profile will not be saved");
            None
        }
    };
    let profile = match &store {
        Some(store) => store.load_or_default().await,
        None => Default::default(),
    };

    // A key on the command line or in the environment wins over the saved one
    let credential = args.api_key.clone().or(profile.credential);
    if let (Some(store), Some(key)) = (&store, args.api_key.as_deref()) {
        if let Err(e) = store.save_credential(key).await {
            tracing::warn!(error = %e, "failed to remember API key");
        }
    }

    let mut narrator = Narrator::new();
    if let Some(model) = &args.model {
        narrator = narrator.with_config(NarratorConfig::default().with_model(model.as_str()));
    }

    let session = GameSession::new(narrator, config, credential).with_key_events(profile.key_events);
    tracing::info!(story = %session.id(), phase = %session.phase(), "session ready");

    let terminal = Terminal::new(session, store, args.output_dir);
    terminal.run(io::stdin().lock()).await
}

//! Integration tests that call the real Gemini API.
//!
//! These tests require GEMINI_API_KEY to be set (via .env file or environment).
//! Run with: `cargo test -p novel-core --test api_integration -- --ignored`
//!
//! These are marked #[ignore] by default to avoid:
//! - API quota use in CI
//! - Test failures when no API key is available
//! - Slow test runs (generation takes seconds)

use novel_core::testing::sample_settings;
use novel_core::{GameSession, GenerationError, Narrator, Phase, SessionConfig, StoryGenerator};

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

/// The API key, if available
fn api_key() -> Option<String> {
    std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty())
}

#[tokio::test]
#[ignore] // Run with: cargo test -p novel-core --test api_integration -- --ignored
async fn test_opening_and_one_round() {
    setup();
    let Some(key) = api_key() else {
        eprintln!("Skipping test: GEMINI_API_KEY not set");
        return;
    };

    let mut session = GameSession::new(Narrator::new(), SessionConfig::default(), Some(key));
    assert_eq!(session.phase(), Phase::SettingsSetup);
    session
        .setup_character(&sample_settings("Lâm Phong"))
        .expect("Setup should succeed");

    let opening = session.begin_story().await.expect("Opening should be generated");
    assert!(!opening.is_empty());
    assert!(!opening.contains("[CHARACTER_UPDATE"), "directives must be stripped");

    let outcome = session
        .player_action("Tôi rời thôn, đi về phía dãy núi phía bắc")
        .await
        .expect("Segment should be generated");
    assert!(!outcome.segment.is_empty());
    assert!(!outcome.segment.contains("[KEY_EVENT"));

    // Whatever the storyteller decided, the stage must belong to the realm.
    let character = session.character().expect("character");
    assert!(character.realm.has_stage(&character.stage));
    println!("Opening:\n{opening}\n\nSegment:\n{}", outcome.segment);
}

#[tokio::test]
#[ignore] // Run with: cargo test -p novel-core --test api_integration -- --ignored
async fn test_title_generation() {
    setup();
    let Some(key) = api_key() else {
        eprintln!("Skipping test: GEMINI_API_KEY not set");
        return;
    };

    let narrator = Narrator::new();
    let character = novel_core::world::create_sample_character("Lâm Phong");
    let title = narrator
        .generate_title(
            &key,
            "Lâm Phong nhặt được một mảnh đồng thau cổ bên bờ suối, trên đó khắc những đạo văn mờ nhạt.",
            &character,
            1,
        )
        .await
        .expect("Title should be generated");

    let cleaned = novel_core::clean_title(&title);
    assert!(!cleaned.is_empty());
    assert!(cleaned.chars().count() <= 100);
    println!("Title: {cleaned}");
}

#[tokio::test]
#[ignore] // Run with: cargo test -p novel-core --test api_integration -- --ignored
async fn test_invalid_key_is_reported_as_credential_problem() {
    setup();
    if api_key().is_none() {
        eprintln!("Skipping test: GEMINI_API_KEY not set");
        return;
    }

    let narrator = Narrator::new();
    let character = novel_core::world::create_sample_character("Lâm Phong");
    let err = narrator
        .generate_opening("not-a-real-key", &character)
        .await
        .expect_err("Bogus key should be rejected");

    assert!(
        matches!(err, GenerationError::InvalidCredential(_)),
        "unexpected error: {err:?}"
    );
}

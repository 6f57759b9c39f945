//! Saving profiles and exporting stories from a played session.
//!
//! Run with: `cargo test -p novel-core --test persistence_export`

use novel_core::export::{chapter_file_name, write_chapter, write_story, STORY_FILE_NAME};
use novel_core::testing::TestHarness;
use novel_core::{GameSession, MockGenerator, Phase, ProfileStore, SessionConfig, StoryExport};
use tempfile::TempDir;

fn small_chapters(target_chapters: u32) -> SessionConfig {
    SessionConfig::default()
        .with_chapter_chars(100)
        .with_target_chapters(target_chapters)
}

fn prose(n: usize) -> String {
    "Mây trôi. ".repeat(n).trim_end().to_string()
}

// =============================================================================
// EXPORTS
// =============================================================================

#[tokio::test]
async fn test_export_includes_running_chapter() {
    let mut harness = TestHarness::with_config(small_chapters(10));
    harness.begin("Mở đầu.").await.unwrap();
    harness
        .expect_segment(format!("{} [KEY_EVENT: Nhặt được đồng thau]", prose(10)))
        .expect_title("Đồng Thau Cổ");
    harness.act("Nhặt lên").await.unwrap();

    let export = StoryExport::from_session(&harness.session).unwrap();
    assert_eq!(export.chapters.len(), 1);
    assert_eq!(export.in_progress, Some((2, "Mây trôi.")));

    let text = export.render();
    assert!(text.starts_with("Tiểu Thuyết Già Thiên Kỳ Truyện\nTác giả (Nhân vật chính): Tiểu Minh\n"));
    assert!(text.contains("1. Nhặt được đồng thau\n"));
    assert!(text.contains("Chương 1: Đồng Thau Cổ\n\nMở đầu."));
    assert!(text.ends_with("Chương 2 (Đang viết...)\n\nMây trôi.\n"));
}

#[tokio::test]
async fn test_export_after_story_ends_has_no_running_chapter() {
    let mut harness = TestHarness::new();
    harness.begin("Một câu. Nửa câu").await.unwrap();
    harness.session.finish().unwrap();

    let export = StoryExport::from_session(&harness.session).unwrap();
    assert_eq!(harness.session.phase(), Phase::Ended);
    assert!(export.in_progress.is_none());
    assert!(export.render().contains("Chương 1: Chương 1 (Phần cuối)\n\nMột câu."));
}

#[test]
fn test_export_requires_character() {
    let session = GameSession::new(MockGenerator::new(), SessionConfig::default(), None);
    assert!(StoryExport::from_session(&session).is_err());
}

#[tokio::test]
async fn test_finalized_chapters_written_to_disk() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut harness = TestHarness::with_config(small_chapters(1));
    harness.begin("Mở đầu.").await.unwrap();
    harness.expect_segment(prose(10)).expect_title("Khởi Đầu");

    let outcome = harness.act("Đi").await.unwrap();
    assert!(outcome.ended);

    let character = harness.character().clone();
    let mut written = Vec::new();
    for chapter in &outcome.finalized {
        let path = write_chapter(temp_dir.path(), chapter, &character)
            .await
            .expect("Export should succeed");
        written.push(path);
    }

    assert_eq!(written.len(), 2);
    assert!(written[0].ends_with("GiaThienKyTruyen_Chuong1_Khởi_Đầu.txt"));
    assert_eq!(
        written[1].file_name().and_then(|n| n.to_str()),
        Some(chapter_file_name(&outcome.finalized[1]).as_str())
    );

    let export = StoryExport::from_session(&harness.session).unwrap();
    let story_path = write_story(temp_dir.path(), &export)
        .await
        .expect("Export should succeed");
    assert!(story_path.ends_with(STORY_FILE_NAME));

    let story = std::fs::read_to_string(story_path).unwrap();
    assert!(story.contains("Chương 1: Khởi Đầu"));
    assert!(story.contains("Chương 2: Chương 2 (Phần cuối)\n\nMây trôi."));
}

// =============================================================================
// PROFILE
// =============================================================================

#[tokio::test]
async fn test_key_events_survive_restart() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = ProfileStore::new(temp_dir.path().join("profile.json"));

    let mut harness = TestHarness::new();
    store
        .save_credential(harness.session.credential().unwrap())
        .await
        .expect("Save should succeed");
    harness.begin("Mở đầu.").await.unwrap();
    harness.expect_segment("Sấm rền. [KEY_EVENT: Thiên kiếp giáng xuống]");
    harness.act("Chịu kiếp").await.unwrap();
    store
        .save_key_events(harness.session.key_events().to_vec())
        .await
        .expect("Save should succeed");

    let profile = store.load().await.expect("Load should succeed");
    assert!(profile.has_credential());

    let restored = GameSession::new(
        MockGenerator::new(),
        SessionConfig::default(),
        profile.credential.clone(),
    )
    .with_key_events(profile.key_events);

    assert_eq!(restored.phase(), Phase::SettingsSetup);
    assert_eq!(
        restored.key_events().to_vec(),
        vec!["Thiên kiếp giáng xuống".to_string()]
    );
}

#[tokio::test]
async fn test_empty_profile_starts_at_credential_entry() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = ProfileStore::new(temp_dir.path().join("profile.json"));
    let profile = store.load().await.expect("Load should succeed");

    let session = GameSession::new(MockGenerator::new(), SessionConfig::default(), profile.credential);
    assert_eq!(session.phase(), Phase::CredentialEntry);
}

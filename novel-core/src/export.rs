//! Plain-text exports of the novel.
//!
//! Every finished chapter is written to its own file, and the whole story
//! can be written on demand. Both start with the character block.

use crate::narrator::StoryGenerator;
use crate::phase::Phase;
use crate::session::GameSession;
use crate::world::{Character, KeyStoryEvent, StoryChapter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// File name of the full story export.
pub const STORY_FILE_NAME: &str = "GiaThienKyTruyen.txt";

const BOOK_TITLE: &str = "Tiểu Thuyết Già Thiên Kỳ Truyện";
const CHAPTER_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No character has been created yet")]
    NoCharacter,
}

/// `GiaThienKyTruyen_Chuong{N}_{title}.txt`, with the title reduced to
/// letters, digits and underscores.
pub fn chapter_file_name(chapter: &StoryChapter) -> String {
    let mut sanitized = String::new();
    let mut pending_space = false;
    for c in chapter.title.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else if c.is_alphanumeric() || c == '_' {
            if pending_space && !sanitized.is_empty() {
                sanitized.push('_');
            }
            pending_space = false;
            sanitized.push(c);
        }
    }
    if sanitized.is_empty() {
        sanitized.push_str("KhongTieuDe");
    }
    format!("GiaThienKyTruyen_Chuong{}_{sanitized}.txt", chapter.number)
}

fn character_block(character: &Character) -> String {
    format!(
        "Tác giả (Nhân vật chính): {}\nTuổi: {}\nTính cách: {}\nSở thích: {}\nCảnh giới: {}\nThế lực: {}\nVị trí: {}\n",
        character.name,
        character.age,
        character.personality,
        character.interests,
        character.cultivation(),
        character.faction,
        character.location
    )
}

fn chapter_body(chapter: &StoryChapter) -> String {
    format!("{}\n\n{}", chapter.heading(), chapter.content)
}

/// Text of a single chapter file.
pub fn render_chapter(chapter: &StoryChapter, character: &Character) -> String {
    format!(
        "{BOOK_TITLE}\n{}\n{}\n",
        character_block(character),
        chapter_body(chapter)
    )
}

/// Everything that goes into the full story file.
#[derive(Debug, Clone)]
pub struct StoryExport<'a> {
    pub character: &'a Character,
    pub target_chapters: u32,
    pub key_events: Vec<&'a KeyStoryEvent>,
    pub chapters: &'a [StoryChapter],
    /// Number and text of the chapter still being written.
    pub in_progress: Option<(u32, &'a str)>,
}

impl<'a> StoryExport<'a> {
    /// Snapshot a session. The running chapter is included while playing.
    pub fn from_session<G: StoryGenerator>(session: &'a GameSession<G>) -> Result<Self, ExportError> {
        let character = session.character().ok_or(ExportError::NoCharacter)?;
        let buffer = session.current_chapter_text();
        let in_progress = (session.phase() == Phase::Playing && !buffer.trim().is_empty())
            .then_some((session.chapter_number(), buffer));

        Ok(Self {
            character,
            target_chapters: session.config().target_chapters,
            key_events: session.key_events().iter().collect(),
            chapters: session.chapters(),
            in_progress,
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(BOOK_TITLE);
        out.push('\n');
        out.push_str(&character_block(self.character));
        out.push_str(&format!("Số chương mục tiêu (mặc định): {}\n", self.target_chapters));

        if !self.key_events.is_empty() {
            out.push_str("\n--- CÁC SỰ KIỆN TRỌNG YẾU ĐÃ GHI NHẬN ---\n");
            for (i, event) in self.key_events.iter().enumerate() {
                out.push_str(&format!("{}. {event}\n", i + 1));
            }
            out.push_str("---\n");
        }

        let mut sections: Vec<String> = self.chapters.iter().map(chapter_body).collect();
        if let Some((number, text)) = self.in_progress {
            sections.push(format!("Chương {number} (Đang viết...)\n\n{text}"));
        }

        if !sections.is_empty() {
            out.push('\n');
            out.push_str(&sections.join(CHAPTER_SEPARATOR));
            out.push('\n');
        }
        out
    }
}

/// Write one chapter file into `dir`. Returns the file path.
pub async fn write_chapter(
    dir: impl AsRef<Path>,
    chapter: &StoryChapter,
    character: &Character,
) -> Result<PathBuf, ExportError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).await?;
    let path = dir.join(chapter_file_name(chapter));
    fs::write(&path, render_chapter(chapter, character)).await?;
    tracing::info!(chapter = chapter.number, path = %path.display(), "chapter exported");
    Ok(path)
}

/// Write the full story into `dir`. Returns the file path.
pub async fn write_story(dir: impl AsRef<Path>, export: &StoryExport<'_>) -> Result<PathBuf, ExportError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).await?;
    let path = dir.join(STORY_FILE_NAME);
    fs::write(&path, export.render()).await?;
    tracing::info!(chapters = export.chapters.len(), path = %path.display(), "story exported");
    Ok(path)
}

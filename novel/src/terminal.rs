//! Line-oriented play loop.
//!
//! - Lines starting with `#` are commands
//! - Anything else answers the current prompt: the API key, a setup field,
//!   or a player action
//!
//! Finished chapters are written to the output directory as soon as they
//! are finalized. The API key and the key event log are saved to the profile.

use novel_core::export::{write_chapter, write_story};
use novel_core::{
    parse_update, CharacterSettings, GameSession, Narrator, Phase, ProfileStore, RoundOutcome,
    SessionError, StoryChapter, StoryExport, StoryGenerator,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Setup questions with the answer used when the player just presses Enter.
const SETUP_FIELDS: [(&str, &str); 5] = [
    ("Tên nhân vật", "Lâm Phong"),
    ("Tuổi", "16"),
    ("Nơi bắt đầu", "Thôn Thanh Thủy"),
    ("Tính cách", "Kiên nhẫn, tò mò"),
    ("Sở thích", "Cổ tịch, luyện đan"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Terminal<G: StoryGenerator = Narrator> {
    session: GameSession<G>,
    store: Option<ProfileStore>,
    output_dir: PathBuf,
    /// Answers collected so far during character setup.
    draft: Vec<String>,
}

impl<G: StoryGenerator> Terminal<G> {
    pub fn new(session: GameSession<G>, store: Option<ProfileStore>, output_dir: PathBuf) -> Self {
        Self {
            session,
            store,
            output_dir,
            draft: Vec::new(),
        }
    }

    pub async fn run<R: BufRead>(mut self, input: R) -> anyhow::Result<()> {
        println!("=== Già Thiên Kỳ Truyện ===");
        println!("Gõ #help để xem các lệnh.");
        println!();
        self.prompt();

        for line in input.lines() {
            let line = line?;
            let line = line.trim();

            if let Some(command) = line.strip_prefix('#') {
                if self.command(command).await == Flow::Quit {
                    println!("Tạm biệt!");
                    break;
                }
            } else {
                match self.session.phase() {
                    Phase::CredentialEntry => self.enter_credential(line).await,
                    Phase::SettingsSetup => self.answer_setup(line).await,
                    Phase::Playing => self.play(line).await,
                    Phase::Ended => {
                        println!("[INFO] Câu chuyện đã kết thúc. Dùng #download, #reset hoặc #quit.")
                    }
                }
            }

            self.prompt();
        }

        Ok(())
    }

    fn prompt(&self) {
        match self.session.phase() {
            Phase::CredentialEntry => print!("Nhập Gemini API Key: "),
            Phase::SettingsSetup => {
                if let Some((label, sample)) = SETUP_FIELDS.get(self.draft.len()) {
                    print!("{label} [{sample}]: ");
                }
            }
            Phase::Playing if self.session.is_awaiting_first_generation() => {
                print!("(#start để bắt đầu) > ")
            }
            Phase::Playing => print!("> "),
            Phase::Ended => print!("# "),
        }
        io::stdout().flush().ok();
    }

    // ------------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------------

    async fn enter_credential(&mut self, key: &str) {
        match self.session.submit_credential(key) {
            Ok(_) => {
                self.remember_credential(key).await;
                println!("[OK] Đã lưu API Key.");
                println!();
                println!("Thiết lập nhân vật (Enter để dùng giá trị mặc định):");
            }
            Err(e) => println!("[LỖI] {}", e.user_message()),
        }
    }

    async fn answer_setup(&mut self, answer: &str) {
        let index = self.draft.len();
        let Some((_, sample)) = SETUP_FIELDS.get(index) else {
            return;
        };
        let answer = if answer.is_empty() { *sample } else { answer };

        if index == 1 && !matches!(answer.parse::<u32>(), Ok(age) if age > 0) {
            println!("[LỖI] Tuổi phải là một số nguyên dương.");
            return;
        }
        self.draft.push(answer.to_string());
        if self.draft.len() < SETUP_FIELDS.len() {
            return;
        }

        let settings = self.settings_from_draft();
        self.draft.clear();
        match self.session.setup_character(&settings) {
            Ok(character) => {
                println!();
                println!("[NHÂN VẬT] {} ({} tuổi) tại {}", character.name, character.age, character.location);
                // Setup starts a fresh event log
                self.remember_key_events().await;
                self.begin().await;
            }
            Err(e) => println!("[LỖI] {}", e.user_message()),
        }
    }

    fn settings_from_draft(&self) -> CharacterSettings {
        let field = |i: usize| self.draft.get(i).cloned().unwrap_or_default();
        CharacterSettings {
            name: field(0),
            age: field(1).parse().unwrap_or(0),
            initial_location: field(2),
            personality: field(3),
            interests: field(4),
        }
    }

    async fn begin(&mut self) {
        println!("[ĐANG VIẾT]");
        match self.session.begin_story().await {
            Ok(opening) => {
                println!();
                print_passage(&opening);
            }
            Err(e) => self.report(&e),
        }
    }

    async fn play(&mut self, action: &str) {
        if action.is_empty() {
            return;
        }
        println!("[ĐANG VIẾT]");
        match self.session.player_action(action).await {
            Ok(outcome) => self.show_outcome(outcome).await,
            Err(e) => self.report(&e),
        }
    }

    async fn show_outcome(&mut self, outcome: RoundOutcome) {
        println!();
        print_passage(&outcome.segment);

        if outcome.character_changed {
            if let Some(character) = self.session.character() {
                println!(
                    "[NHÂN VẬT] {} | {} | {}",
                    character.cultivation(),
                    character.faction,
                    character.location
                );
            }
        }
        for event in &outcome.new_events {
            println!("[SỰ KIỆN] {event}");
        }
        for chapter in &outcome.finalized {
            self.export_chapter(chapter).await;
        }
        if !outcome.new_events.is_empty() {
            self.remember_key_events().await;
        }
        if outcome.ended {
            println!();
            println!(
                "[KẾT THÚC] Câu chuyện đã hoàn thành với {} chương. Dùng #download để tải toàn bộ truyện.",
                self.session.chapters().len()
            );
        }
    }

    fn report(&self, error: &SessionError) {
        println!("[LỖI] {}", error.user_message());
        if let SessionError::Generation(e) = error {
            if e.is_credential_problem() {
                println!("[INFO] Dùng #key <API key mới> để thay API Key.");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    async fn command(&mut self, command: &str) -> Flow {
        let mut parts = command.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim).unwrap_or_default();

        match name {
            "quit" | "exit" => return Flow::Quit,
            "help" => print_help(),
            "status" => self.print_status(),
            "events" => self.print_events(),
            "start" => {
                if self.session.is_awaiting_first_generation() {
                    self.begin().await;
                } else {
                    println!("[LỖI] Câu chuyện chưa thể bắt đầu lúc này.");
                }
            }
            "key" => self.change_key(arg).await,
            "edit" => self.edit_character(arg),
            "download" => self.download().await,
            "finish" => match self.session.finish() {
                Ok(last) => {
                    if let Some(chapter) = last {
                        self.export_chapter(&chapter).await;
                    }
                    println!("[KẾT THÚC] Đã kết thúc câu chuyện. Dùng #download để tải toàn bộ truyện.");
                }
                Err(e) => println!("[LỖI] {}", e.user_message()),
            },
            "reset" => match self.session.reset() {
                Ok(_) => {
                    self.draft.clear();
                    self.remember_key_events().await;
                    println!("[OK] Đã xóa câu chuyện. Thiết lập nhân vật mới:");
                }
                Err(e) => println!("[LỖI] {}", e.user_message()),
            },
            _ => println!("[LỖI] Lệnh không hợp lệ. Gõ #help để xem các lệnh."),
        }
        Flow::Continue
    }

    fn edit_character(&mut self, fields: &str) {
        let Some(character) = self.session.character() else {
            println!("[LỖI] Chưa có nhân vật.");
            return;
        };
        let (update, rejected) = parse_update(fields, character);
        for (field, value) in &rejected {
            println!("[LỖI] Giá trị không hợp lệ: {field}=\"{value}\"");
        }
        if update.is_empty() {
            println!("[LỖI] Cú pháp: #edit realm=\"...\" stage=\"...\" faction=\"...\" location=\"...\"");
            return;
        }

        match self.session.update_character(&update) {
            Ok(character) => println!(
                "[NHÂN VẬT] {} | {} | {}",
                character.cultivation(),
                character.faction,
                character.location
            ),
            Err(e) => println!("[LỖI] {}", e.user_message()),
        }
    }

    async fn change_key(&mut self, key: &str) {
        if key.is_empty() {
            // Back to the key prompt, only allowed before the story starts
            match self.session.change_credential() {
                Ok(_) => self.draft.clear(),
                Err(e) => println!("[LỖI] {e}. Dùng #key <API key mới>."),
            }
            return;
        }

        let result = match self.session.phase() {
            Phase::CredentialEntry => self.session.submit_credential(key).map(|_| ()),
            _ => self.session.replace_credential(key),
        };
        match result {
            Ok(()) => {
                self.remember_credential(key).await;
                println!("[OK] Đã cập nhật API Key.");
            }
            Err(e) => println!("[LỖI] {}", e.user_message()),
        }
    }

    async fn download(&self) {
        let export = match StoryExport::from_session(&self.session) {
            Ok(export) => export,
            Err(e) => {
                println!("[LỖI] {e}");
                return;
            }
        };
        match write_story(&self.output_dir, &export).await {
            Ok(path) => println!("[ĐÃ LƯU] {}", path.display()),
            Err(e) => println!("[LỖI] Không thể lưu truyện: {e}"),
        }
    }

    async fn export_chapter(&self, chapter: &StoryChapter) {
        let Some(character) = self.session.character() else {
            return;
        };
        match write_chapter(&self.output_dir, chapter, character).await {
            Ok(path) => println!("[CHƯƠNG {}] {} -> {}", chapter.number, chapter.title, path.display()),
            Err(e) => println!("[LỖI] Không thể lưu chương {}: {e}", chapter.number),
        }
    }

    fn print_status(&self) {
        println!("[TRẠNG THÁI] {}", self.session.phase());
        if let Some(character) = self.session.character() {
            println!("  Nhân vật: {} ({} tuổi)", character.name, character.age);
            println!("  Cảnh giới: {}", character.cultivation());
            println!("  Thế lực: {}", character.faction);
            println!("  Vị trí: {}", character.location);
        }
        if let Some(progress) = self.session.progress() {
            println!(
                "  Chương {}/{} ({:.0}%), toàn truyện {:.0}%",
                progress.chapter_number,
                progress.target_chapters,
                progress.chapter_percent,
                progress.overall_percent
            );
            println!("  Đã hoàn thành: {} chương", progress.completed_chapters);
        }
        println!("  Sự kiện trọng yếu: {}", self.session.key_events().len());
        if let Some(error) = self.session.last_error() {
            println!("  Lỗi gần nhất: {error}");
        }
    }

    fn print_events(&self) {
        if self.session.key_events().is_empty() {
            println!("[SỰ KIỆN] Chưa có sự kiện nào.");
            return;
        }
        println!("[SỰ KIỆN]");
        for (i, event) in self.session.key_events().iter().enumerate() {
            println!("  {}. {event}", i + 1);
        }
    }

    // ------------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------------

    async fn remember_credential(&self, key: &str) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save_credential(key.trim()).await {
                tracing::warn!(error = %e, "failed to save API key");
            }
        }
    }

    async fn remember_key_events(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save_key_events(self.session.key_events().to_vec()).await {
                tracing::warn!(error = %e, "failed to save key events");
            }
        }
    }
}

fn print_passage(text: &str) {
    for para in text.split("\n\n") {
        println!("{para}");
        println!();
    }
}

fn print_help() {
    println!("[HELP]");
    println!("  #start          - Viết đoạn mở đầu (thử lại nếu lần trước lỗi)");
    println!("  #status         - Xem nhân vật và tiến độ");
    println!("  #events         - Xem các sự kiện trọng yếu");
    println!("  #download       - Lưu toàn bộ truyện ra tệp");
    println!("  #finish         - Kết thúc câu chuyện ngay");
    println!("  #reset          - Xóa câu chuyện và tạo nhân vật mới");
    println!("  #key [API key]  - Thay API Key");
    println!("  #edit realm=\"..\" stage=\"..\" faction=\"..\" location=\"..\"");
    println!("                  - Sửa cảnh giới, thế lực, vị trí của nhân vật");
    println!("  #quit           - Thoát");
    println!("  (mọi dòng khác là hành động của nhân vật)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use novel_core::testing::{MockGenerator, TEST_CREDENTIAL};
    use novel_core::{Faction, Realm, SessionConfig};
    use tempfile::TempDir;

    fn terminal(temp_dir: &TempDir, old_events: Vec<String>) -> Terminal<MockGenerator> {
        let session = GameSession::new(
            MockGenerator::new(),
            SessionConfig::default(),
            Some(TEST_CREDENTIAL.to_string()),
        )
        .with_key_events(old_events);
        Terminal::new(
            session,
            Some(ProfileStore::new(temp_dir.path().join("profile.json"))),
            temp_dir.path().join("out"),
        )
    }

    async fn create_default_character(terminal: &mut Terminal<MockGenerator>) {
        for _ in SETUP_FIELDS {
            terminal.answer_setup("").await;
        }
    }

    #[tokio::test]
    async fn test_setup_clears_saved_key_events() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = ProfileStore::new(temp_dir.path().join("profile.json"));
        store
            .save_key_events(vec!["Chuyện cũ".into()])
            .await
            .expect("Save should succeed");

        let mut terminal = terminal(&temp_dir, vec!["Chuyện cũ".into()]);
        create_default_character(&mut terminal).await;

        assert_eq!(terminal.session.phase(), Phase::Playing);
        assert!(!terminal.session.is_awaiting_first_generation());
        let profile = store.load().await.expect("Load should succeed");
        assert!(profile.key_events.is_empty());
    }

    #[tokio::test]
    async fn test_edit_command_updates_character() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut terminal = terminal(&temp_dir, Vec::new());
        create_default_character(&mut terminal).await;

        let flow = terminal
            .command(r#"edit realm="Luân Hải Bí Cảnh" stage="Thần Kiều", faction="Thiên Đình""#)
            .await;
        assert_eq!(flow, Flow::Continue);

        let character = terminal.session.character().expect("character");
        assert_eq!(character.realm, Realm::LuanHai);
        assert_eq!(character.stage, "Thần Kiều");
        assert_eq!(character.faction, Faction::ThienDinh);
    }

    #[tokio::test]
    async fn test_edit_with_invalid_values_changes_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut terminal = terminal(&temp_dir, Vec::new());
        create_default_character(&mut terminal).await;
        let before = terminal.session.character().cloned();

        terminal.command(r#"edit realm="Tiên Vương""#).await;
        terminal.command("edit").await;

        assert_eq!(terminal.session.character().cloned(), before);
    }
}

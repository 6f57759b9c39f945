//! Story world types.
//!
//! Contains the cultivation progression tiers, factions, the player
//! character record, and the finished chapters that make up the novel.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for one story, assigned at character setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoryId(pub Uuid);

impl StoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Realms
// ============================================================================

/// Cultivation realm, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Realm {
    PhamNhan,
    LuanHai,
    DaoCung,
    TuCuc,
    HoaLong,
    TienDai,
    ChuanDe,
    DaiDeHongTranTien,
}

const PHAM_NHAN_STAGES: &[&str] = &["Người Thường"];
const LUAN_HAI_STAGES: &[&str] = &["Khổ Hải", "Mệnh Tuyền", "Thần Kiều", "Bỉ Ngạn"];
const DAO_CUNG_STAGES: &[&str] = &[
    "Tu Luyện Tâm",
    "Tu Luyện Can",
    "Tu Luyện Tỳ",
    "Tu Luyện Phế",
    "Tu Luyện Thận",
];
const TU_CUC_STAGES: &[&str] = &[
    "Tu Luyện Tứ Chi - Đông",
    "Tu Luyện Tứ Chi - Tây",
    "Tu Luyện Tứ Chi - Nam",
    "Tu Luyện Tứ Chi - Bắc",
];
const HOA_LONG_STAGES: &[&str] = &[
    "Hóa Long Biến 1",
    "Hóa Long Biến 2",
    "Hóa Long Biến 3",
    "Hóa Long Biến 4",
    "Hóa Long Biến 5",
    "Hóa Long Biến 6",
    "Hóa Long Biến 7",
    "Hóa Long Biến 8",
    "Hóa Long Biến 9",
];
const TIEN_DAI_STAGES: &[&str] = &[
    "Tiên Đài Tầng 1",
    "Tiên Đài Tầng 2",
    "Tiên Đài Tầng 3",
    "Tiên Đài Tầng 4",
    "Tiên Đài Tầng 5",
    "Tiên Đài Tầng 6",
];
const CHUAN_DE_STAGES: &[&str] = &[
    "Chuẩn Đế Cửu Trọng Thiên 1",
    "Chuẩn Đế Cửu Trọng Thiên 2",
    "Chuẩn Đế Cửu Trọng Thiên 3",
    "Chuẩn Đế Cửu Trọng Thiên 4",
    "Chuẩn Đế Cửu Trọng Thiên 5",
    "Chuẩn Đế Cửu Trọng Thiên 6",
    "Chuẩn Đế Cửu Trọng Thiên 7",
    "Chuẩn Đế Cửu Trọng Thiên 8",
    "Chuẩn Đế Cửu Trọng Thiên 9",
];
const DAI_DE_STAGES: &[&str] = &["Đại Đế", "Hồng Trần Tiên"];

impl Realm {
    /// All realms in progression order.
    pub const ALL: [Realm; 8] = [
        Realm::PhamNhan,
        Realm::LuanHai,
        Realm::DaoCung,
        Realm::TuCuc,
        Realm::HoaLong,
        Realm::TienDai,
        Realm::ChuanDe,
        Realm::DaiDeHongTranTien,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Realm::PhamNhan => "Phàm Nhân",
            Realm::LuanHai => "Luân Hải Bí Cảnh",
            Realm::DaoCung => "Đạo Cung Bí Cảnh",
            Realm::TuCuc => "Tứ Cực Bí Cảnh",
            Realm::HoaLong => "Hóa Long Bí Cảnh",
            Realm::TienDai => "Tiên Đài Bí Cảnh",
            Realm::ChuanDe => "Chuẩn Đế",
            Realm::DaiDeHongTranTien => "Đại Đế / Hồng Trần Tiên",
        }
    }

    /// The ordered stages of this realm. Never empty.
    pub fn stages(&self) -> &'static [&'static str] {
        match self {
            Realm::PhamNhan => PHAM_NHAN_STAGES,
            Realm::LuanHai => LUAN_HAI_STAGES,
            Realm::DaoCung => DAO_CUNG_STAGES,
            Realm::TuCuc => TU_CUC_STAGES,
            Realm::HoaLong => HOA_LONG_STAGES,
            Realm::TienDai => TIEN_DAI_STAGES,
            Realm::ChuanDe => CHUAN_DE_STAGES,
            Realm::DaiDeHongTranTien => DAI_DE_STAGES,
        }
    }

    pub fn first_stage(&self) -> &'static str {
        self.stages()[0]
    }

    /// Look up the canonical spelling of `stage` within this realm.
    pub fn find_stage(&self, stage: &str) -> Option<&'static str> {
        let wanted = stage.trim().to_lowercase();
        self.stages()
            .iter()
            .copied()
            .find(|s| s.to_lowercase() == wanted)
    }

    pub fn has_stage(&self, stage: &str) -> bool {
        self.find_stage(stage).is_some()
    }

    /// Parse a realm from its display name, ignoring case and surrounding
    /// whitespace.
    pub fn parse(name: &str) -> Option<Realm> {
        let wanted = name.trim().to_lowercase();
        Realm::ALL
            .into_iter()
            .find(|r| r.name().to_lowercase() == wanted)
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Factions
// ============================================================================

/// A group the character can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    ChuaGiaNhap,
    TanTu,
    ThonLangDiaPhuong,
    KimHaDongThien,
    NgocDinhDongThien,
    YenHaDongThien,
    TuDuongDongThien,
    TichNguyetDongThien,
    LinhKhuDongThien,
    CoGia,
    KhuongGia,
    ThienDinh,
    ThienDeThanhDia,
    LienMinhVuTru,
}

impl Faction {
    pub const ALL: [Faction; 14] = [
        Faction::ChuaGiaNhap,
        Faction::TanTu,
        Faction::ThonLangDiaPhuong,
        Faction::KimHaDongThien,
        Faction::NgocDinhDongThien,
        Faction::YenHaDongThien,
        Faction::TuDuongDongThien,
        Faction::TichNguyetDongThien,
        Faction::LinhKhuDongThien,
        Faction::CoGia,
        Faction::KhuongGia,
        Faction::ThienDinh,
        Faction::ThienDeThanhDia,
        Faction::LienMinhVuTru,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Faction::ChuaGiaNhap => "Chưa Gia Nhập",
            Faction::TanTu => "Tán Tu",
            Faction::ThonLangDiaPhuong => "Thôn Làng/Địa Phương Nhỏ",
            Faction::KimHaDongThien => "Kim Hà Động Thiên",
            Faction::NgocDinhDongThien => "Ngọc Đỉnh Động Thiên",
            Faction::YenHaDongThien => "Yên Hà Động Thiên",
            Faction::TuDuongDongThien => "Tử Dương Động Thiên",
            Faction::TichNguyetDongThien => "Tịch Nguyệt Động Thiên",
            Faction::LinhKhuDongThien => "Linh Khư Động Thiên",
            Faction::CoGia => "Cơ Gia",
            Faction::KhuongGia => "Khương Gia",
            Faction::ThienDinh => "Thiên Đình",
            Faction::ThienDeThanhDia => "Thiên Đế Thánh Địa",
            Faction::LienMinhVuTru => "Liên Minh Vũ Trụ",
        }
    }

    /// Parse a faction from its display name, ignoring case and surrounding
    /// whitespace.
    pub fn parse(name: &str) -> Option<Faction> {
        let wanted = name.trim().to_lowercase();
        Faction::ALL
            .into_iter()
            .find(|f| f.name().to_lowercase() == wanted)
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Character
// ============================================================================

/// The creation form filled in before the story starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSettings {
    pub name: String,
    pub age: u32,
    pub initial_location: String,
    pub personality: String,
    pub interests: String,
}

impl CharacterSettings {
    /// Check that every field is filled in and the age is positive.
    ///
    /// Returns the name of the first offending field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("name");
        }
        if self.age == 0 {
            return Err("age");
        }
        if self.initial_location.trim().is_empty() {
            return Err("initial_location");
        }
        if self.personality.trim().is_empty() {
            return Err("personality");
        }
        if self.interests.trim().is_empty() {
            return Err("interests");
        }
        Ok(())
    }
}

/// The player character.
///
/// `name`, `age`, `personality` and `interests` are fixed at creation.
/// Realm, stage, faction and location only change through
/// [`crate::rules::apply_update`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub age: u32,
    pub personality: String,
    pub interests: String,
    pub realm: Realm,
    pub stage: String,
    pub faction: Faction,
    pub location: String,
}

impl Character {
    /// Create a fresh mortal from the setup form.
    pub fn new(settings: &CharacterSettings) -> Self {
        Self {
            name: settings.name.trim().to_string(),
            age: settings.age,
            personality: settings.personality.trim().to_string(),
            interests: settings.interests.trim().to_string(),
            realm: Realm::PhamNhan,
            stage: Realm::PhamNhan.first_stage().to_string(),
            faction: Faction::ChuaGiaNhap,
            location: settings.initial_location.trim().to_string(),
        }
    }

    /// `Realm - Stage`, as shown on the character sheet.
    pub fn cultivation(&self) -> String {
        format!("{} - {}", self.realm, self.stage)
    }
}

// ============================================================================
// Story
// ============================================================================

/// A short description of a significant plot beat.
pub type KeyStoryEvent = String;

/// A finished chapter. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryChapter {
    pub number: u32,
    pub title: String,
    pub content: String,
}

impl StoryChapter {
    pub fn new(number: u32, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            content: content.into(),
        }
    }

    /// `Chương N: Title`
    pub fn heading(&self) -> String {
        format!("Chương {}: {}", self.number, self.title)
    }
}

/// Fallback title when the storyteller does not provide one.
pub fn default_chapter_title(number: u32) -> String {
    format!("Chương {number}")
}

/// Create a sample character for tests and demos.
pub fn create_sample_character(name: &str) -> Character {
    Character::new(&CharacterSettings {
        name: name.to_string(),
        age: 16,
        initial_location: "Thôn Thanh Thủy".to_string(),
        personality: "Kiên nhẫn, tò mò".to_string(),
        interests: "Cổ tịch, luyện đan".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_realm_has_stages() {
        for realm in Realm::ALL {
            assert!(!realm.stages().is_empty(), "{realm} has no stages");
        }
        assert_eq!(Realm::HoaLong.stages().len(), 9);
        assert_eq!(Realm::TienDai.stages().len(), 6);
        assert_eq!(Realm::ChuanDe.stages().len(), 9);
    }

    #[test]
    fn test_realm_order() {
        assert!(Realm::PhamNhan < Realm::LuanHai);
        assert!(Realm::ChuanDe < Realm::DaiDeHongTranTien);
    }

    #[test]
    fn test_realm_parse() {
        assert_eq!(Realm::parse("Luân Hải Bí Cảnh"), Some(Realm::LuanHai));
        assert_eq!(Realm::parse("  luân hải bí cảnh "), Some(Realm::LuanHai));
        assert_eq!(Realm::parse("Đại Đế / Hồng Trần Tiên"), Some(Realm::DaiDeHongTranTien));
        assert_eq!(Realm::parse("Luân Hải"), None);
    }

    #[test]
    fn test_find_stage_returns_canonical_spelling() {
        assert_eq!(Realm::LuanHai.find_stage("mệnh tuyền"), Some("Mệnh Tuyền"));
        assert!(!Realm::LuanHai.has_stage("Tu Luyện Tâm"));
    }

    #[test]
    fn test_faction_parse() {
        assert_eq!(Faction::parse("Tán Tu"), Some(Faction::TanTu));
        assert_eq!(Faction::parse("thiên đình"), Some(Faction::ThienDinh));
        assert_eq!(Faction::parse("Ma Tộc"), None);
    }

    #[test]
    fn test_new_character_starts_mortal() {
        let character = create_sample_character("Tiểu Minh");
        assert_eq!(character.realm, Realm::PhamNhan);
        assert_eq!(character.stage, "Người Thường");
        assert_eq!(character.faction, Faction::ChuaGiaNhap);
        assert_eq!(character.location, "Thôn Thanh Thủy");
        assert_eq!(character.cultivation(), "Phàm Nhân - Người Thường");
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = CharacterSettings {
            name: "A Niu".to_string(),
            age: 15,
            initial_location: "Bắc Nguyên".to_string(),
            personality: "Lanh lợi".to_string(),
            interests: "Săn bắn".to_string(),
        };
        assert!(settings.validate().is_ok());

        settings.age = 0;
        assert_eq!(settings.validate(), Err("age"));

        settings.age = 15;
        settings.interests = "   ".to_string();
        assert_eq!(settings.validate(), Err("interests"));
    }

    #[test]
    fn test_chapter_heading() {
        let chapter = StoryChapter::new(3, "Di Sản Thiên Đế", "...");
        assert_eq!(chapter.heading(), "Chương 3: Di Sản Thiên Đế");
        assert_eq!(default_chapter_title(7), "Chương 7");
    }
}

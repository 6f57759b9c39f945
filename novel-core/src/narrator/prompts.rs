//! Prompt composition for the storyteller.

use super::agent::StoryContext;
use crate::world::{Character, Faction, Realm};

pub(crate) const SEGMENT_SYSTEM: &str = include_str!("prompts/segment_system.txt");
pub(crate) const OPENING_SYSTEM: &str = include_str!("prompts/opening_system.txt");
pub(crate) const TITLE_SYSTEM: &str = include_str!("prompts/title_system.txt");

/// Characters of chapter text sent when asking for a title.
pub const TITLE_EXCERPT_CHARS: usize = 8_000;

/// System instruction for story segments, with the valid directive values
/// appended so the storyteller can match them exactly.
pub fn segment_system() -> String {
    let mut prompt = String::from(SEGMENT_SYSTEM.trim_end());

    prompt.push_str("\n\nCảnh giới và các tiểu cảnh hợp lệ:\n");
    for realm in Realm::ALL {
        prompt.push_str(&format!("- {}: {}\n", realm, realm.stages().join(", ")));
    }

    prompt.push_str("\nThế lực hợp lệ: ");
    prompt.push_str(
        &Faction::ALL
            .iter()
            .map(|f| f.name())
            .collect::<Vec<_>>()
            .join(", "),
    );
    prompt.push('\n');
    prompt
}

pub fn opening_system() -> &'static str {
    OPENING_SYSTEM.trim_end()
}

pub fn title_system() -> &'static str {
    TITLE_SYSTEM.trim_end()
}

fn character_sheet(character: &Character) -> String {
    format!(
        "- Tên: {}\n- Tuổi: {}\n- Tính cách: {}\n- Sở thích: {}\n- Cảnh giới: {}\n- Thế lực: {}\n- Vị trí: {}\n",
        character.name,
        character.age,
        character.personality,
        character.interests,
        character.cultivation(),
        character.faction,
        character.location
    )
}

/// User prompt for continuing the story after a player action.
pub fn segment_prompt(context: &StoryContext, action: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("Thông tin nhân vật hiện tại:\n");
    prompt.push_str(&character_sheet(&context.character));
    prompt.push('\n');

    if let Some(ref events) = context.key_events_summary {
        prompt.push_str("Các sự kiện trọng yếu đã xảy ra (hãy giữ nhất quán với chúng):\n");
        prompt.push_str(events);
        prompt.push_str("\n\n");
    }

    prompt.push_str(&format!(
        "Bối cảnh chương {} (đã có {} chữ):\n",
        context.chapter_number, context.chapter_len
    ));
    if context.recent_text.trim().is_empty() {
        prompt.push_str("Đây là khởi đầu của một tình tiết mới trong chương.\n");
    } else {
        prompt.push_str(&format!("Diễn biến gần nhất: \"{}\"\n", context.recent_text));
    }

    prompt.push_str(&format!("\nHành động của người chơi:\n\"{}\"\n\n", action.trim()));
    prompt.push_str(
        "Yêu cầu: viết tiếp câu chuyện chi tiết và hấp dẫn (khoảng 200-500 chữ), \
         miêu tả môi trường, các nhân vật khác và diễn biến. Kết thúc bằng một tình huống \
         mở. Thêm thẻ [CHARACTER_UPDATE: ...] hoặc [KEY_EVENT: ...] ở cuối nếu cần. \
         Chỉ viết nội dung truyện.",
    );
    prompt
}

/// User prompt for the opening passage.
pub fn opening_prompt(character: &Character) -> String {
    format!(
        "Nhân vật chính tên là {name}, {age} tuổi, tính cách {personality}, yêu thích {interests}. \
         {name} vừa xuất hiện tại {location} trong Kỷ Nguyên Hậu Thiên Đế, với cảnh giới {cultivation}.\n\
         Hãy viết một đoạn ngắn (khoảng 100-200 chữ) miêu tả khung cảnh tại {location} và cảm xúc \
         ban đầu của nhân vật. Kết thúc bằng một tình huống khiến người chơi muốn hành động. \
         Không hỏi người chơi phải làm gì.",
        name = character.name,
        age = character.age,
        personality = character.personality,
        interests = character.interests,
        location = character.location,
        cultivation = character.cultivation(),
    )
}

/// User prompt for naming a finished chapter. Only the first
/// [`TITLE_EXCERPT_CHARS`] characters of the chapter are sent.
pub fn title_prompt(chapter_text: &str, character: &Character, chapter_number: u32) -> String {
    let excerpt: String = chapter_text.chars().take(TITLE_EXCERPT_CHARS).collect();
    format!(
        "Dưới đây là nội dung chương {chapter_number} của tiểu thuyết về {name} \
         (cảnh giới {cultivation}, thế lực {faction}, đang ở {location}).\n\n\
         --- NỘI DUNG CHƯƠNG ---\n{excerpt}\n--- KẾT THÚC NỘI DUNG CHƯƠNG ---\n\n\
         Hãy đề xuất một tên chương khoảng 3-10 từ, lôi cuốn và hợp thể loại tiên hiệp. \
         Ví dụ: Di Sản Thiên Đế Thức Tỉnh, Bóng Ma Hư Không Tộc. Chỉ trả về tên chương.",
        name = character.name,
        cultivation = character.cultivation(),
        faction = character.faction,
        location = character.location,
    )
}

//! Directive extraction from storyteller output.
//!
//! The storyteller embeds machine-readable tags in its prose:
//!
//! ```text
//! [CHARACTER_UPDATE: realm="Luân Hải Bí Cảnh", faction="Thiên Đình"]
//! [KEY_EVENT: Gặp được sư phụ]
//! ```
//!
//! [`extract`] pulls these out, validates the proposed character fields and
//! returns prose that is safe to show. It never mutates anything; the caller
//! decides what to do with the update and events.

use crate::rules::CharacterUpdate;
use crate::world::{Character, Faction, KeyStoryEvent, Realm};
use regex::Regex;

lazy_static::lazy_static! {
    static ref CHARACTER_UPDATE: Regex =
        Regex::new(r"(?i)\[\s*CHARACTER_UPDATE\s*:([^\]]*)\]").unwrap();
    static ref KEY_EVENT: Regex = Regex::new(r"(?i)\[\s*KEY_EVENT\s*:([^\]]*)\]").unwrap();
    static ref FIELD: Regex = Regex::new(r#"(\w+)\s*=\s*"([^"]*)""#).unwrap();
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)```[\w-]*[ \t]*\n?(.*?)\n?[ \t]*```").unwrap();
    static ref TRAILING_SPACE: Regex = Regex::new(r"[ \t]+\n").unwrap();
    static ref INLINE_SPACE: Regex = Regex::new(r"[ \t]{2,}").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n{3,}").unwrap();
    static ref CHAPTER_PREFIX: Regex =
        Regex::new(r"(?i)^\s*chương\s*\d+\s*[:.\-–—]?\s*").unwrap();
    static ref QUOTES: Regex = Regex::new(r#"["'“”‘’]"#).unwrap();
}

/// Maximum length of a chapter title, in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Result of scanning one block of storyteller output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Prose with every directive removed and whitespace normalized.
    pub text: String,
    /// Validated character changes. Empty when nothing valid was proposed.
    pub update: CharacterUpdate,
    /// New key events, in order of appearance.
    pub events: Vec<KeyStoryEvent>,
    /// `field="value"` pairs that were unknown or failed validation.
    pub rejected: Vec<(String, String)>,
}

/// Scan `raw` for directives.
///
/// `character` is only read: stage proposals are checked against the realm
/// proposed in the same pass, or the character's current realm.
pub fn extract(raw: &str, character: &Character) -> Extraction {
    let payloads = CHARACTER_UPDATE
        .captures_iter(raw)
        .map(|c| c.get(1).map_or("", |m| m.as_str()));
    let (update, rejected) = collect_update(payloads, character);

    let events: Vec<KeyStoryEvent> = KEY_EVENT
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|e| !e.is_empty())
        .collect();

    Extraction {
        text: strip_markup(raw),
        update,
        events,
        rejected,
    }
}

/// Parse a bare `field="value", ...` list, as typed for a direct edit.
///
/// Validation is the same as for `[CHARACTER_UPDATE: ...]` payloads.
/// Returns the update and the rejected pairs.
pub fn parse_update(
    fields: &str,
    character: &Character,
) -> (CharacterUpdate, Vec<(String, String)>) {
    collect_update(std::iter::once(fields), character)
}

fn collect_update<'a>(
    payloads: impl Iterator<Item = &'a str>,
    character: &Character,
) -> (CharacterUpdate, Vec<(String, String)>) {
    let mut proposed_realm: Option<Realm> = None;
    let mut stage_candidates: Vec<String> = Vec::new();
    let mut faction: Option<Faction> = None;
    let mut location: Option<String> = None;
    let mut rejected = Vec::new();

    for payload in payloads {
        for field in FIELD.captures_iter(payload) {
            let key = field[1].to_lowercase();
            let value = field[2].trim();
            let accepted = match key.as_str() {
                "realm" => Realm::parse(value).map(|r| proposed_realm = Some(r)).is_some(),
                "stage" if !value.is_empty() => {
                    stage_candidates.push(value.to_string());
                    true
                }
                "faction" => Faction::parse(value).map(|f| faction = Some(f)).is_some(),
                "location" if !value.is_empty() => {
                    location = Some(value.to_string());
                    true
                }
                _ => false,
            };
            if !accepted {
                rejected.push((field[1].to_string(), field[2].to_string()));
            }
        }
    }

    let effective_realm = proposed_realm.unwrap_or(character.realm);
    let mut stage = None;
    for candidate in &stage_candidates {
        match effective_realm.find_stage(candidate) {
            Some(canonical) => stage = Some(canonical.to_string()),
            None => rejected.push(("stage".to_string(), candidate.clone())),
        }
    }
    if stage.is_none() && effective_realm != character.realm {
        stage = Some(effective_realm.first_stage().to_string());
    }

    if !rejected.is_empty() {
        tracing::debug!(?rejected, "ignored directive fields");
    }

    let update = CharacterUpdate {
        realm: proposed_realm,
        stage,
        faction,
        location,
    };
    (update, rejected)
}

/// Remove every directive and code fence from `raw` and normalize whitespace.
pub fn strip_markup(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n");
    let text = CHARACTER_UPDATE.replace_all(&text, "");
    let text = KEY_EVENT.replace_all(&text, "");
    let text = CODE_FENCE.replace_all(&text, "${1}");
    normalize_whitespace(&text)
}

fn normalize_whitespace(text: &str) -> String {
    let text = TRAILING_SPACE.replace_all(text, "\n");
    let text = INLINE_SPACE.replace_all(&text, " ");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Clean a generated chapter title.
///
/// Strips markup, a leading `Chương N:` prefix and quotes, and caps the
/// length. Returns an empty string when nothing usable is left.
pub fn clean_title(raw: &str) -> String {
    let text = strip_markup(raw);
    let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let text = QUOTES.replace_all(first_line, "");
    let text = CHAPTER_PREFIX.replace(&text, "");
    text.trim().chars().take(MAX_TITLE_CHARS).collect::<String>().trim().to_string()
}

//! Chapter boundary detection.
//!
//! Lengths here are counted in `char`s, not bytes, so Vietnamese diacritics
//! count as one character each.

/// Default chapter length, in characters.
pub const DEFAULT_CHAPTER_CHARS: usize = 10_000;

/// Outcome of checking a chapter buffer against the length threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segmentation {
    /// Threshold not reached; the whole text stays in the buffer.
    Open(String),
    /// Threshold reached; `chapter` is final, `remainder` seeds the next one.
    Closed { chapter: String, remainder: String },
}

impl Segmentation {
    pub fn is_closed(&self) -> bool {
        matches!(self, Segmentation::Closed { .. })
    }
}

/// Decide whether `combined` closes a chapter of `threshold` characters.
///
/// A threshold of zero is treated as one.
pub fn segment(combined: &str, threshold: usize) -> Segmentation {
    let threshold = threshold.max(1);
    if combined.chars().count() < threshold {
        return Segmentation::Open(combined.to_string());
    }

    let cut = break_point(combined, threshold);
    Segmentation::Closed {
        chapter: combined[..cut].trim().to_string(),
        remainder: combined[cut..].trim_start().to_string(),
    }
}

/// Cut `text` at the last sensible break within `max_chars` and trim it.
///
/// With `None` the whole text is searched, so a dangling half sentence at the
/// end is dropped when an earlier sentence end exists.
pub fn trim_to_sensible_break(text: &str, max_chars: Option<usize>) -> String {
    let limit = max_chars.unwrap_or_else(|| text.chars().count());
    text[..break_point(text, limit)].trim().to_string()
}

/// Byte offset just past the chosen break within the first `limit` chars.
///
/// Preference order: sentence end (`.`, `!`, `?` followed by whitespace or
/// end of text), then whitespace, then the hard cut at `limit`.
fn break_point(text: &str, limit: usize) -> usize {
    let window: Vec<(usize, char)> = text.char_indices().take(limit).collect();
    let hard_cut = window.last().map_or(0, |&(i, c)| i + c.len_utf8());

    let sentence_end = window.iter().rev().find_map(|&(i, c)| {
        let end = i + c.len_utf8();
        let followed_by_space = text[end..].chars().next().map_or(true, char::is_whitespace);
        (matches!(c, '.' | '!' | '?') && followed_by_space).then_some(end)
    });
    if let Some(end) = sentence_end {
        return end;
    }

    window
        .iter()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map_or(hard_cut, |&(i, c)| i + c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_whitespace(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(segment("", DEFAULT_CHAPTER_CHARS), Segmentation::Open(String::new()));
        assert_eq!(trim_to_sensible_break("", None), "");
        assert_eq!(trim_to_sensible_break("", Some(10)), "");
    }

    #[test]
    fn test_below_threshold_stays_open() {
        let text = "Trời đã sáng.";
        assert_eq!(segment(text, 100), Segmentation::Open(text.to_string()));
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        // 10 chars, well over 10 bytes
        let text = "Đạo Cung ở";
        assert_eq!(text.chars().count(), 10);
        assert!(!segment(text, 11).is_closed());
        assert!(segment(text, 10).is_closed());
    }

    #[test]
    fn test_cuts_after_last_sentence_end() {
        let combined = "Câu một. Câu hai! Câu ba dang dở";
        match segment(combined, 20) {
            Segmentation::Closed { chapter, remainder } => {
                assert_eq!(chapter, "Câu một. Câu hai!");
                assert_eq!(remainder, "Câu ba dang dở");
            }
            other => panic!("expected closed, got {other:?}"),
        }
    }

    #[test]
    fn test_punctuation_inside_word_is_not_a_break() {
        let combined = "Giá là 3.14 lượng bạc nhé";
        match segment(combined, 12) {
            Segmentation::Closed { chapter, remainder } => {
                assert_eq!(chapter, "Giá là 3.14");
                assert_eq!(remainder, "lượng bạc nhé");
            }
            other => panic!("expected closed, got {other:?}"),
        }
    }

    #[test]
    fn test_sentence_end_at_threshold_followed_by_space() {
        let combined = "Xong rồi. Tiếp theo";
        match segment(combined, 9) {
            Segmentation::Closed { chapter, remainder } => {
                assert_eq!(chapter, "Xong rồi.");
                assert_eq!(remainder, "Tiếp theo");
            }
            other => panic!("expected closed, got {other:?}"),
        }
    }

    #[test]
    fn test_long_run_without_whitespace_hard_cuts() {
        let combined = "a".repeat(30);
        match segment(&combined, 10) {
            Segmentation::Closed { chapter, remainder } => {
                assert_eq!(chapter, "a".repeat(10));
                assert_eq!(remainder, "a".repeat(20));
            }
            other => panic!("expected closed, got {other:?}"),
        }
    }

    #[test]
    fn test_no_punctuation_near_boundary() {
        // 10050 chars of words with no sentence punctuation
        let combined = format!("{}abcdef", "abcdefgh ".repeat(1116));
        assert_eq!(combined.chars().count(), 10_050);

        match segment(&combined, 10_000) {
            Segmentation::Closed { chapter, remainder } => {
                assert_eq!(chapter.chars().count(), 9_998);
                assert!(chapter.ends_with("abcdefgh"));
                assert_eq!(remainder, format!("{}abcdef", "abcdefgh ".repeat(5)));
                assert_eq!(format!("{chapter} {remainder}"), combined);
            }
            other => panic!("expected closed, got {other:?}"),
        }
    }

    #[test]
    fn test_nothing_dropped_or_invented() {
        let combined = "Gió thổi. Lá rơi xào xạc!  Hắn đứng dậy,\nnhìn về phía xa? Không ai trả lời \
                        cả. Thời gian trôi qua rất chậm";
        let total = combined.chars().count();
        for threshold in 1..=total {
            match segment(combined, threshold) {
                Segmentation::Open(text) => assert_eq!(text, combined),
                Segmentation::Closed { chapter, remainder } => {
                    assert!(chapter.chars().count() <= threshold);
                    assert_eq!(
                        non_whitespace(&format!("{chapter}{remainder}")),
                        non_whitespace(combined),
                        "threshold {threshold}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_trim_to_sensible_break() {
        assert_eq!(trim_to_sensible_break("Một câu. Nửa câu", None), "Một câu.");
        assert_eq!(trim_to_sensible_break("Trọn vẹn!", None), "Trọn vẹn!");
        assert_eq!(trim_to_sensible_break("không dấu câu", None), "không dấu");
        assert_eq!(trim_to_sensible_break("abc", None), "abc");
        assert_eq!(trim_to_sensible_break("Một. Hai. Ba.", Some(5)), "Một.");
    }
}

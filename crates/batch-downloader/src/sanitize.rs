//! Filesystem-safe naming helpers.

use unicode_general_category::{GeneralCategory, get_general_category};

const FOLDER_RESERVED: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];
const FILE_RESERVED: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const MAX_FILE_NAME_CHARS: usize = 200;

/// Remove pictographic and symbol code points.
///
/// Drops every char in the "other symbol" category (emoji, dingbats), the
/// non-ASCII "modifier symbol" chars (skin-tone modifiers) and every
/// unassigned code point, plus the joiner/presentation selectors left behind
/// by emoji sequences. ASCII `^` and `` ` `` are text and stay.
pub fn strip_symbols(text: &str) -> String {
    text.chars().filter(|ch| !is_stripped_symbol(*ch)).collect()
}

fn is_stripped_symbol(ch: char) -> bool {
    if matches!(ch, '\u{200D}' | '\u{FE0E}' | '\u{FE0F}') {
        return true;
    }
    match get_general_category(ch) {
        GeneralCategory::OtherSymbol | GeneralCategory::Unassigned => true,
        GeneralCategory::ModifierSymbol => !ch.is_ascii(),
        _ => false,
    }
}

/// Folder name for a group label.
pub fn sanitize_folder_name(text: &str) -> String {
    text.chars()
        .map(|ch| if FOLDER_RESERVED.contains(&ch) { '_' } else { ch })
        .collect::<String>()
        .trim()
        .to_string()
}

/// File stem for a normalized title, at most 200 chars.
pub fn sanitize_file_name(text: &str) -> String {
    let replaced: String = strip_symbols(text)
        .chars()
        .map(|ch| if FILE_RESERVED.contains(&ch) { '_' } else { ch })
        .collect();
    let trimmed = trim_file_name(&replaced);
    // Re-trim after truncation so a cut landing on a dot or space stays stable.
    match trimmed.char_indices().nth(MAX_FILE_NAME_CHARS) {
        Some((cut, _)) => trim_file_name(&trimmed[..cut]).to_string(),
        None => trimmed.to_string(),
    }
}

fn trim_file_name(text: &str) -> &str {
    text.trim()
        .trim_end_matches(|ch: char| ch == '.' || ch.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_symbols_removes_emoji_and_keeps_text() {
        assert_eq!(strip_symbols("Fire 🔥 Song ✨"), "Fire  Song ");
        assert_eq!(strip_symbols("👍🏽ok"), "ok");
        assert_eq!(strip_symbols("❤️ love"), " love");
        assert_eq!(strip_symbols("Café (Remix) - Ñ"), "Café (Remix) - Ñ");
    }

    #[test]
    fn strip_symbols_removes_unassigned_code_points() {
        assert_eq!(strip_symbols("a\u{0378}b"), "ab");
    }

    #[test]
    fn ascii_modifier_symbols_are_kept() {
        assert_eq!(strip_symbols("Ain`t"), "Ain`t");
        assert_eq!(strip_symbols("C^2"), "C^2");
        assert_eq!(strip_symbols("Song ^_^ `quoted`"), "Song ^_^ `quoted`");
        assert_eq!(strip_symbols("Ain`t 👍🏽"), "Ain`t ");
    }

    #[test]
    fn folder_name_replaces_reserved_characters() {
        assert_eq!(sanitize_folder_name("  Era: A/B?  "), "Era_ A_B_");
        assert_eq!(sanitize_folder_name("My \"Best\" <Era>|"), "My _Best_ _Era__");
    }

    #[test]
    fn file_name_strips_reserved_and_trailing_dots() {
        assert_eq!(sanitize_file_name(" Song: Part 1?.. "), "Song_ Part 1_");
        assert_eq!(sanitize_file_name("Track 🔥"), "Track");
        assert_eq!(sanitize_file_name("C^2 `x`"), "C^2 `x`");
        assert_eq!(sanitize_file_name("Ain`t"), "Ain`t");
    }

    #[test]
    fn file_name_is_truncated_to_200_chars_without_reserved_chars() {
        let input = format!("a/b\\c:d*e?{}", "x".repeat(250));
        let out = sanitize_file_name(&input);
        assert_eq!(out.chars().count(), 200);
        assert!(!out.contains(['<', '>', ':', '"', '/', '\\', '|', '?', '*']));
        assert!(out.starts_with("a_b_c_d_e_"));
    }

    #[test]
    fn file_name_truncation_keeps_multibyte_chars_whole() {
        let input = "é".repeat(250);
        let out = sanitize_file_name(&input);
        assert_eq!(out.chars().count(), 200);
        assert!(out.chars().all(|ch| ch == 'é'));
    }

    #[test]
    fn file_name_sanitizing_is_idempotent() {
        let inputs = [
            "Song: Part 1?..".to_string(),
            format!("{}. .x", "y".repeat(198)),
            "  🔥 Hot / Cold  ".to_string(),
        ];
        for input in inputs {
            let once = sanitize_file_name(&input);
            assert_eq!(sanitize_file_name(&once), once);
        }
    }
}

//! Title normalization for noisy manifest names.
//!
//! Turns names such as `Artist - Song (feat. X) (prod. Y) [Unreleased]` into a
//! clean display title plus artist/producer fields. The steps run in a fixed
//! order; producer extraction happens before the `" - "` split so a name inside
//! `(prod. ...)` never becomes the artist.

use batch_types::NormalizedMetadata;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::sanitize::strip_symbols;

const PLACEHOLDER_TITLE: &str = "???";
const ARTIST_SEPARATOR: &str = " - ";

static PROD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(prod\. ([^)]+)\)").expect("valid prod pattern"));
static FEAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\((feat\.[^)]+)\)").expect("valid feat pattern"));
static PAREN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("valid paren pattern"));
static BRACKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("valid bracket pattern"));
static FEAT_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)feat\.").expect("valid feat marker pattern"));

/// Normalize a raw manifest name.
///
/// Total: never fails, at worst the trimmed name comes back as the title.
pub fn normalize(
    raw_name: &str,
    availability: Option<&str>,
    quality: Option<&str>,
) -> NormalizedMetadata {
    let mut name = strip_symbols(raw_name);

    let mut secondary_contributor = None;
    if let Some(caps) = PROD_RE.captures(&name) {
        secondary_contributor = Some(caps[1].trim().to_string());
        let annotation = caps[0].to_string();
        name = name.replace(&annotation, "").trim().to_string();
    }

    let mut feat_suffix = String::new();
    if let Some(caps) = FEAT_RE.captures(&name) {
        feat_suffix = format!(" ({})", title_case(&caps[1]));
        name = FEAT_RE.replace_all(&name, "").trim().to_string();
    }

    let (primary_contributor, working) = match name.split_once(ARTIST_SEPARATOR) {
        Some((artist, title)) if name.matches(ARTIST_SEPARATOR).count() == 1 => {
            (Some(artist.trim().to_string()), title.trim().to_string())
        }
        _ => (None, name.clone()),
    };

    let mut title = resolve_placeholder(&name, working);
    title = BRACKET_RE.replace_all(&title, "").trim().to_string();
    title = strip_symbols(&title);

    title.push_str(&feat_suffix);
    if marker_equals(availability, "snippet") {
        title.push_str(" (Snippet)");
    }
    if marker_equals(quality, "low quality") {
        title.push_str(" (LQ)");
    }

    NormalizedMetadata {
        title: collapse_spaces(&title.replace(['\n', '\r'], " ")),
        primary_contributor: primary_contributor.filter(|artist| !artist.is_empty()),
        secondary_contributor: secondary_contributor.filter(|producer| !producer.is_empty()),
    }
}

/// Resolve `???` placeholders and `Main (Alt)` title pairs.
///
/// `full_name` is the text before the artist split, searched when the title
/// itself is only the placeholder.
fn resolve_placeholder(full_name: &str, title: String) -> String {
    if title.trim() == PLACEHOLDER_TITLE {
        return match PAREN_RE.captures(full_name) {
            Some(caps) => clean_alternate(&caps[1]),
            None => PLACEHOLDER_TITLE.to_string(),
        };
    }

    let Some(caps) = PAREN_RE.captures(&title) else {
        return title;
    };
    if FEAT_MARKER_RE.is_match(&caps[1]) {
        return title;
    }
    let main = title.replace(&caps[0], "").trim().to_string();
    let alt = clean_alternate(&caps[1]);

    if main == PLACEHOLDER_TITLE && alt != PLACEHOLDER_TITLE {
        alt
    } else if alt == PLACEHOLDER_TITLE && main != PLACEHOLDER_TITLE {
        main
    } else if !main.is_empty() && !alt.is_empty() {
        format!("{main} / {alt}")
    } else if main.is_empty() {
        alt
    } else {
        main
    }
}

fn clean_alternate(text: &str) -> String {
    text.replace(',', " / ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn marker_equals(marker: Option<&str>, expected: &str) -> bool {
    marker
        .map(|value| value.trim().eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = false;
    for ch in text.chars() {
        if ch == ' ' {
            if !last_space {
                out.push(ch);
            }
            last_space = true;
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out.trim().to_string()
}

/// Capitalize the first letter of every word, lower-casing the rest.
///
/// A "word" starts after any non-alphabetic char, so `feat. j. cole`
/// becomes `Feat. J. Cole`.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

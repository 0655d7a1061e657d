//! Script-aware token normalization
//!
//! All search comparisons go through the keys produced here: Albanian text is
//! folded to lowercase ASCII, Hebrew is reduced to its consonant skeleton,
//! Greek is stripped of diacritics. Every function is pure and deterministic.

use std::sync::OnceLock;

use regex_lite::Regex;
use unicode_normalization::UnicodeNormalization;

/// Single-letter Hebrew prefix consonants (vav, he, bet, kaf, lamed, mem)
/// that may be glued onto a word: conjunction, article, prepositions.
const HEBREW_PREFIXES: [char; 6] = ['\u{05D5}', '\u{05D4}', '\u{05D1}', '\u{05DB}', '\u{05DC}', '\u{05DE}'];

fn debug_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Leading debug markers that leaked into some verse rows: "aaa see" or
    // "aaa eee", occasionally followed by a stray "I".
    RE.get_or_init(|| Regex::new(r"(?i)^\s*aaa\s+(?:see|eee)\s*I?\s+").unwrap())
}

/// Comparison key for Albanian tokens: lowercase, with the two accented
/// letters of the corpus folded to their ASCII base.
pub fn latin_key(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| match c {
            'ë' => 'e',
            'ç' => 'c',
            _ => c,
        })
        .collect()
}

/// Consonantal key for Hebrew: drops niqqud and cantillation (U+0591..U+05C7,
/// which also covers maqaf and sof pasuq), geresh/gershayim, and bidi
/// controls, then collapses whitespace.
pub fn hebrew_key(s: &str) -> String {
    let stripped: String = s
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{0591}'..='\u{05C7}'
                    | '\u{05F3}'
                    | '\u{05F4}'
                    | '\u{200E}'
                    | '\u{200F}'
                    | '\u{202A}'..='\u{202E}'
            )
        })
        .collect();
    collapse_whitespace(&stripped)
}

/// Diacritic-free key for Greek: NFD-decomposes and drops the combining
/// marks, plus bidi controls. Final sigma is kept distinct from medial sigma,
/// and case is preserved.
pub fn greek_key(s: &str) -> String {
    let stripped: String = s
        .nfd()
        .filter(|c| {
            !matches!(
                c,
                '\u{0300}'..='\u{036F}' | '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}'
            )
        })
        .collect();
    collapse_whitespace(&stripped)
}

/// Expands a normalized Hebrew needle into the needle plus every suffix
/// reachable by stripping one leading prefix consonant at a time. Stops once
/// a single character remains or the leading character is not a prefix
/// consonant. Longest variant first; stripping only, never prefixing.
pub fn hebrew_prefix_variants(needle: &str) -> Vec<String> {
    let mut variants = vec![needle.to_string()];
    let mut rest = needle;
    while let Some(first) = rest.chars().next() {
        if rest.chars().nth(1).is_none() || !HEBREW_PREFIXES.contains(&first) {
            break;
        }
        rest = &rest[first.len_utf8()..];
        variants.push(rest.to_string());
    }
    variants
}

/// True if any character falls in the Hebrew Unicode block.
pub fn is_hebrew(s: &str) -> bool {
    s.chars().any(|c| matches!(c, '\u{0590}'..='\u{05FF}'))
}

/// True if any character falls in the Greek or polytonic Greek Extended
/// blocks.
pub fn is_greek(s: &str) -> bool {
    s.chars()
        .any(|c| matches!(c, '\u{0370}'..='\u{03FF}' | '\u{1F00}'..='\u{1FFF}'))
}

/// Removes the `/` morpheme separators embedded in Hebrew source words
/// ("בְּ/רֵאשִׁית") and some Greek lemmata.
pub fn strip_slashes(s: &str) -> String {
    s.chars().filter(|&c| c != '/').collect()
}

/// Display form of a Greek source token: the slash-stripped surface when it
/// is actually Greek script, otherwise the transliteration if present.
pub fn greek_display_word(surface: &str, translit: Option<&str>) -> String {
    if is_greek(surface) {
        return strip_slashes(surface);
    }
    match translit {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => strip_slashes(surface),
    }
}

/// Undoes escaped-quote artifacts (`\"`, `\'`) that leaked into the data.
pub fn clean_text(s: &str) -> String {
    s.replace("\\\"", "\"").replace("\\'", "'")
}

/// Verse-table sanitization: quote cleanup plus a single strip of the
/// leading debug marker.
pub fn sanitize_verse_text(s: &str) -> String {
    let cleaned = clean_text(s);
    debug_marker_re().replace(&cleaned, "").into_owned()
}

/// Translation-row sanitization for interlinear display: like
/// [`sanitize_verse_text`] but also collapses whitespace.
pub fn sanitize_translation(s: &str) -> String {
    collapse_whitespace(&sanitize_verse_text(s))
}

/// Whitespace-split word indices of `text` whose letter runs normalize to
/// `key`. Consumed by renderers for match highlighting, in the same shape the
/// search results carry.
pub fn latin_word_positions(text: &str, key: &str) -> Vec<u32> {
    text.split_whitespace()
        .enumerate()
        .filter(|(_, word)| {
            word.split(|c: char| !is_latin_letter(c))
                .filter(|run| !run.is_empty())
                .any(|run| latin_key(run) == key)
        })
        .map(|(i, _)| i as u32)
        .collect()
}

fn is_latin_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, 'ë' | 'Ë' | 'ç' | 'Ç')
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Verse reference parsing and resolution
//!
//! Turns strings like "Isaia 6:1" or "1 i Samuelit 3" into a verse id or a
//! chapter target. Book names are matched accent-insensitively, with an
//! extra alias that drops the single-letter connector words of Albanian
//! titles ("Zbulesa e Gjonit" is also reachable as "Zbulesa Gjonit").

use std::collections::HashMap;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use crate::error::EngineError;
use crate::normalize::latin_key;
use crate::verse_index::{VerseId, VerseIndex};

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(.+?)\s+([0-9]+)(?::([0-9]+))?\s*$").unwrap())
}

/// A parsed "Book Chapter[:Verse]" string, before the book name is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference {
    pub book: String,
    pub chapter: u32,
    pub verse: Option<u32>,
}

/// What a reference resolves to: a single verse, or a whole chapter when no
/// verse number was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum ReferenceTarget {
    Verse { verse_id: VerseId },
    Chapter { book_id: u16, chapter: u32 },
}

/// Splits the input into book name, chapter, and optional verse. The book
/// part is any text; the chapter number is required.
pub fn parse_reference(input: &str) -> Result<ParsedReference, EngineError> {
    let caps = reference_re().captures(input).ok_or_else(|| {
        EngineError::MalformedReference(
            "expected Book Chapter[:Verse], e.g. Isaia 6:1".to_string(),
        )
    })?;
    let book = caps
        .get(1)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let chapter = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| EngineError::MalformedReference("chapter number out of range".to_string()))?;
    let verse = match caps.get(3) {
        Some(m) => Some(m.as_str().parse().map_err(|_| {
            EngineError::MalformedReference("verse number out of range".to_string())
        })?),
        None => None,
    };
    Ok(ParsedReference { book, chapter, verse })
}

/// Lookup key for a book title: lowercase, accents folded and stripped,
/// anything non-alphanumeric collapsed to single spaces.
pub fn normalize_book_title(s: &str) -> String {
    let folded = latin_key(s);
    let stripped: String = folded
        .nfd()
        .filter(|c| !matches!(c, '\u{0300}'..='\u{036F}'))
        .collect();
    let spaced: String = stripped
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_connectors(key: &str) -> String {
    key.split_whitespace()
        .filter(|word| *word != "i" && *word != "e")
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized book-title lookup, built once from the loaded book list.
pub struct BookIndex {
    by_title: HashMap<String, u16>,
}

impl BookIndex {
    pub fn build(books: &[String]) -> Self {
        let mut by_title = HashMap::new();
        for (i, name) in books.iter().enumerate() {
            let book_id = (i + 1) as u16;
            let key = normalize_book_title(name);
            if key.is_empty() {
                continue;
            }
            let alias = strip_connectors(&key);
            if !alias.is_empty() && alias != key {
                by_title.entry(alias).or_insert(book_id);
            }
            by_title.entry(key).or_insert(book_id);
        }
        Self { by_title }
    }

    /// Resolves a user-typed book name; retries with connector words removed.
    pub fn lookup(&self, title: &str) -> Option<u16> {
        let key = normalize_book_title(title);
        if let Some(&book_id) = self.by_title.get(&key) {
            return Some(book_id);
        }
        self.by_title.get(&strip_connectors(&key)).copied()
    }
}

/// Resolves a parsed reference against the book list and verse index.
pub fn resolve_reference(
    parsed: &ParsedReference,
    book_index: &BookIndex,
    verse_index: &VerseIndex,
) -> Result<ReferenceTarget, EngineError> {
    let book_id = book_index
        .lookup(&parsed.book)
        .ok_or_else(|| EngineError::BookNotFound(parsed.book.trim().to_string()))?;
    match parsed.verse {
        None => Ok(ReferenceTarget::Chapter { book_id, chapter: parsed.chapter }),
        Some(verse) => {
            let verse_id = verse_index
                .resolve(book_id, parsed.chapter, verse)
                .ok_or_else(|| {
                    EngineError::VerseNotFound(format!(
                        "{} {}:{}",
                        parsed.book.trim(),
                        parsed.chapter,
                        verse
                    ))
                })?;
            Ok(ReferenceTarget::Verse { verse_id })
        }
    }
}

/// Parse-and-resolve in one step.
pub fn find_reference(
    input: &str,
    book_index: &BookIndex,
    verse_index: &VerseIndex,
) -> Result<ReferenceTarget, EngineError> {
    let parsed = parse_reference(input)?;
    resolve_reference(&parsed, book_index, verse_index)
}

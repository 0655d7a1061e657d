//! Source-to-translation alignment
//!
//! Turns a raw interlinear verse into a render-ready structure: per-token
//! display forms and annotations, the canonical plain source text used for
//! copy/export, and each token's aligned slice of the Albanian translation.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::normalize::{
    greek_display_word, greek_key, hebrew_key, sanitize_translation, strip_slashes,
};
use crate::tokens::{ChapterDocument, SourceLang, SourceToken, VerseEntry};

/// One source token prepared for interlinear display.
#[derive(Debug, Clone, Serialize)]
pub struct AlignedToken {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// Display form: slash-stripped surface for Hebrew, surface or
    /// transliteration for Greek.
    pub word: String,
    /// Dictionary code, present only when its prefix matches the verse's
    /// source language.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strongs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub morph: Option<String>,
    /// The translated words this token aligns to, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aligned: Option<String>,
}

/// A verse resolved for interlinear display.
#[derive(Debug, Clone, Serialize)]
pub struct VerseAlignment {
    pub verse: u32,
    pub lang: SourceLang,
    /// Sanitized translation line.
    pub translation: String,
    /// Canonical plain source text (consonantal Hebrew or diacritic-free
    /// Greek), independent of any rendering.
    pub source_text: String,
    pub tokens: Vec<AlignedToken>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterAlignment {
    pub book_sq: String,
    pub chapter: u32,
    pub lang: SourceLang,
    pub verses: Vec<VerseAlignment>,
}

/// Concatenated source surfaces in corpus order, passed through the
/// script's normalizer. This is the text behind the "copy source" action.
pub fn build_source_text(entry: &VerseEntry, lang: SourceLang) -> String {
    match lang {
        SourceLang::Hebrew => {
            let joined = entry
                .tokens
                .iter()
                .map(|tok| strip_slashes(&tok.surface))
                .collect::<Vec<_>>()
                .join(" ");
            hebrew_key(&joined)
        }
        SourceLang::Greek => {
            let joined = entry
                .tokens
                .iter()
                .map(|tok| greek_display_word(&tok.surface, tok.translit.as_deref()))
                .collect::<Vec<_>>()
                .join(" ");
            greek_key(&joined)
        }
    }
}

/// Resolves `align_tok` links into per-source-index translation snippets.
/// The translation is split on whitespace; `tgt` is an inclusive `[lo, hi]`
/// word range (or a single element), clamped to the verse. When several
/// links claim the same source index the last one wins.
fn aligned_snippets(entry: &VerseEntry) -> HashMap<u32, String> {
    let words: Vec<&str> = entry.translation.split_whitespace().collect();
    let mut snippets = HashMap::new();
    for link in &entry.token_alignment {
        let Some(&lo) = link.tgt.first() else { continue };
        let hi = link.tgt.get(1).copied().unwrap_or(lo);
        let lo = (lo as usize).min(words.len());
        let end = (hi as usize + 1).min(words.len());
        let snippet = if lo < end {
            words[lo..end].join(" ")
        } else {
            String::new()
        };
        snippets.insert(link.src, snippet);
    }
    snippets
}

fn display_word(token: &SourceToken, lang: SourceLang) -> String {
    match lang {
        SourceLang::Hebrew => strip_slashes(&token.surface),
        SourceLang::Greek => greek_display_word(&token.surface, token.translit.as_deref()),
    }
}

/// Prepares one verse for interlinear display.
///
/// Snippets are handed out to tokens in source order. A token claims as many
/// consecutive source slots as its lemma has slash-delimited parts (multi-part
/// Hebrew lemmata cover several alignment positions); a slot already claimed
/// by an earlier token is skipped. Overlapping translated-word ranges are
/// allowed and left as the data has them.
pub fn align_verse(entry: &VerseEntry, lang: SourceLang) -> VerseAlignment {
    let snippets = aligned_snippets(entry);
    let code_prefix = match lang {
        SourceLang::Hebrew => 'H',
        SourceLang::Greek => 'G',
    };

    let mut used: HashSet<u32> = HashSet::new();
    let mut tokens = Vec::with_capacity(entry.tokens.len());
    for token in &entry.tokens {
        let mut aligned = None;
        if let Some(i) = token.index {
            let parts = token
                .lemma
                .as_deref()
                .map(|lemma| lemma.split('/').count())
                .unwrap_or(0)
                .max(1) as u32;
            let mut pieces: Vec<&str> = Vec::new();
            for k in 0..parts {
                let idx = i + k;
                if used.contains(&idx) {
                    continue;
                }
                if let Some(snippet) = snippets.get(&idx) {
                    used.insert(idx);
                    if !snippet.is_empty() {
                        pieces.push(snippet);
                    }
                }
            }
            if !pieces.is_empty() {
                aligned = Some(pieces.join(" "));
            }
        }

        tokens.push(AlignedToken {
            index: token.index,
            word: display_word(token, lang),
            strongs: token
                .strongs
                .clone()
                .filter(|code| code.starts_with(code_prefix)),
            translit: token.translit.clone(),
            lemma: token.lemma.clone(),
            morph: token.morph.clone(),
            aligned,
        });
    }

    VerseAlignment {
        verse: entry.verse,
        lang,
        translation: sanitize_translation(&entry.translation),
        source_text: build_source_text(entry, lang),
        tokens,
    }
}

/// Prepares a whole chapter for interlinear display.
pub fn align_chapter(doc: &ChapterDocument) -> ChapterAlignment {
    let lang = doc.source_lang();
    ChapterAlignment {
        book_sq: doc.reference.book_sq.clone(),
        chapter: doc.reference.chapter,
        lang,
        verses: doc.verses.iter().map(|entry| align_verse(entry, lang)).collect(),
    }
}

/// Prepares a single verse of a chapter, if present.
pub fn align_verse_in(doc: &ChapterDocument, verse: u32) -> Option<VerseAlignment> {
    doc.verse(verse).map(|entry| align_verse(entry, doc.source_lang()))
}

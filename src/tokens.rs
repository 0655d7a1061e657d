//! Interlinear chapter documents and token matching
//!
//! Wire types for the per-chapter interlinear JSON (`data/<slug>/<n>.json`)
//! and the predicate the scanner evaluates against source tokens.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::normalize::{greek_key, hebrew_key, strip_slashes};

// ============================================================================
// Source language
// ============================================================================

/// Original language of a chapter's source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceLang {
    Hebrew,
    #[default]
    Greek,
}

impl SourceLang {
    /// Language tag as written in chapter `_meta` blocks.
    pub fn tag(&self) -> &'static str {
        match self {
            SourceLang::Hebrew => "heb",
            SourceLang::Greek => "grc",
        }
    }
}

impl From<&str> for SourceLang {
    fn from(tag: &str) -> Self {
        // Anything that does not announce Hebrew is treated as Greek,
        // matching how the chapter renderer branches.
        if tag.to_ascii_lowercase().starts_with("heb") {
            SourceLang::Hebrew
        } else {
            SourceLang::Greek
        }
    }
}

impl fmt::Display for SourceLang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Serialize for SourceLang {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for SourceLang {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(SourceLang::from(tag.as_str()))
    }
}

// ============================================================================
// Chapter document
// ============================================================================

/// One word of the Hebrew or Greek source column. Surfaces may carry `/`
/// morpheme separators; `strongs` is the zero-padded code ("H7225", "G3056").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceToken {
    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(rename = "w", default)]
    pub surface: String,
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub translit: Option<String>,
    #[serde(rename = "l", default, skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
    #[serde(rename = "m", default, skip_serializing_if = "Option::is_none")]
    pub morph: Option<String>,
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub strongs: Option<String>,
}

/// Token-level alignment link: source token index to an inclusive range of
/// translation word positions. `tgt` is `[lo, hi]`, or a single element when
/// the span is one word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignTok {
    pub src: u32,
    #[serde(default)]
    pub tgt: Vec<u32>,
}

/// One verse of an interlinear chapter document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerseEntry {
    #[serde(rename = "v")]
    pub verse: u32,
    #[serde(rename = "sq", default)]
    pub translation: String,
    #[serde(rename = "src", default)]
    pub tokens: Vec<SourceToken>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub gloss: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "align_tok", default)]
    pub token_alignment: Vec<AlignTok>,
    #[serde(rename = "align_phrase", default, skip_serializing_if = "Vec::is_empty")]
    pub phrase_alignment: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChapterRef {
    #[serde(default)]
    pub book_sq: String,
    #[serde(default)]
    pub chapter: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChapterMeta {
    #[serde(default)]
    pub lang_src: SourceLang,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang_tgt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A full interlinear chapter as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChapterDocument {
    #[serde(rename = "ref", default)]
    pub reference: ChapterRef,
    #[serde(default)]
    pub verses: Vec<VerseEntry>,
    #[serde(rename = "_meta", default)]
    pub meta: ChapterMeta,
}

impl ChapterDocument {
    pub fn source_lang(&self) -> SourceLang {
        self.meta.lang_src
    }

    pub fn verse(&self, verse: u32) -> Option<&VerseEntry> {
        self.verses.iter().find(|entry| entry.verse == verse)
    }
}

// ============================================================================
// Token predicate
// ============================================================================

/// Comparison key of a source surface in its own script, slash separators
/// removed first.
pub fn source_key(lang: SourceLang, surface: &str) -> String {
    let stripped = strip_slashes(surface);
    match lang {
        SourceLang::Hebrew => hebrew_key(&stripped),
        SourceLang::Greek => greek_key(&stripped),
    }
}

/// What the chapter scanner looks for in a source token. Built once per
/// search, evaluated against every token of every scanned verse.
#[derive(Debug, Clone)]
pub enum TokenPredicate {
    /// Exact match of the normalized surface against any of the given keys
    /// (a needle plus its prefix-stripped variants for Hebrew, a single key
    /// for Greek).
    Surface { lang: SourceLang, keys: Vec<String> },
    /// Exact match on the token's Strong's code.
    Strongs { code: String },
    /// Substring match on the normalized surface; the relaxed second pass.
    Contains { lang: SourceLang, needle: String },
}

impl TokenPredicate {
    pub fn matches(&self, token: &SourceToken) -> bool {
        match self {
            TokenPredicate::Surface { lang, keys } => {
                let key = source_key(*lang, &token.surface);
                !key.is_empty() && keys.iter().any(|k| *k == key)
            }
            TokenPredicate::Strongs { code } => token.strongs.as_deref() == Some(code.as_str()),
            TokenPredicate::Contains { lang, needle } => {
                !needle.is_empty() && source_key(*lang, &token.surface).contains(needle.as_str())
            }
        }
    }
}

//! Search orchestration
//!
//! Three pipelines, one per script mode:
//!
//! - Latin: pure lookup in the per-letter inverted-index shard, no scanning.
//! - Hebrew: Strong's-code fast path, otherwise an exact surface scan over
//!   the Old Testament with prefix-stripped variants, then one relaxed
//!   substring pass if nothing matched.
//! - Greek: Strong's-code fast path, otherwise a single exact surface scan
//!   over the New Testament.
//!
//! Every pipeline returns verse ids in first-discovered order, deduplicated.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::books::{new_testament_books, old_testament_books};
use crate::error::EngineError;
use crate::normalize::{
    greek_key, hebrew_key, hebrew_prefix_variants, is_hebrew, latin_key, latin_word_positions,
};
use crate::scanner::{scan_chapters, ScanProgress, SCAN_RESULT_LIMIT};
use crate::state::AppState;
use crate::tokens::{SourceLang, TokenPredicate};
use crate::verse_index::{verse_view, VerseId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Latin,
    Hebrew,
    Greek,
}

/// One matching verse, resolved for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub verse_id: VerseId,
    pub book_id: u16,
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    /// Word positions in `text` that match a Latin query; empty in the
    /// source-language modes, where the match lives in the source column.
    pub matched_word_indices: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub mode: SearchMode,
    pub total_hits: usize,
    pub verse_ids: Vec<VerseId>,
    pub results: Vec<SearchHit>,
    pub elapsed_ms: u64,
}

/// Recognizes dictionary-code queries: an optional language prefix letter
/// followed by up to four digits, zero-padded to the canonical form
/// ("h430" becomes "H0430"). A mismatched prefix letter is not a code.
fn strongs_code(query: &str, prefix: char) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^([A-Za-z])?([0-9]{1,4})$").unwrap());
    let caps = re.captures(query)?;
    if let Some(letter) = caps.get(1) {
        let letter = letter.as_str().chars().next()?;
        if !letter.eq_ignore_ascii_case(&prefix) {
            return None;
        }
    }
    let number: u32 = caps.get(2)?.as_str().parse().ok()?;
    Some(format!("{prefix}{number:04}"))
}

/// Runs a query in the given mode and resolves the hits for display.
///
/// `progress` receives per-chapter scan events in the modes that scan;
/// Latin-mode and fast-path searches emit none.
pub async fn run_search(
    state: &AppState,
    query: &str,
    mode: SearchMode,
    progress: Option<mpsc::UnboundedSender<ScanProgress>>,
) -> Result<SearchResults, EngineError> {
    let start = Instant::now();
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidQuery("empty query".to_string()));
    }

    let generation = state.begin_search();
    let verse_ids = match mode {
        SearchMode::Latin => latin_search(state, trimmed).await?,
        SearchMode::Hebrew => hebrew_search(state, trimmed, progress).await?,
        SearchMode::Greek => greek_search(state, trimmed, progress).await?,
    };
    if !state.store_search(generation, trimmed, mode, &verse_ids) {
        debug!(query = trimmed, "result set superseded by a newer search");
    }

    let (books, rows) = tokio::try_join!(state.corpus().books(), state.corpus().verses())?;

    let latin = (mode == SearchMode::Latin).then(|| latin_key(trimmed));
    let results: Vec<SearchHit> = verse_ids
        .iter()
        .filter_map(|&vid| {
            let view = verse_view(&books, &rows, vid)?;
            let matched_word_indices = latin
                .as_deref()
                .map(|key| latin_word_positions(&view.text, key))
                .unwrap_or_default();
            Some(SearchHit {
                verse_id: view.verse_id,
                book_id: view.book_id,
                book: view.book,
                chapter: view.chapter,
                verse: view.verse,
                text: view.text,
                matched_word_indices,
            })
        })
        .collect();

    let elapsed_ms = start.elapsed().as_millis() as u64;
    info!(query = trimmed, mode = ?mode, hits = verse_ids.len(), elapsed_ms, "search complete");
    Ok(SearchResults {
        query: trimmed.to_string(),
        mode,
        total_hits: verse_ids.len(),
        verse_ids,
        results,
        elapsed_ms,
    })
}

/// Latin mode is a pure index lookup: shard by first normalized character,
/// then the key's entry or nothing. An absent shard means no matches.
async fn latin_search(state: &AppState, query: &str) -> Result<Vec<VerseId>, EngineError> {
    let key = latin_key(query);
    let Some(letter) = key.chars().next() else {
        return Ok(Vec::new());
    };
    let Some(shard) = state.corpus().index_shard(letter).await? else {
        return Ok(Vec::new());
    };
    Ok(shard.get(&key).cloned().unwrap_or_default())
}

async fn hebrew_search(
    state: &AppState,
    query: &str,
    progress: Option<mpsc::UnboundedSender<ScanProgress>>,
) -> Result<Vec<VerseId>, EngineError> {
    if let Some(code) = strongs_code(query, 'H') {
        return strongs_search(state, SourceLang::Hebrew, &code, progress).await;
    }

    let needle = hebrew_key(query);
    if needle.is_empty() {
        return Ok(Vec::new());
    }
    let hebrew = is_hebrew(&needle);
    let keys = if hebrew {
        hebrew_prefix_variants(&needle)
    } else {
        vec![needle.clone()]
    };

    let corpus = Arc::clone(state.corpus());
    let verse_index = state.verse_index().await?;
    let chapters = Arc::new(verse_index.chapters_for_books(old_testament_books()));

    let exact = Arc::new(TokenPredicate::Surface { lang: SourceLang::Hebrew, keys });
    let found = scan_chapters(
        Arc::clone(&corpus),
        Arc::clone(&verse_index),
        Arc::clone(&chapters),
        exact,
        SCAN_RESULT_LIMIT,
        progress.clone(),
    )
    .await;
    if !found.is_empty() || !hebrew || needle.chars().count() < 2 {
        return Ok(found);
    }

    // Nothing matched exactly; relax to substring containment once.
    debug!(%needle, "exact pass empty, running containment pass");
    let contains = Arc::new(TokenPredicate::Contains { lang: SourceLang::Hebrew, needle });
    Ok(scan_chapters(corpus, verse_index, chapters, contains, SCAN_RESULT_LIMIT, progress).await)
}

async fn greek_search(
    state: &AppState,
    query: &str,
    progress: Option<mpsc::UnboundedSender<ScanProgress>>,
) -> Result<Vec<VerseId>, EngineError> {
    if let Some(code) = strongs_code(query, 'G') {
        return strongs_search(state, SourceLang::Greek, &code, progress).await;
    }

    let needle = greek_key(query);
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let corpus = Arc::clone(state.corpus());
    let verse_index = state.verse_index().await?;
    let chapters = Arc::new(verse_index.chapters_for_books(new_testament_books()));
    let exact = Arc::new(TokenPredicate::Surface {
        lang: SourceLang::Greek,
        keys: vec![needle],
    });
    Ok(scan_chapters(corpus, verse_index, chapters, exact, SCAN_RESULT_LIMIT, progress).await)
}

/// Dictionary-code lookup. When the Strong's index document exists the
/// answer comes straight from it, even for codes with no entry; only a
/// missing index document falls back to scanning token codes.
async fn strongs_search(
    state: &AppState,
    lang: SourceLang,
    code: &str,
    progress: Option<mpsc::UnboundedSender<ScanProgress>>,
) -> Result<Vec<VerseId>, EngineError> {
    let prefix = match lang {
        SourceLang::Hebrew => 'H',
        SourceLang::Greek => 'G',
    };
    if let Some(index) = state.corpus().strongs_index(prefix).await? {
        return Ok(index.get(code).cloned().unwrap_or_default());
    }

    debug!(code, "Strong's index absent, scanning token codes");
    let corpus = Arc::clone(state.corpus());
    let verse_index = state.verse_index().await?;
    let chapters = match lang {
        SourceLang::Hebrew => verse_index.chapters_for_books(old_testament_books()),
        SourceLang::Greek => verse_index.chapters_for_books(new_testament_books()),
    };
    let predicate = Arc::new(TokenPredicate::Strongs { code: code.to_string() });
    Ok(scan_chapters(
        corpus,
        verse_index,
        Arc::new(chapters),
        predicate,
        SCAN_RESULT_LIMIT,
        progress,
    )
    .await)
}

//! Application state management
//!
//! One [`AppState`] is constructed per process and shared behind an `Arc`.
//! It owns the corpus handle and the derived tables (verse identity index,
//! book-name index), plus the last completed search so a display toggle can
//! re-render without querying again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::corpus::Corpus;
use crate::reference::BookIndex;
use crate::search::SearchMode;
use crate::verse_index::{VerseId, VerseIndex};

/// The results of the most recent search to finish without being superseded.
#[derive(Debug, Clone, Serialize)]
pub struct LastSearch {
    #[serde(skip)]
    pub generation: u64,
    pub query: String,
    pub mode: SearchMode,
    pub verse_ids: Vec<VerseId>,
    pub completed_at: DateTime<Utc>,
}

/// Process-wide session state. Derived tables are built lazily, once.
pub struct AppState {
    corpus: Arc<Corpus>,
    verse_index: OnceCell<Arc<VerseIndex>>,
    book_index: OnceCell<Arc<BookIndex>>,
    search_generation: AtomicU64,
    last_search: Mutex<Option<LastSearch>>,
}

impl AppState {
    pub fn new(corpus: Corpus) -> Self {
        Self {
            corpus: Arc::new(corpus),
            verse_index: OnceCell::new(),
            book_index: OnceCell::new(),
            search_generation: AtomicU64::new(0),
            last_search: Mutex::new(None),
        }
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    /// The (book, chapter, verse) → verse id index, built from the verse
    /// table on first use.
    pub async fn verse_index(&self) -> Result<Arc<VerseIndex>> {
        self.verse_index
            .get_or_try_init(|| async {
                let rows = self.corpus.verses().await?;
                Ok(Arc::new(VerseIndex::build(&rows)))
            })
            .await
            .map(Arc::clone)
    }

    /// The normalized book-title index, built from the book list on first
    /// use.
    pub async fn book_index(&self) -> Result<Arc<BookIndex>> {
        self.book_index
            .get_or_try_init(|| async {
                let books = self.corpus.books().await?;
                Ok(Arc::new(BookIndex::build(&books)))
            })
            .await
            .map(Arc::clone)
    }

    /// Claims a generation number for a search about to run; higher numbers
    /// are newer queries.
    pub fn begin_search(&self) -> u64 {
        self.search_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Records a completed search. Returns false, storing nothing, when a
    /// newer search already finished: a slow query that completes late must
    /// not overwrite fresher results.
    pub fn store_search(
        &self,
        generation: u64,
        query: &str,
        mode: SearchMode,
        verse_ids: &[VerseId],
    ) -> bool {
        let mut last = self.last_search.lock().unwrap();
        if let Some(existing) = last.as_ref() {
            if existing.generation > generation {
                return false;
            }
        }
        *last = Some(LastSearch {
            generation,
            query: query.to_string(),
            mode,
            verse_ids: verse_ids.to_vec(),
            completed_at: Utc::now(),
        });
        true
    }

    pub fn last_search(&self) -> Option<LastSearch> {
        self.last_search.lock().unwrap().clone()
    }
}

//! Corpus data access
//!
//! Lazy, memoized loaders over the static corpus layout:
//!
//! - `data/books.json` — book display names, index 0 = book id 1
//! - `data/verses.json` — flat verse table, row index + 1 = verse id
//! - `data/index/index_<letter>.json` — per-letter inverted-index shards
//! - `data/strongs/strongs_<H|G>.json` — Strong's code indices
//! - `data/<slug>/<chapter>.json` — interlinear chapter documents
//!
//! The corpus is read-only for the lifetime of the process, so every cache
//! here is populate-once. A double fetch racing on first access is tolerated:
//! both sides load identical data and the last writer wins.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use futures_util::future::BoxFuture;
use lru::LruCache;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::books::book_slug;
use crate::normalize::sanitize_verse_text;
use crate::tokens::ChapterDocument;

/// Chapter documents kept in memory. The corpus has 1,189 chapters, so a
/// long-lived process ends up holding all of them.
const CHAPTER_CACHE_CAPACITY: usize = 1280;

// ============================================================================
// Fetch abstraction
// ============================================================================

/// Raw access to corpus documents by relative path. `Ok(None)` means the
/// document does not exist, which is an expected outcome for index shards,
/// Strong's indices, and chapters the scanner probes.
pub trait FetchJson: Send + Sync {
    fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>>;
}

/// Reads corpus documents from a directory on disk.
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FetchJson for FsFetcher {
    fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async move {
            let full = self.root.join(path);
            match tokio::fs::read(&full).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(err) => {
                    Err(err).with_context(|| format!("Failed to read {}", full.display()))
                }
            }
        })
    }
}

/// Reads corpus documents from a static-site base URL.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

impl FetchJson for HttpFetcher {
    fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async move {
            let url = format!("{}/{}", self.base_url, path);
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .with_context(|| format!("Request failed: {url}"))?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let response = response
                .error_for_status()
                .with_context(|| format!("Request failed: {url}"))?;
            let bytes = response
                .bytes()
                .await
                .with_context(|| format!("Failed to read body of {url}"))?;
            Ok(Some(bytes.to_vec()))
        })
    }
}

// ============================================================================
// Wire formats
// ============================================================================

/// One row of `verses.json`: `[book_id, chapter, verse, text]`. The table may
/// contain null rows as padding; those stay `None` after load.
#[derive(Debug, Clone, Deserialize)]
pub struct VerseRow(pub u16, pub u32, pub u32, pub String);

impl VerseRow {
    pub fn book_id(&self) -> u16 {
        self.0
    }

    pub fn chapter(&self) -> u32 {
        self.1
    }

    pub fn verse(&self) -> u32 {
        self.2
    }

    pub fn text(&self) -> &str {
        &self.3
    }
}

#[derive(Debug, Default, Deserialize)]
struct IndexShardDoc {
    #[serde(default)]
    tokens: HashMap<String, Vec<u32>>,
}

#[derive(Debug, Default, Deserialize)]
struct StrongsIndexDoc {
    #[serde(default)]
    index: HashMap<String, Vec<u32>>,
}

/// Cache key for interlinear chapter documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChapterKey {
    pub book_id: u16,
    pub chapter: u32,
}

// ============================================================================
// Corpus
// ============================================================================

type SharedIndex = Option<Arc<HashMap<String, Vec<u32>>>>;

/// Owner of every loaded corpus structure. Constructed once per process;
/// all other components borrow it and receive read-only `Arc` views.
pub struct Corpus {
    fetcher: Box<dyn FetchJson>,
    books: OnceCell<Arc<Vec<String>>>,
    verses: OnceCell<Arc<Vec<Option<VerseRow>>>>,
    shards: Mutex<HashMap<char, SharedIndex>>,
    strongs: Mutex<HashMap<char, SharedIndex>>,
    chapters: Mutex<LruCache<ChapterKey, Arc<ChapterDocument>>>,
}

impl Corpus {
    pub fn new(fetcher: Box<dyn FetchJson>) -> Self {
        let capacity = NonZeroUsize::new(CHAPTER_CACHE_CAPACITY)
            .unwrap_or_else(|| NonZeroUsize::new(1).unwrap());
        Self {
            fetcher,
            books: OnceCell::new(),
            verses: OnceCell::new(),
            shards: Mutex::new(HashMap::new()),
            strongs: Mutex::new(HashMap::new()),
            chapters: Mutex::new(LruCache::new(capacity)),
        }
    }

    async fn fetch_json<T>(&self, path: &str) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let Some(bytes) = self.fetcher.fetch(path).await? else {
            return Ok(None);
        };
        let value =
            serde_json::from_slice(&bytes).with_context(|| format!("Malformed JSON in {path}"))?;
        Ok(Some(value))
    }

    /// Book display names, loaded once. Index `book_id - 1`.
    pub async fn books(&self) -> Result<Arc<Vec<String>>> {
        self.books
            .get_or_try_init(|| async {
                let names: Vec<String> = self
                    .fetch_json("data/books.json")
                    .await?
                    .context("Missing data/books.json")?;
                debug!(books = names.len(), "loaded book table");
                Ok(Arc::new(names))
            })
            .await
            .map(Arc::clone)
    }

    /// The flat verse table, loaded once. Row index + 1 = verse id. Text is
    /// sanitized here so every downstream consumer sees clean verses.
    pub async fn verses(&self) -> Result<Arc<Vec<Option<VerseRow>>>> {
        self.verses
            .get_or_try_init(|| async {
                let rows: Vec<Option<VerseRow>> = self
                    .fetch_json("data/verses.json")
                    .await?
                    .context("Missing data/verses.json")?;
                let rows: Vec<Option<VerseRow>> = rows
                    .into_iter()
                    .map(|row| {
                        row.map(|VerseRow(book_id, chapter, verse, text)| {
                            VerseRow(book_id, chapter, verse, sanitize_verse_text(&text))
                        })
                    })
                    .collect();
                debug!(rows = rows.len(), "loaded verse table");
                Ok(Arc::new(rows))
            })
            .await
            .map(Arc::clone)
    }

    /// Inverted-index shard for a first letter, or `None` when the shard file
    /// does not exist. Absence means "no matches" and is memoized like a hit.
    pub async fn index_shard(&self, letter: char) -> Result<SharedIndex> {
        {
            let shards = self.shards.lock().unwrap();
            if let Some(cached) = shards.get(&letter) {
                return Ok(cached.clone());
            }
        }

        let path = format!("data/index/index_{letter}.json");
        let doc: Option<IndexShardDoc> = self.fetch_json(&path).await?;
        let entry = doc.map(|d| Arc::new(d.tokens));
        if entry.is_none() {
            debug!(%letter, "index shard absent");
        }

        let mut shards = self.shards.lock().unwrap();
        shards.insert(letter, entry.clone());
        Ok(entry)
    }

    /// Strong's code index for prefix `'H'` or `'G'`, or `None` when the
    /// index document does not exist. Like shards, absence is memoized.
    pub async fn strongs_index(&self, prefix: char) -> Result<SharedIndex> {
        {
            let strongs = self.strongs.lock().unwrap();
            if let Some(cached) = strongs.get(&prefix) {
                return Ok(cached.clone());
            }
        }

        let path = format!("data/strongs/strongs_{prefix}.json");
        let doc: Option<StrongsIndexDoc> = self.fetch_json(&path).await?;
        let entry = doc.map(|d| Arc::new(d.index));

        let mut strongs = self.strongs.lock().unwrap();
        strongs.insert(prefix, entry.clone());
        Ok(entry)
    }

    /// Interlinear chapter document, LRU-cached. `Ok(None)` when the book id
    /// is out of range or the chapter file is absent; misses are not cached
    /// because the scanner probes chapter numbers past the end of each book.
    pub async fn chapter(&self, book_id: u16, chapter: u32) -> Result<Option<Arc<ChapterDocument>>> {
        let Some(slug) = book_slug(book_id) else {
            return Ok(None);
        };
        let key = ChapterKey { book_id, chapter };
        {
            let mut chapters = self.chapters.lock().unwrap();
            if let Some(doc) = chapters.get(&key) {
                return Ok(Some(Arc::clone(doc)));
            }
        }

        let path = format!("data/{slug}/{chapter}.json");
        let Some(doc) = self.fetch_json::<ChapterDocument>(&path).await? else {
            return Ok(None);
        };
        let doc = Arc::new(doc);

        let mut chapters = self.chapters.lock().unwrap();
        chapters.put(key, Arc::clone(&doc));
        Ok(Some(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryFetcher;

    #[tokio::test]
    async fn books_and_verses_load_once() {
        let fetcher = MemoryFetcher::with_mini_corpus();
        let counts = fetcher.counts();
        let corpus = Corpus::new(Box::new(fetcher));

        let books = corpus.books().await.unwrap();
        assert_eq!(books[0], "Zanafilla");
        let verses = corpus.verses().await.unwrap();
        assert!(verses.len() >= 2);

        corpus.books().await.unwrap();
        corpus.verses().await.unwrap();
        assert_eq!(counts.fetches("data/books.json"), 1);
        assert_eq!(counts.fetches("data/verses.json"), 1);
    }

    #[tokio::test]
    async fn verse_text_is_sanitized_on_load() {
        let corpus = Corpus::new(Box::new(MemoryFetcher::with_mini_corpus()));
        let verses = corpus.verses().await.unwrap();
        let first = verses[0].as_ref().unwrap();
        assert!(first.text().starts_with("Në fillim"));
        assert!(!first.text().contains("aaa"));
    }

    #[tokio::test]
    async fn verse_table_tolerates_null_rows() {
        let corpus = Corpus::new(Box::new(MemoryFetcher::with_mini_corpus()));
        let verses = corpus.verses().await.unwrap();
        assert!(verses.iter().any(|row| row.is_none()));
    }

    #[tokio::test]
    async fn absent_shard_is_memoized_as_no_matches() {
        let fetcher = MemoryFetcher::with_mini_corpus();
        let counts = fetcher.counts();
        let corpus = Corpus::new(Box::new(fetcher));

        assert!(corpus.index_shard('q').await.unwrap().is_none());
        assert!(corpus.index_shard('q').await.unwrap().is_none());
        assert_eq!(counts.fetches("data/index/index_q.json"), 1);

        let shard = corpus.index_shard('f').await.unwrap().unwrap();
        assert_eq!(shard.get("fillim"), Some(&vec![1, 8, 9]));
    }

    #[tokio::test]
    async fn chapters_are_cached_after_first_fetch() {
        let fetcher = MemoryFetcher::with_mini_corpus();
        let counts = fetcher.counts();
        let corpus = Corpus::new(Box::new(fetcher));

        let doc = corpus.chapter(1, 1).await.unwrap().unwrap();
        assert_eq!(doc.reference.chapter, 1);
        corpus.chapter(1, 1).await.unwrap().unwrap();
        assert_eq!(counts.fetches("data/genesis/1.json"), 1);

        // Past the end of the book: absent, and safe to probe repeatedly.
        assert!(corpus.chapter(1, 999).await.unwrap().is_none());
        assert!(corpus.chapter(0, 1).await.unwrap().is_none());
    }
}

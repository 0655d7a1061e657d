//! Bounded-concurrency chapter scanner
//!
//! The fallback search path for Hebrew and Greek queries: stream every
//! chapter of a testament through a token predicate and collect matching
//! verse ids. A fixed pool of workers pulls chapter coordinates from a
//! shared cursor, so at most [`MAX_SCAN_WORKERS`] fetches are in flight.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::corpus::Corpus;
use crate::tokens::TokenPredicate;
use crate::verse_index::{VerseId, VerseIndex};

/// Hard cap on verses collected by a single scan pass.
pub const SCAN_RESULT_LIMIT: usize = 300;

/// Upper bound on concurrent chapter fetches; fewer when fewer chapters
/// remain.
pub const MAX_SCAN_WORKERS: usize = 8;

/// Progress event emitted after every processed chapter, match or not.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScanProgress {
    /// Chapters processed so far. Monotonically increasing across the scan.
    pub scanned: usize,
    /// Total chapters in this scan.
    pub total: usize,
    /// Matching verses collected so far.
    pub found: usize,
}

struct ScanState {
    found: Vec<VerseId>,
    seen: HashSet<VerseId>,
    scanned: usize,
}

/// Applies `predicate` to every source token of every chapter in `chapters`
/// and returns matching verse ids in first-discovered order, deduplicated,
/// capped at `limit`.
///
/// Workers stop claiming chapters once the cap is reached but finish the
/// chapter in hand. A chapter that fails to fetch or does not exist counts
/// as scanned with zero matches; the scan always runs to completion.
pub async fn scan_chapters(
    corpus: Arc<Corpus>,
    verse_index: Arc<VerseIndex>,
    chapters: Arc<Vec<(u16, u32)>>,
    predicate: Arc<TokenPredicate>,
    limit: usize,
    progress: Option<mpsc::UnboundedSender<ScanProgress>>,
) -> Vec<VerseId> {
    let total = chapters.len();
    if total == 0 || limit == 0 {
        return Vec::new();
    }

    let cursor = Arc::new(AtomicUsize::new(0));
    let state = Arc::new(Mutex::new(ScanState {
        found: Vec::new(),
        seen: HashSet::new(),
        scanned: 0,
    }));

    let workers = MAX_SCAN_WORKERS.min(total);
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let corpus = Arc::clone(&corpus);
        let verse_index = Arc::clone(&verse_index);
        let chapters = Arc::clone(&chapters);
        let predicate = Arc::clone(&predicate);
        let cursor = Arc::clone(&cursor);
        let state = Arc::clone(&state);
        let progress = progress.clone();

        handles.push(tokio::spawn(async move {
            loop {
                if state.lock().unwrap().found.len() >= limit {
                    break;
                }
                let next = cursor.fetch_add(1, Ordering::SeqCst);
                if next >= total {
                    break;
                }
                let (book_id, chapter) = chapters[next];

                let doc = match corpus.chapter(book_id, chapter).await {
                    Ok(doc) => doc,
                    Err(err) => {
                        warn!(book_id, chapter, error = %err, "chapter fetch failed, skipping");
                        None
                    }
                };

                let mut matched: Vec<VerseId> = Vec::new();
                if let Some(doc) = doc.as_deref() {
                    for entry in &doc.verses {
                        if entry.tokens.iter().any(|token| predicate.matches(token)) {
                            if let Some(vid) = verse_index.resolve(book_id, chapter, entry.verse) {
                                matched.push(vid);
                            }
                        }
                    }
                }

                let mut state = state.lock().unwrap();
                for vid in matched {
                    if state.found.len() >= limit {
                        break;
                    }
                    if state.seen.insert(vid) {
                        state.found.push(vid);
                    }
                }
                state.scanned += 1;
                if let Some(tx) = &progress {
                    // Sent while the lock is held so scanned counts arrive in
                    // increasing order even when workers race.
                    let _ = tx.send(ScanProgress {
                        scanned: state.scanned,
                        total,
                        found: state.found.len(),
                    });
                }
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    let state = state.lock().unwrap();
    state.found.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryFetcher;
    use crate::tokens::SourceLang;

    async fn setup() -> (Arc<Corpus>, Arc<VerseIndex>) {
        let corpus = Arc::new(Corpus::new(Box::new(MemoryFetcher::with_mini_corpus())));
        let rows = corpus.verses().await.unwrap();
        let index = Arc::new(VerseIndex::build(&rows));
        (corpus, index)
    }

    fn elohim() -> Arc<TokenPredicate> {
        Arc::new(TokenPredicate::Surface {
            lang: SourceLang::Hebrew,
            keys: vec!["אלהים".to_string()],
        })
    }

    #[tokio::test]
    async fn single_chapter_matches_in_verse_order() {
        let (corpus, index) = setup().await;
        let chapters = Arc::new(vec![(1u16, 1u32)]);
        let found = scan_chapters(corpus, index, chapters, elohim(), SCAN_RESULT_LIMIT, None).await;
        assert_eq!(found, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn cap_is_exact_and_results_unique() {
        let (corpus, index) = setup().await;
        let chapters = Arc::new(vec![(1u16, 1u32), (1, 2)]);
        let found = scan_chapters(corpus, index, chapters, elohim(), 2, None).await;
        assert_eq!(found.len(), 2);
        let unique: HashSet<_> = found.iter().collect();
        assert_eq!(unique.len(), 2);
    }

    #[tokio::test]
    async fn missing_chapters_count_as_scanned() {
        let (corpus, index) = setup().await;
        // Chapters 3 and 4 of Genesis have no documents in the fixture.
        let chapters = Arc::new(vec![(1u16, 1u32), (1, 3), (1, 4)]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let found =
            scan_chapters(corpus, index, chapters, elohim(), SCAN_RESULT_LIMIT, Some(tx)).await;
        assert_eq!(found, vec![1, 2, 3]);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 3);
        assert_eq!(events.last().unwrap().scanned, 3);
    }

    #[tokio::test]
    async fn progress_counts_increase_monotonically() {
        let (corpus, index) = setup().await;
        let chapters = Arc::new(index.chapters_for_books(1..=2));
        let total = chapters.len();
        let (tx, mut rx) = mpsc::unbounded_channel();
        scan_chapters(corpus, index, chapters, elohim(), SCAN_RESULT_LIMIT, Some(tx)).await;

        let mut scanned = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.total, total);
            scanned.push(event.scanned);
        }
        assert_eq!(scanned.len(), total);
        for pair in scanned.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[tokio::test]
    async fn empty_chapter_list_returns_nothing() {
        let (corpus, index) = setup().await;
        let found = scan_chapters(corpus, index, Arc::new(Vec::new()), elohim(), 10, None).await;
        assert!(found.is_empty());
    }
}

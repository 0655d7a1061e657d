//! Verse identity
//!
//! A verse id is the verse's 1-based position in the flat verse table. It is
//! the only value stored in indices and result sets; (book, chapter, verse)
//! tuples exist solely at the edges. This module derives the reverse mapping
//! and the per-book chapter extents in one linear pass over the table.

use std::collections::HashMap;

use serde::Serialize;

use crate::books::fallback_book_name;
use crate::corpus::VerseRow;

/// Stable 1-based verse identifier.
pub type VerseId = u32;

/// Derived lookup from (book, chapter, verse) to verse id, plus the ordered
/// chapter list per book. Rebuilt from the verse table, never mutated.
pub struct VerseIndex {
    by_position: HashMap<(u16, u32, u32), VerseId>,
    chapters: HashMap<u16, Vec<u32>>,
}

impl VerseIndex {
    /// One pass over the verse table; null padding rows are skipped.
    pub fn build(rows: &[Option<VerseRow>]) -> Self {
        let mut by_position = HashMap::with_capacity(rows.len());
        let mut chapters: HashMap<u16, Vec<u32>> = HashMap::new();
        for (i, row) in rows.iter().enumerate() {
            let Some(row) = row else { continue };
            by_position.insert((row.book_id(), row.chapter(), row.verse()), (i + 1) as VerseId);
            let list = chapters.entry(row.book_id()).or_default();
            if list.last() != Some(&row.chapter()) {
                list.push(row.chapter());
            }
        }
        Self { by_position, chapters }
    }

    pub fn resolve(&self, book_id: u16, chapter: u32, verse: u32) -> Option<VerseId> {
        self.by_position.get(&(book_id, chapter, verse)).copied()
    }

    /// Chapter numbers of a book in table order, for browsing. Empty for
    /// unknown books.
    pub fn chapters(&self, book_id: u16) -> &[u32] {
        self.chapters.get(&book_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Highest chapter number seen for a book; 0 for unknown books.
    pub fn max_chapter(&self, book_id: u16) -> u32 {
        self.chapters(book_id).last().copied().unwrap_or(0)
    }

    /// (book, chapter) coordinates for the given books in canonical order,
    /// the unit of work the chapter scanner consumes.
    pub fn chapters_for_books(&self, books: impl Iterator<Item = u16>) -> Vec<(u16, u32)> {
        let mut chapters = Vec::new();
        for book_id in books {
            for chapter in 1..=self.max_chapter(book_id) {
                chapters.push((book_id, chapter));
            }
        }
        chapters
    }
}

/// A verse resolved for display: identity, book name, and sanitized text.
#[derive(Debug, Clone, Serialize)]
pub struct VerseView {
    pub verse_id: VerseId,
    pub book_id: u16,
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
}

/// Resolves a verse id against the loaded tables. `None` for ids out of
/// range or pointing at a null padding row.
pub fn verse_view(
    books: &[String],
    rows: &[Option<VerseRow>],
    verse_id: VerseId,
) -> Option<VerseView> {
    if verse_id == 0 {
        return None;
    }
    let row = rows.get(verse_id as usize - 1)?.as_ref()?;
    let book = books
        .get(row.book_id() as usize - 1)
        .cloned()
        .unwrap_or_else(|| fallback_book_name(row.book_id()));
    Some(VerseView {
        verse_id,
        book_id: row.book_id(),
        book,
        chapter: row.chapter(),
        verse: row.verse(),
        text: row.text().to_string(),
    })
}

/// All verses of one chapter in table order, resolved for display.
pub fn chapter_views(
    books: &[String],
    rows: &[Option<VerseRow>],
    book_id: u16,
    chapter: u32,
) -> Vec<VerseView> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| {
            row.as_ref()
                .is_some_and(|r| r.book_id() == book_id && r.chapter() == chapter)
        })
        .filter_map(|(i, _)| verse_view(books, rows, (i + 1) as VerseId))
        .collect()
}

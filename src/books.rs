//! Static book tables
//!
//! Book identity is positional: book id 1 is Genesis, 66 is Revelation.
//! Display names live in `data/books.json`; the slugs here name the
//! per-book interlinear directories and never change.

use crate::tokens::SourceLang;

/// Number of books in the corpus.
pub const BOOK_COUNT: u16 = 66;

/// Last Old Testament book id; everything above is New Testament.
pub const LAST_OT_BOOK: u16 = 39;

/// Directory slugs indexed by `book_id - 1`.
const BOOK_SLUGS: [&str; BOOK_COUNT as usize] = [
    "genesis",
    "exodus",
    "leviticus",
    "numbers",
    "deuteronomy",
    "joshua",
    "judges",
    "ruth",
    "1samuel",
    "2samuel",
    "1kings",
    "2kings",
    "1chronicles",
    "2chronicles",
    "ezra",
    "nehemiah",
    "esther",
    "job",
    "psalms",
    "proverbs",
    "ecclesiastes",
    "songofsongs",
    "isaiah",
    "jeremiah",
    "lamentations",
    "ezekiel",
    "daniel",
    "hosea",
    "joel",
    "amos",
    "obadiah",
    "jonah",
    "micah",
    "nahum",
    "habakkuk",
    "zephaniah",
    "haggai",
    "zechariah",
    "malachi",
    "matthew",
    "mark",
    "luke",
    "john",
    "acts",
    "romans",
    "1corinthians",
    "2corinthians",
    "galatians",
    "ephesians",
    "philippians",
    "colossians",
    "1thessalonians",
    "2thessalonians",
    "1timothy",
    "2timothy",
    "titus",
    "philemon",
    "hebrews",
    "james",
    "1peter",
    "2peter",
    "1john",
    "2john",
    "3john",
    "jude",
    "revelation",
];

/// Directory slug for a 1-based book id.
pub fn book_slug(book_id: u16) -> Option<&'static str> {
    if book_id == 0 {
        return None;
    }
    BOOK_SLUGS.get(book_id as usize - 1).copied()
}

/// Reverse lookup from slug to 1-based book id.
pub fn book_id_for_slug(slug: &str) -> Option<u16> {
    BOOK_SLUGS
        .iter()
        .position(|s| *s == slug)
        .map(|i| i as u16 + 1)
}

/// Source language of a book: Hebrew for the Old Testament, Greek for the
/// New.
pub fn source_lang_for_book(book_id: u16) -> SourceLang {
    if (1..=LAST_OT_BOOK).contains(&book_id) {
        SourceLang::Hebrew
    } else {
        SourceLang::Greek
    }
}

/// Book ids of the Old Testament, in canonical order.
pub fn old_testament_books() -> impl Iterator<Item = u16> {
    1..=LAST_OT_BOOK
}

/// Book ids of the New Testament, in canonical order.
pub fn new_testament_books() -> impl Iterator<Item = u16> {
    (LAST_OT_BOOK + 1)..=BOOK_COUNT
}

/// Fallback display name when the name table has no entry for a book.
pub fn fallback_book_name(book_id: u16) -> String {
    format!("Libri {book_id}")
}

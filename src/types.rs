use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder end verse meaning "through the end of the chapter".
///
/// 176 is the longest chapter in the canon (Psalm 119). It is never treated as
/// a real verse count: every range query is co-filtered on the chapter, so
/// verses past the chapter's true length simply do not match.
pub const CHAPTER_END_SENTINEL: u32 = 176;

/// A reference confined to exactly one chapter.
///
/// Displays as `Book C:V` for a single verse and `Book C:V1-V2` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalSegment {
    pub book: String,
    pub chapter: u32,
    pub start_verse: u32,
    pub end_verse: u32,
}

impl CanonicalSegment {
    /// A single-verse segment.
    pub fn verse(book: &str, chapter: u32, verse: u32) -> Self {
        Self::range(book, chapter, verse, verse)
    }

    /// A verse range within one chapter.
    pub fn range(book: &str, chapter: u32, start_verse: u32, end_verse: u32) -> Self {
        Self {
            book: book.to_string(),
            chapter,
            start_verse,
            end_verse,
        }
    }

    /// Verse 1 through the end-of-chapter sentinel.
    pub fn whole_chapter(book: &str, chapter: u32) -> Self {
        Self::range(book, chapter, 1, CHAPTER_END_SENTINEL)
    }

    /// `start_verse` through the end-of-chapter sentinel.
    pub fn rest_of_chapter(book: &str, chapter: u32, start_verse: u32) -> Self {
        Self::range(book, chapter, start_verse, CHAPTER_END_SENTINEL)
    }

    pub fn is_single_verse(&self) -> bool {
        self.start_verse == self.end_verse
    }

    /// True when chapter and verses are positive and the bounds are ordered.
    pub fn is_well_formed(&self) -> bool {
        self.chapter >= 1 && self.start_verse >= 1 && self.start_verse <= self.end_verse
    }
}

impl fmt::Display for CanonicalSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_verse() {
            write!(f, "{} {}:{}", self.book, self.chapter, self.start_verse)
        } else {
            write!(
                f,
                "{} {}:{}-{}",
                self.book, self.chapter, self.start_verse, self.end_verse
            )
        }
    }
}

/// One verse row as persisted in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerseRecord {
    /// Book name as it was written at import time; not necessarily canonical.
    pub book: String,
    pub book_index: usize,
    pub chapter: u32,
    pub verse_number: u32,
    /// Integer key computed by the deployment's verse-id scheme.
    pub storage_verse_id: i64,
    pub text: String,
    pub translation: String,
}

/// Range details kept alongside a batch condition so results can be
/// re-associated with the segment that asked for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseRangeInfo {
    /// Book name used in the store query.
    pub book: String,
    pub book_index: Option<usize>,
    pub chapter: u32,
    pub start_verse: u32,
    pub end_verse: u32,
}

/// How a point condition selects the book column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BookFilter {
    /// Match on the stored book name.
    Name(String),
    /// Match on the stored ordinal book index.
    Index(usize),
}

/// A single predicate in a store query. Multiple conditions are OR-ed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerseCondition {
    /// Exact `(book, chapter, verse)` match.
    Point {
        book: BookFilter,
        chapter: u32,
        verse: u32,
    },
    /// `storage_verse_id` between two bounds, restricted to one chapter.
    IdRange {
        book: String,
        chapter: u32,
        start_id: i64,
        end_id: i64,
    },
}

/// Summary statistics about the verse store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub verse_count: u64,
    pub book_count: u64,
    pub chapter_count: u64,
    pub translations: Vec<String>,
    pub db_size_bytes: u64,
}

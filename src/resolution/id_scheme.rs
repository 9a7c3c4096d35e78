use std::fmt;

use serde::{Deserialize, Serialize};

use crate::canon::CANON_SIZE;

/// Multiplier separating books in every scheme.
pub const BOOK_STRIDE: i64 = 1_000_000;

/// Multiplier separating chapters in the digit-packed scheme.
pub const CHAPTER_STRIDE: i64 = 1_000;

/// Maps `(book, chapter, verse)` to the integer key the store was populated
/// with, and back.
///
/// A deployment uses exactly one scheme; picking the wrong one for the data
/// that was imported does not error, it silently finds nothing.
pub trait VerseIdScheme: fmt::Debug + Send + Sync {
    fn kind(&self) -> IdSchemeKind;

    /// Storage id for a verse, or `None` when the inputs cannot be encoded.
    fn storage_id(&self, book_index: usize, chapter: u32, verse: u32) -> Option<i64>;

    /// Plain verse number encoded in `storage_id`, or `None` when the id does
    /// not decode to a positive verse of that book and chapter.
    fn simple_verse(&self, book_index: usize, chapter: u32, storage_id: i64) -> Option<u32>;
}

/// `verse` for Genesis, `book_index * 1_000_000 + verse` for every other book.
/// The chapter is not encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenesisSpecialScheme;

impl VerseIdScheme for GenesisSpecialScheme {
    fn kind(&self) -> IdSchemeKind {
        IdSchemeKind::GenesisSpecial
    }

    fn storage_id(&self, book_index: usize, _chapter: u32, verse: u32) -> Option<i64> {
        if book_index >= CANON_SIZE || verse == 0 {
            return None;
        }
        if book_index == 0 {
            return Some(i64::from(verse));
        }
        Some(book_index as i64 * BOOK_STRIDE + i64::from(verse))
    }

    fn simple_verse(&self, book_index: usize, _chapter: u32, storage_id: i64) -> Option<u32> {
        if book_index >= CANON_SIZE || storage_id <= 0 {
            return None;
        }
        let verse = if book_index == 0 {
            storage_id
        } else {
            storage_id - book_index as i64 * BOOK_STRIDE
        };
        if verse <= 0 || verse >= BOOK_STRIDE {
            return None;
        }
        u32::try_from(verse).ok()
    }
}

/// `book_index * 1_000_000 + (chapter - 1) * 1_000 + (verse - 1)`, applied
/// uniformly to every book.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigitPackedScheme;

impl VerseIdScheme for DigitPackedScheme {
    fn kind(&self) -> IdSchemeKind {
        IdSchemeKind::DigitPacked
    }

    fn storage_id(&self, book_index: usize, chapter: u32, verse: u32) -> Option<i64> {
        if book_index >= CANON_SIZE || chapter == 0 || verse == 0 {
            return None;
        }
        let chapter_offset = i64::from(chapter - 1);
        let verse_offset = i64::from(verse - 1);
        if chapter_offset * CHAPTER_STRIDE >= BOOK_STRIDE || verse_offset >= CHAPTER_STRIDE {
            return None;
        }
        Some(book_index as i64 * BOOK_STRIDE + chapter_offset * CHAPTER_STRIDE + verse_offset)
    }

    fn simple_verse(&self, book_index: usize, chapter: u32, storage_id: i64) -> Option<u32> {
        if book_index >= CANON_SIZE || chapter == 0 {
            return None;
        }
        let offset = storage_id
            - book_index as i64 * BOOK_STRIDE
            - i64::from(chapter - 1) * CHAPTER_STRIDE;
        if !(0..CHAPTER_STRIDE).contains(&offset) {
            return None;
        }
        u32::try_from(offset + 1).ok()
    }
}

/// Configuration-level selector for the active scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdSchemeKind {
    #[default]
    GenesisSpecial,
    DigitPacked,
}

static GENESIS_SPECIAL: GenesisSpecialScheme = GenesisSpecialScheme;
static DIGIT_PACKED: DigitPackedScheme = DigitPackedScheme;

#[allow(clippy::should_implement_trait)]
impl IdSchemeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdSchemeKind::GenesisSpecial => "genesis_special",
            IdSchemeKind::DigitPacked => "digit_packed",
        }
    }

    /// Parses a string into an `IdSchemeKind`, returning `None` for unrecognized values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "genesis_special" => Some(IdSchemeKind::GenesisSpecial),
            "digit_packed" => Some(IdSchemeKind::DigitPacked),
            _ => None,
        }
    }

    /// The strategy implementing this kind.
    pub fn scheme(&self) -> &'static dyn VerseIdScheme {
        match self {
            IdSchemeKind::GenesisSpecial => &GENESIS_SPECIAL,
            IdSchemeKind::DigitPacked => &DIGIT_PACKED,
        }
    }
}

use std::collections::HashMap;
use std::sync::LazyLock;

/// Number of books in the canon.
pub const CANON_SIZE: usize = 66;

/// A canonical book with its ordinal position and accepted abbreviations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookEntry {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Zero-based position in canon order (0 = Genesis, 65 = Revelation).
    pub ordinal: usize,
}

macro_rules! book {
    ($ordinal:expr, $name:expr, [$($alias:expr),* $(,)?]) => {
        BookEntry {
            name: $name,
            aliases: &[$($alias),*],
            ordinal: $ordinal,
        }
    };
}

/// The 66-book canon, indexed by ordinal.
pub static BOOKS: [BookEntry; CANON_SIZE] = [
    book!(0, "Genesis", ["Gen", "Ge", "Gn"]),
    book!(1, "Exodus", ["Ex", "Exo", "Exod"]),
    book!(2, "Leviticus", ["Lev", "Le", "Lv"]),
    book!(3, "Numbers", ["Num", "Nu", "Nm"]),
    book!(4, "Deuteronomy", ["Deut", "Deu", "Dt"]),
    book!(5, "Joshua", ["Josh", "Jos"]),
    book!(6, "Judges", ["Judg", "Jdg"]),
    book!(7, "Ruth", ["Rth", "Ru"]),
    book!(8, "1 Samuel", ["1 Sam", "1 Sa", "1Sam"]),
    book!(9, "2 Samuel", ["2 Sam", "2 Sa", "2Sam"]),
    book!(10, "1 Kings", ["1 Kgs", "1 Ki", "1Kgs"]),
    book!(11, "2 Kings", ["2 Kgs", "2 Ki", "2Kgs"]),
    book!(12, "1 Chronicles", ["1 Chron", "1 Chr", "1Chr"]),
    book!(13, "2 Chronicles", ["2 Chron", "2 Chr", "2Chr"]),
    book!(14, "Ezra", ["Ezr"]),
    book!(15, "Nehemiah", ["Neh", "Ne"]),
    book!(16, "Esther", ["Esth", "Est"]),
    book!(17, "Job", ["Jb"]),
    book!(18, "Psalm", ["Ps", "Psa", "Psalms", "Pss"]),
    book!(19, "Proverbs", ["Prov", "Pro", "Prv"]),
    book!(20, "Ecclesiastes", ["Eccl", "Ecc", "Qoh"]),
    book!(21, "Song of Solomon", ["Song", "Song of Songs", "SOS", "Canticles"]),
    book!(22, "Isaiah", ["Isa", "Is"]),
    book!(23, "Jeremiah", ["Jer", "Je"]),
    book!(24, "Lamentations", ["Lam", "La"]),
    book!(25, "Ezekiel", ["Ezek", "Eze"]),
    book!(26, "Daniel", ["Dan", "Da", "Dn"]),
    book!(27, "Hosea", ["Hos", "Ho"]),
    book!(28, "Joel", ["Joe", "Jl"]),
    book!(29, "Amos", ["Am"]),
    book!(30, "Obadiah", ["Obad", "Ob"]),
    book!(31, "Jonah", ["Jon", "Jnh"]),
    book!(32, "Micah", ["Mic", "Mc"]),
    book!(33, "Nahum", ["Nah", "Na"]),
    book!(34, "Habakkuk", ["Hab", "Hb"]),
    book!(35, "Zephaniah", ["Zeph", "Zep"]),
    book!(36, "Haggai", ["Hag", "Hg"]),
    book!(37, "Zechariah", ["Zech", "Zec"]),
    book!(38, "Malachi", ["Mal", "Ml"]),
    book!(39, "Matthew", ["Matt", "Mt"]),
    book!(40, "Mark", ["Mk", "Mrk"]),
    book!(41, "Luke", ["Lk", "Luk"]),
    book!(42, "John", ["Jn", "Jhn"]),
    book!(43, "Acts", ["Ac"]),
    book!(44, "Romans", ["Rom", "Ro", "Rm"]),
    book!(45, "1 Corinthians", ["1 Cor", "1 Co", "1Cor"]),
    book!(46, "2 Corinthians", ["2 Cor", "2 Co", "2Cor"]),
    book!(47, "Galatians", ["Gal", "Ga"]),
    book!(48, "Ephesians", ["Eph", "Ephes"]),
    book!(49, "Philippians", ["Phil", "Php", "Pp"]),
    book!(50, "Colossians", ["Col"]),
    book!(51, "1 Thessalonians", ["1 Thess", "1 Th", "1Thess"]),
    book!(52, "2 Thessalonians", ["2 Thess", "2 Th", "2Thess"]),
    book!(53, "1 Timothy", ["1 Tim", "1 Ti", "1Tim"]),
    book!(54, "2 Timothy", ["2 Tim", "2 Ti", "2Tim"]),
    book!(55, "Titus", ["Tit"]),
    book!(56, "Philemon", ["Philem", "Phm"]),
    book!(57, "Hebrews", ["Heb"]),
    book!(58, "James", ["Jas", "Jm"]),
    book!(59, "1 Peter", ["1 Pet", "1 Pe", "1 Pt", "1Pet"]),
    book!(60, "2 Peter", ["2 Pet", "2 Pe", "2 Pt", "2Pet"]),
    book!(61, "1 John", ["1 Jn", "1 Jhn", "1Jn"]),
    book!(62, "2 John", ["2 Jn", "2 Jhn", "2Jn"]),
    book!(63, "3 John", ["3 Jn", "3 Jhn", "3Jn"]),
    book!(64, "Jude", ["Jud", "Jd"]),
    book!(65, "Revelation", ["Rev", "Re", "Revelations"]),
];

/// Canonical name -> ordinal.
static CANONICAL_NAMES: LazyLock<HashMap<&'static str, usize>> =
    LazyLock::new(|| BOOKS.iter().map(|b| (b.name, b.ordinal)).collect());

/// Alias -> ordinal.
static ALIASES: LazyLock<HashMap<&'static str, usize>> = LazyLock::new(|| {
    BOOKS
        .iter()
        .flat_map(|b| b.aliases.iter().map(move |a| (*a, b.ordinal)))
        .collect()
});

/// Outcome of resolving a free-form book name.
///
/// When the name is unknown, `name` is the input unchanged and `index` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedBook<'a> {
    pub name: &'a str,
    pub index: Option<usize>,
}

impl ResolvedBook<'_> {
    pub fn is_known(&self) -> bool {
        self.index.is_some()
    }

    /// The ordinal as a signed value, `-1` for an unknown book.
    pub fn ordinal_or_sentinel(&self) -> i64 {
        self.index.map_or(-1, |i| i as i64)
    }
}

/// Returns the book at `ordinal`, if it is inside the canon.
pub fn book_by_ordinal(ordinal: usize) -> Option<&'static BookEntry> {
    BOOKS.get(ordinal)
}

/// Finds a book by exact canonical name, then by exact alias.
///
/// Matching is case-sensitive: `"ps"` does not resolve to Psalm.
pub fn lookup_book(name: &str) -> Option<&'static BookEntry> {
    CANONICAL_NAMES
        .get(name)
        .or_else(|| ALIASES.get(name))
        .and_then(|&ordinal| book_by_ordinal(ordinal))
}

/// Canonical name for an alias, or `None` when `name` is not an alias.
pub fn alias_target(name: &str) -> Option<&'static str> {
    ALIASES
        .get(name)
        .and_then(|&ordinal| book_by_ordinal(ordinal))
        .map(|b| b.name)
}

/// Resolves a free-form book name to its canonical name and ordinal.
pub fn resolve_book(name: &str) -> ResolvedBook<'_> {
    match lookup_book(name) {
        Some(book) => ResolvedBook {
            name: book.name,
            index: Some(book.ordinal),
        },
        None => ResolvedBook { name, index: None },
    }
}

/// The generic `Book N` name some import pipelines stored instead of the real
/// book name. `N` is one-based.
pub fn placeholder_name(ordinal: usize) -> String {
    format!("Book {}", ordinal + 1)
}

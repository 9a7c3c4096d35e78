/// The fixed 66-book canon and book-name resolution.
///
/// The table is a static array indexed by ordinal; the name and alias lookup
/// maps are built on first use and are read-only afterwards.
mod books;

pub use books::{
    alias_target, book_by_ordinal, lookup_book, placeholder_name, resolve_book, BookEntry,
    ResolvedBook, BOOKS, CANON_SIZE,
};

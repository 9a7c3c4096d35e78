/// Verse resolution module.
///
/// Turns canonical segments into verse text by mapping them onto the store's
/// verse-id scheme and running batched lookups with a per-segment fallback
/// chain.
mod cancel;
mod fetcher;
mod id_scheme;

pub use cancel::{CancelGuard, CancelToken};
pub use fetcher::{BatchVerseFetcher, FetchReport, LookupStrategy, ResolvedVerse};
pub use id_scheme::{
    DigitPackedScheme, GenesisSpecialScheme, IdSchemeKind, VerseIdScheme, BOOK_STRIDE,
    CHAPTER_STRIDE,
};

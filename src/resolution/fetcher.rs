use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use super::cancel::CancelToken;
use super::id_scheme::VerseIdScheme;
use crate::canon::{alias_target, placeholder_name, resolve_book};
use crate::db::VerseStore;
use crate::errors::{Result, ScripRefError};
use crate::reference::parse_canonical;
use crate::types::*;

/// Which step of the single-verse fallback chain produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Canonical book name (or the raw name for an unknown book).
    CanonicalName,
    /// Ordinal book index column.
    BookIndex,
    /// The book name exactly as the caller wrote it.
    RawName,
    /// The canonical name the caller's abbreviation expands to.
    AliasName,
    /// The generic `Book N` name some imports stored.
    PlaceholderName,
}

impl LookupStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupStrategy::CanonicalName => "canonical-name",
            LookupStrategy::BookIndex => "book-index",
            LookupStrategy::RawName => "raw-name",
            LookupStrategy::AliasName => "alias-name",
            LookupStrategy::PlaceholderName => "placeholder-name",
        }
    }
}

/// A verse found by the fallback chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVerse {
    pub text: String,
    pub resolved_by: LookupStrategy,
}

/// Outcome of a batch fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Reference -> assembled text, for resolved references only.
    pub texts: HashMap<String, String>,
    /// Requested references with no text, in request order.
    pub unresolved: Vec<String>,
    /// Number of references requested.
    pub total: usize,
    /// True when the combined query failed and every segment was looked up
    /// on its own.
    pub batch_failed: bool,
}

impl FetchReport {
    pub fn resolved_count(&self) -> usize {
        self.texts.len()
    }
}

/// A canonical segment with its book resolved, ready to query.
#[derive(Debug, Clone)]
struct PlannedLookup {
    reference: String,
    raw_book: String,
    range: VerseRangeInfo,
}

impl PlannedLookup {
    fn is_single(&self) -> bool {
        self.range.start_verse == self.range.end_verse
    }
}

/// Resolves many canonical segments against a verse store in as few
/// round-trips as possible.
///
/// Pipeline:
/// 1. Build one condition per segment (point or chapter-scoped id range)
/// 2. OR them into a single query and group the rows by `(book, chapter)`
/// 3. Match single verses by storage id; assemble ranges in verse order
/// 4. Segments the batch missed go through the per-segment fallback chain;
///    if the combined query itself failed, every segment does
///
/// While a fetch runs, firing its [`CancelToken`] also interrupts the store
/// call in flight when the store supports it.
///
/// A segment that cannot be resolved is left out of the result; it never
/// fails the batch.
pub struct BatchVerseFetcher<'a> {
    store: &'a dyn VerseStore,
    scheme: &'a dyn VerseIdScheme,
    fallback_on_miss: bool,
}

impl<'a> BatchVerseFetcher<'a> {
    /// Creates a fetcher with the fallback chain enabled for batch misses.
    pub fn new(store: &'a dyn VerseStore, scheme: &'a dyn VerseIdScheme) -> Self {
        Self {
            store,
            scheme,
            fallback_on_miss: true,
        }
    }

    /// Whether segments a successful batch did not resolve are retried one
    /// by one through the fallback chain.
    pub fn with_fallback_on_miss(mut self, enabled: bool) -> Self {
        self.fallback_on_miss = enabled;
        self
    }

    /// Resolves `references` (canonical segments) to their text.
    ///
    /// Only resolved references appear as keys.
    pub fn fetch_many(
        &self,
        references: &[String],
        cancel: &CancelToken,
    ) -> Result<HashMap<String, String>> {
        Ok(self.fetch_report(references, cancel)?.texts)
    }

    /// Resolves a single canonical segment, failing with `NotFound` when no
    /// strategy yields text.
    pub fn fetch_one(&self, reference: &str, cancel: &CancelToken) -> Result<String> {
        let mut texts = self.fetch_many(&[reference.to_string()], cancel)?;
        texts
            .remove(reference)
            .ok_or_else(|| ScripRefError::NotFound {
                reference: reference.to_string(),
            })
    }

    /// Like [`fetch_many`](Self::fetch_many) but also reports what was missed
    /// and whether the batch path failed.
    pub fn fetch_report(&self, references: &[String], cancel: &CancelToken) -> Result<FetchReport> {
        cancel.check()?;

        let mut report = FetchReport {
            total: references.len(),
            ..FetchReport::default()
        };

        let planned: Vec<PlannedLookup> = references
            .iter()
            .filter_map(|r| self.plan(r))
            .collect();

        // Lookups without a condition (unknown-book ranges, ids the scheme
        // cannot encode) never see batch rows.
        let mut batched: Vec<&PlannedLookup> = Vec::new();
        let mut conditions: Vec<VerseCondition> = Vec::new();
        let mut pending: Vec<&PlannedLookup> = Vec::new();
        for lookup in &planned {
            match self.condition_for(lookup) {
                Some(condition) => {
                    conditions.push(condition);
                    batched.push(lookup);
                }
                None => pending.push(lookup),
            }
        }

        let _interrupt = self.store.interrupt_hook().map(|hook| cancel.on_cancel(hook));

        let batch = if conditions.is_empty() {
            Ok(Vec::new())
        } else {
            info!(
                references = references.len(),
                conditions = conditions.len(),
                "executing batch verse query"
            );
            self.store.find_matching(&conditions)
        };

        match batch {
            Ok(records) => {
                let grouped = group_by_chapter(&records);
                for lookup in batched {
                    match self.assemble(lookup, &grouped) {
                        Some(text) => {
                            report.texts.insert(lookup.reference.clone(), text);
                        }
                        None if self.fallback_on_miss => pending.push(lookup),
                        None => {}
                    }
                }
            }
            Err(ScripRefError::Cancelled) => return Err(ScripRefError::Cancelled),
            Err(_) if cancel.is_cancelled() => return Err(ScripRefError::Cancelled),
            Err(e) => {
                warn!(error = %e, "batch verse query failed; falling back to sequential lookup");
                report.batch_failed = true;
                pending.extend(batched);
            }
        }

        if !pending.is_empty() {
            debug!(count = pending.len(), "resolving segments one by one");
        }
        for lookup in pending {
            match self.resolve_sequential(lookup, cancel) {
                Ok(text) => {
                    report.texts.insert(lookup.reference.clone(), text);
                }
                Err(ScripRefError::Cancelled) => return Err(ScripRefError::Cancelled),
                Err(e) => {
                    debug!(reference = %lookup.reference, error = %e, "segment unresolved");
                }
            }
        }

        report.unresolved = references
            .iter()
            .filter(|r| !report.texts.contains_key(r.as_str()))
            .cloned()
            .collect();

        info!(
            resolved = report.texts.len(),
            requested = references.len(),
            "fetched verse references"
        );
        Ok(report)
    }

    /// Looks up one verse, trying each book spelling in turn:
    /// canonical name, book index, raw name, alias expansion, `Book N`.
    ///
    /// Duplicate spellings are tried once. Store errors on one step are
    /// logged and the next step is tried.
    pub fn find_single_verse(
        &self,
        book: &str,
        chapter: u32,
        verse: u32,
        cancel: &CancelToken,
    ) -> Result<ResolvedVerse> {
        let resolved = resolve_book(book);

        let mut attempts = vec![(
            LookupStrategy::CanonicalName,
            BookFilter::Name(resolved.name.to_string()),
        )];
        if let Some(index) = resolved.index {
            attempts.push((LookupStrategy::BookIndex, BookFilter::Index(index)));
        }
        attempts.push((LookupStrategy::RawName, BookFilter::Name(book.to_string())));
        if let Some(alias) = alias_target(book) {
            attempts.push((LookupStrategy::AliasName, BookFilter::Name(alias.to_string())));
        }
        if let Some(index) = resolved.index {
            attempts.push((
                LookupStrategy::PlaceholderName,
                BookFilter::Name(placeholder_name(index)),
            ));
        }

        let mut seen = HashSet::new();
        for (strategy, filter) in attempts {
            if !seen.insert(filter.clone()) {
                continue;
            }
            cancel.check()?;

            let condition = VerseCondition::Point {
                book: filter,
                chapter,
                verse,
            };
            match self.store.find_first(&condition) {
                Ok(Some(record)) => {
                    debug!(book, chapter, verse, strategy = strategy.as_str(), "resolved verse");
                    return Ok(ResolvedVerse {
                        text: record.text,
                        resolved_by: strategy,
                    });
                }
                Ok(None) => {}
                Err(ScripRefError::Cancelled) => return Err(ScripRefError::Cancelled),
                Err(_) if cancel.is_cancelled() => return Err(ScripRefError::Cancelled),
                Err(e) => {
                    warn!(book, chapter, verse, strategy = strategy.as_str(), error = %e, "verse lookup failed");
                }
            }
        }

        Err(ScripRefError::NotFound {
            reference: format!("{book} {chapter}:{verse}"),
        })
    }

    // ------------------------------------------------------------------
    // Private helpers
    // ------------------------------------------------------------------

    /// Parses and resolves one reference. Non-canonical or malformed input is
    /// logged and skipped.
    fn plan(&self, reference: &str) -> Option<PlannedLookup> {
        let Some(segment) = parse_canonical(reference) else {
            warn!(reference, "skipping reference that is not a single-chapter segment");
            return None;
        };
        if !segment.is_well_formed() {
            warn!(reference, "skipping malformed segment");
            return None;
        }

        let book = resolve_book(&segment.book);
        Some(PlannedLookup {
            reference: reference.to_string(),
            raw_book: segment.book.clone(),
            range: VerseRangeInfo {
                book: book.name.to_string(),
                book_index: book.index,
                chapter: segment.chapter,
                start_verse: segment.start_verse,
                end_verse: segment.end_verse,
            },
        })
    }

    /// Store condition for a planned lookup. Ranges need a known book so the
    /// storage ids can be computed; unknown-book ranges get no condition.
    fn condition_for(&self, lookup: &PlannedLookup) -> Option<VerseCondition> {
        let range = &lookup.range;
        if lookup.is_single() {
            return Some(VerseCondition::Point {
                book: BookFilter::Name(range.book.clone()),
                chapter: range.chapter,
                verse: range.start_verse,
            });
        }

        let Some(index) = range.book_index else {
            debug!(reference = %lookup.reference, "no storage ids for unknown book");
            return None;
        };
        let start_id = self.scheme.storage_id(index, range.chapter, range.start_verse)?;
        let end_id = self.scheme.storage_id(index, range.chapter, range.end_verse)?;
        debug!(
            reference = %lookup.reference,
            start_id,
            end_id,
            scheme = self.scheme.kind().as_str(),
            "mapped verse range to storage ids"
        );
        Some(VerseCondition::IdRange {
            book: range.book.clone(),
            chapter: range.chapter,
            start_id,
            end_id,
        })
    }

    /// Builds a lookup's text from batch rows, or `None` if nothing matched.
    fn assemble(
        &self,
        lookup: &PlannedLookup,
        grouped: &HashMap<(&str, u32), Vec<&VerseRecord>>,
    ) -> Option<String> {
        let range = &lookup.range;
        let candidates = grouped.get(&(range.book.as_str(), range.chapter))?;

        if lookup.is_single() {
            let expected_id = range
                .book_index
                .and_then(|i| self.scheme.storage_id(i, range.chapter, range.start_verse));
            return candidates
                .iter()
                .find(|r| match expected_id {
                    Some(id) => r.storage_verse_id == id,
                    None => r.verse_number == range.start_verse,
                })
                .map(|r| r.text.clone());
        }

        let index = range.book_index?;
        format_range(self.scheme, index, range, candidates.iter().copied())
    }

    /// Resolves one lookup without the shared batch query.
    ///
    /// Ranges first try a single chapter-scoped id query, then walk verse by
    /// verse through the fallback chain until the first miss.
    fn resolve_sequential(&self, lookup: &PlannedLookup, cancel: &CancelToken) -> Result<String> {
        let range = &lookup.range;
        if lookup.is_single() {
            return self
                .find_single_verse(&lookup.raw_book, range.chapter, range.start_verse, cancel)
                .map(|found| found.text);
        }

        if let (Some(condition), Some(index)) = (self.condition_for(lookup), range.book_index) {
            cancel.check()?;
            match self.store.find_matching(std::slice::from_ref(&condition)) {
                Ok(records) => {
                    if let Some(text) = format_range(self.scheme, index, range, records.iter()) {
                        return Ok(text);
                    }
                }
                Err(ScripRefError::Cancelled) => return Err(ScripRefError::Cancelled),
                Err(_) if cancel.is_cancelled() => return Err(ScripRefError::Cancelled),
                Err(e) => {
                    warn!(reference = %lookup.reference, error = %e, "range query failed");
                }
            }
        }

        let mut parts = Vec::new();
        for verse in range.start_verse..=range.end_verse {
            match self.find_single_verse(&lookup.raw_book, range.chapter, verse, cancel) {
                Ok(found) => parts.push(format!("[{verse}] {}", found.text)),
                // Past the last verse of the chapter.
                Err(ScripRefError::NotFound { .. }) => break,
                Err(e) => return Err(e),
            }
        }

        if parts.is_empty() {
            return Err(ScripRefError::NotFound {
                reference: lookup.reference.clone(),
            });
        }
        Ok(parts.join(" "))
    }
}

/// Groups rows by `(book, chapter)`.
fn group_by_chapter(records: &[VerseRecord]) -> HashMap<(&str, u32), Vec<&VerseRecord>> {
    let mut grouped: HashMap<(&str, u32), Vec<&VerseRecord>> = HashMap::new();
    for record in records {
        grouped
            .entry((record.book.as_str(), record.chapter))
            .or_default()
            .push(record);
    }
    grouped
}

/// Renders the rows of one range as `"[v] text"` joined by single spaces, in
/// ascending verse order. Rows whose verse number cannot be recovered from
/// their storage id are dropped.
fn format_range<'r>(
    scheme: &dyn VerseIdScheme,
    book_index: usize,
    range: &VerseRangeInfo,
    records: impl Iterator<Item = &'r VerseRecord>,
) -> Option<String> {
    let mut numbered: Vec<(u32, &VerseRecord)> = records
        .filter_map(|record| {
            match scheme.simple_verse(book_index, range.chapter, record.storage_verse_id) {
                Some(verse) => Some((verse, record)),
                None => {
                    warn!(
                        book_index,
                        storage_verse_id = record.storage_verse_id,
                        "skipping verse whose number cannot be recovered"
                    );
                    None
                }
            }
        })
        .filter(|(verse, _)| (range.start_verse..=range.end_verse).contains(verse))
        .collect();

    if numbered.is_empty() {
        return None;
    }
    numbered.sort_by_key(|(verse, _)| *verse);
    numbered.dedup_by_key(|(verse, _)| *verse);

    Some(
        numbered
            .iter()
            .map(|(verse, record)| format!("[{verse}] {}", record.text))
            .collect::<Vec<_>>()
            .join(" "),
    )
}

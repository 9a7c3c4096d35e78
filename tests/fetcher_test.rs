use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use scripref::db::{Database, InterruptHook, VerseStore, MAX_CONDITIONS_PER_QUERY};
use scripref::errors::{Result, ScripRefError};
use scripref::resolution::*;
use scripref::types::*;
use tempfile::TempDir;

/// In-memory store that can be told to fail, or to cancel a token, on the
/// combined query. Records whether its interrupt hook ran.
#[derive(Default)]
struct MemoryStore {
    records: Vec<VerseRecord>,
    fail_batch: bool,
    cancel_on_batch: Option<CancelToken>,
    interrupted: Arc<AtomicBool>,
}

fn matches(condition: &VerseCondition, record: &VerseRecord) -> bool {
    match condition {
        VerseCondition::Point {
            book,
            chapter,
            verse,
        } => {
            let book_matches = match book {
                BookFilter::Name(name) => record.book == *name,
                BookFilter::Index(index) => record.book_index == *index,
            };
            book_matches && record.chapter == *chapter && record.verse_number == *verse
        }
        VerseCondition::IdRange {
            book,
            chapter,
            start_id,
            end_id,
        } => {
            record.book == *book
                && record.chapter == *chapter
                && (*start_id..=*end_id).contains(&record.storage_verse_id)
        }
    }
}

impl VerseStore for MemoryStore {
    fn find_matching(&self, conditions: &[VerseCondition]) -> Result<Vec<VerseRecord>> {
        if let Some(token) = &self.cancel_on_batch {
            token.cancel();
        }
        if self.fail_batch {
            return Err(ScripRefError::Database {
                message: "connection reset".to_string(),
                operation: "find_matching".to_string(),
            });
        }
        Ok(self
            .records
            .iter()
            .filter(|r| conditions.iter().any(|c| matches(c, r)))
            .cloned()
            .collect())
    }

    fn find_first(&self, condition: &VerseCondition) -> Result<Option<VerseRecord>> {
        Ok(self.records.iter().find(|r| matches(condition, r)).cloned())
    }

    fn interrupt_hook(&self) -> Option<InterruptHook> {
        let interrupted = Arc::clone(&self.interrupted);
        Some(Box::new(move || interrupted.store(true, Ordering::SeqCst)))
    }
}

/// Helper: a verse stored with its Genesis-special storage id.
fn verse(book: &str, book_index: usize, chapter: u32, verse: u32, text: &str) -> VerseRecord {
    let storage_verse_id = GenesisSpecialScheme
        .storage_id(book_index.min(65), chapter, verse)
        .expect("encodable verse");
    VerseRecord {
        book: book.to_string(),
        book_index,
        chapter,
        verse_number: verse,
        storage_verse_id,
        text: text.to_string(),
        translation: "kjv".to_string(),
    }
}

/// Helper: create a temp database seeded with `records`.
fn setup_db(records: &[VerseRecord]) -> (Database, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let db = Database::initialize(&dir.path().join("bible.db")).expect("failed to initialize database");
    db.insert_verses(records).expect("failed to seed verses");
    (db, dir)
}

fn refs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_partial_batch_returns_only_resolved_keys() {
    let (db, _dir) = setup_db(&[verse("John", 42, 3, 16, "For God so loved the world")]);
    let fetcher = BatchVerseFetcher::new(&db, &GenesisSpecialScheme);

    let texts = fetcher
        .fetch_many(&refs(&["John 3:16", "NoSuchBook 1:1"]), &CancelToken::new())
        .expect("partial resolution is not an error");

    assert_eq!(texts.len(), 1, "only the stored verse should resolve");
    assert_eq!(
        texts.get("John 3:16").map(String::as_str),
        Some("For God so loved the world")
    );
}

#[test]
fn test_whole_chapter_sentinel_stays_in_chapter() {
    let mut records: Vec<VerseRecord> = (1..=36)
        .map(|v| verse("John", 42, 3, v, &format!("three-{v}")))
        .collect();
    records.push(verse("John", 42, 4, 1, "FOUR-ONE"));
    let (db, _dir) = setup_db(&records);
    let fetcher = BatchVerseFetcher::new(&db, &GenesisSpecialScheme);

    let segments = scripref::reference::split_reference_strings("John 3");
    assert_eq!(segments, vec!["John 3:1-176"]);

    let texts = fetcher
        .fetch_many(&segments, &CancelToken::new())
        .expect("fetch failed");
    let chapter = texts.get("John 3:1-176").expect("chapter should resolve");

    assert!(chapter.starts_with("[1] three-1 [2] three-2"));
    assert!(chapter.ends_with("[36] three-36"));
    assert!(!chapter.contains("FOUR-ONE"), "John 4:1 leaked into John 3");
}

#[test]
fn test_range_is_assembled_in_verse_order() {
    let records = vec![
        verse("Romans", 44, 8, 39, "nor height"),
        verse("Romans", 44, 8, 38, "For I am persuaded"),
        verse("Romans", 44, 8, 40, "out of range"),
    ];
    let (db, _dir) = setup_db(&records);
    let fetcher = BatchVerseFetcher::new(&db, &GenesisSpecialScheme);

    let text = fetcher
        .fetch_one("Romans 8:38-39", &CancelToken::new())
        .expect("range should resolve");
    assert_eq!(text, "[38] For I am persuaded [39] nor height");
}

#[test]
fn test_alias_in_request_resolves_canonical_rows() {
    let (db, _dir) = setup_db(&[verse("Psalm", 18, 23, 1, "The LORD is my shepherd")]);
    let fetcher = BatchVerseFetcher::new(&db, &GenesisSpecialScheme);

    let texts = fetcher
        .fetch_many(&refs(&["Ps 23:1", "Psa 23:1"]), &CancelToken::new())
        .expect("fetch failed");
    assert_eq!(texts.len(), 2);
    assert_eq!(texts["Ps 23:1"], "The LORD is my shepherd");
}

#[test]
fn test_digit_packed_ranges() {
    let scheme = DigitPackedScheme;
    let records: Vec<VerseRecord> = [(3, 16), (3, 17), (3, 18), (4, 16)]
        .into_iter()
        .map(|(chapter, v)| VerseRecord {
            book: "John".to_string(),
            book_index: 42,
            chapter,
            verse_number: v,
            storage_verse_id: scheme.storage_id(42, chapter, v).expect("encodable"),
            text: format!("{chapter}:{v}"),
            translation: "kjv".to_string(),
        })
        .collect();
    let (db, _dir) = setup_db(&records);
    let fetcher = BatchVerseFetcher::new(&db, &scheme);

    let texts = fetcher
        .fetch_many(&refs(&["John 3:16-18", "John 4:16"]), &CancelToken::new())
        .expect("fetch failed");
    assert_eq!(texts["John 3:16-18"], "[16] 3:16 [17] 3:17 [18] 3:18");
    assert_eq!(texts["John 4:16"], "4:16");
}

#[test]
fn test_failed_batch_falls_back_to_sequential_lookup() {
    let store = MemoryStore {
        records: vec![
            verse("John", 42, 3, 16, "a"),
            verse("John", 42, 3, 17, "b"),
            verse("John", 42, 3, 18, "c"),
        ],
        fail_batch: true,
        ..MemoryStore::default()
    };
    let fetcher = BatchVerseFetcher::new(&store, &GenesisSpecialScheme);

    let report = fetcher
        .fetch_report(&refs(&["John 3:16", "John 3:16-18", "John 9:9"]), &CancelToken::new())
        .expect("a failing batch should not fail the call");

    assert!(report.batch_failed);
    assert_eq!(report.total, 3);
    assert_eq!(report.resolved_count(), 2);
    assert_eq!(report.texts["John 3:16"], "a");
    assert_eq!(report.texts["John 3:16-18"], "[16] a [17] b [18] c");
    assert_eq!(report.unresolved, vec!["John 9:9".to_string()]);
}

#[test]
fn test_sequential_range_stops_at_first_missing_verse() {
    let store = MemoryStore {
        records: vec![
            verse("John", 42, 21, 24, "x"),
            verse("John", 42, 21, 25, "y"),
        ],
        fail_batch: true,
        ..MemoryStore::default()
    };
    let fetcher = BatchVerseFetcher::new(&store, &GenesisSpecialScheme);

    let text = fetcher
        .fetch_one("John 21:24-176", &CancelToken::new())
        .expect("range should partially resolve");
    assert_eq!(text, "[24] x [25] y");
}

#[test]
fn test_placeholder_book_name_fallback() {
    // An import that shifted book positions by one and stored generic names.
    let store = MemoryStore {
        records: vec![verse("Book 43", 43, 3, 16, "placeholder text")],
        ..MemoryStore::default()
    };
    let fetcher = BatchVerseFetcher::new(&store, &GenesisSpecialScheme);

    let found = fetcher
        .find_single_verse("John", 3, 16, &CancelToken::new())
        .expect("placeholder name should resolve");
    assert_eq!(found.text, "placeholder text");
    assert_eq!(found.resolved_by, LookupStrategy::PlaceholderName);

    let texts = fetcher
        .fetch_many(&refs(&["John 3:16"]), &CancelToken::new())
        .expect("fetch failed");
    assert_eq!(texts["John 3:16"], "placeholder text");
}

#[test]
fn test_fallback_chain_order() {
    let store = MemoryStore {
        records: vec![
            verse("John", 42, 1, 1, "canonical"),
            verse("Jhn", 42, 1, 2, "by index"),
            verse("Jn", 7, 1, 3, "raw spelling"),
        ],
        ..MemoryStore::default()
    };
    let fetcher = BatchVerseFetcher::new(&store, &GenesisSpecialScheme);
    let cancel = CancelToken::new();

    let found = fetcher.find_single_verse("Jn", 1, 1, &cancel).expect("1:1");
    assert_eq!(found.resolved_by, LookupStrategy::CanonicalName);

    let found = fetcher.find_single_verse("Jn", 1, 2, &cancel).expect("1:2");
    assert_eq!(found.resolved_by, LookupStrategy::BookIndex);

    let found = fetcher.find_single_verse("Jn", 1, 3, &cancel).expect("1:3");
    assert_eq!(found.resolved_by, LookupStrategy::RawName);
    assert_eq!(found.text, "raw spelling");
}

#[test]
fn test_exhausted_chain_is_not_found() {
    let store = MemoryStore::default();
    let fetcher = BatchVerseFetcher::new(&store, &GenesisSpecialScheme);

    let err = fetcher
        .find_single_verse("John", 3, 16, &CancelToken::new())
        .expect_err("empty store");
    match err {
        ScripRefError::NotFound { reference } => assert_eq!(reference, "John 3:16"),
        other => panic!("expected NotFound, got {other:?}"),
    }

    let err = fetcher
        .fetch_one("John 3:16", &CancelToken::new())
        .expect_err("empty store");
    assert!(matches!(err, ScripRefError::NotFound { .. }));
}

#[test]
fn test_unknown_book_range_uses_raw_name() {
    let store = MemoryStore {
        records: vec![
            verse("Enoch", 70, 1, 1, "first"),
            verse("Enoch", 70, 1, 2, "second"),
        ],
        ..MemoryStore::default()
    };
    let fetcher = BatchVerseFetcher::new(&store, &GenesisSpecialScheme);

    let texts = fetcher
        .fetch_many(&refs(&["Enoch 1:1-5", "Enoch 1:2"]), &CancelToken::new())
        .expect("fetch failed");
    assert_eq!(texts["Enoch 1:1-5"], "[1] first [2] second");
    assert_eq!(texts["Enoch 1:2"], "second");
}

#[test]
fn test_fallback_on_miss_can_be_disabled() {
    let store = MemoryStore {
        records: vec![verse("Book 43", 43, 3, 16, "placeholder text")],
        ..MemoryStore::default()
    };
    let fetcher = BatchVerseFetcher::new(&store, &GenesisSpecialScheme).with_fallback_on_miss(false);

    let report = fetcher
        .fetch_report(&refs(&["John 3:16"]), &CancelToken::new())
        .expect("fetch failed");
    assert!(report.texts.is_empty());
    assert!(!report.batch_failed);
    assert_eq!(report.unresolved, vec!["John 3:16".to_string()]);
}

#[test]
fn test_non_canonical_input_is_skipped() {
    let (db, _dir) = setup_db(&[verse("John", 42, 3, 16, "text")]);
    let fetcher = BatchVerseFetcher::new(&db, &GenesisSpecialScheme);

    let report = fetcher
        .fetch_report(&refs(&["John 3", "garbage", "John 3:16"]), &CancelToken::new())
        .expect("fetch failed");
    assert_eq!(report.resolved_count(), 1);
    assert_eq!(report.unresolved, refs(&["John 3", "garbage"]));
}

#[test]
fn test_cancelled_token_aborts_fetch() {
    let (db, _dir) = setup_db(&[verse("John", 42, 3, 16, "text")]);
    let fetcher = BatchVerseFetcher::new(&db, &GenesisSpecialScheme);

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = fetcher
        .fetch_many(&refs(&["John 3:16"]), &cancel)
        .expect_err("cancelled fetch must fail");
    assert!(matches!(err, ScripRefError::Cancelled));

    let expired = CancelToken::with_timeout(Duration::ZERO);
    assert!(expired.is_cancelled());
    assert!(matches!(
        fetcher.fetch_many(&refs(&["John 3:16"]), &expired),
        Err(ScripRefError::Cancelled)
    ));
}

#[test]
fn test_cancellation_during_fallback_discards_partial_results() {
    let cancel = CancelToken::new();
    let store = MemoryStore {
        records: vec![verse("Book 43", 43, 3, 16, "placeholder text")],
        cancel_on_batch: Some(cancel.clone()),
        ..MemoryStore::default()
    };
    let fetcher = BatchVerseFetcher::new(&store, &GenesisSpecialScheme);

    let err = fetcher
        .fetch_many(&refs(&["John 3:16"]), &cancel)
        .expect_err("token fired before the fallback chain ran");
    assert!(matches!(err, ScripRefError::Cancelled));
    assert!(
        store.interrupted.load(Ordering::SeqCst),
        "cancelling mid-fetch should interrupt the store"
    );
}

#[test]
fn test_interrupt_hook_released_after_fetch() {
    let store = MemoryStore {
        records: vec![verse("John", 42, 3, 16, "text")],
        ..MemoryStore::default()
    };
    let fetcher = BatchVerseFetcher::new(&store, &GenesisSpecialScheme);
    let cancel = CancelToken::new();

    fetcher
        .fetch_many(&refs(&["John 3:16"]), &cancel)
        .expect("fetch failed");
    cancel.cancel();
    assert!(!store.interrupted.load(Ordering::SeqCst));
}

#[test]
fn test_large_batch_stays_on_the_combined_query() {
    let records: Vec<VerseRecord> = (1..=10)
        .flat_map(|chapter| (1..=126).map(move |v| (chapter, v)))
        .map(|(chapter, v)| verse("John", 42, chapter, v, &format!("{chapter}.{v}")))
        .collect();
    let (db, _dir) = setup_db(&records);
    let fetcher = BatchVerseFetcher::new(&db, &GenesisSpecialScheme);

    let references: Vec<String> = records
        .iter()
        .map(|r| format!("John {}:{}", r.chapter, r.verse_number))
        .collect();
    assert!(references.len() > 2 * MAX_CONDITIONS_PER_QUERY);

    let report = fetcher
        .fetch_report(&references, &CancelToken::new())
        .expect("fetch failed");
    assert!(!report.batch_failed, "combined query should not fail at this size");
    assert_eq!(report.resolved_count(), 1260);
    assert_eq!(report.texts["John 7:99"], "7.99");
}

#[test]
fn test_range_past_scheme_limit_is_not_assembled_from_other_rows() {
    let scheme = DigitPackedScheme;
    let records: Vec<VerseRecord> = (1..=36)
        .map(|v| VerseRecord {
            book: "John".to_string(),
            book_index: 42,
            chapter: 3,
            verse_number: v,
            storage_verse_id: scheme.storage_id(42, 3, v).expect("encodable"),
            text: format!("3.{v}"),
            translation: "kjv".to_string(),
        })
        .collect();
    assert!(scheme.storage_id(42, 3, 1500).is_none());
    let store = MemoryStore {
        records,
        ..MemoryStore::default()
    };
    let fetcher = BatchVerseFetcher::new(&store, &scheme);

    let expected: String = (1..=36)
        .map(|v| format!("[{v}] 3.{v}"))
        .collect::<Vec<_>>()
        .join(" ");

    let texts = fetcher
        .fetch_many(&refs(&["John 3:16", "John 3:1-1500"]), &CancelToken::new())
        .expect("fetch failed");
    assert_eq!(texts["John 3:16"], "3.16");
    assert_eq!(texts["John 3:1-1500"], expected);

    let alone = fetcher
        .fetch_one("John 3:1-1500", &CancelToken::new())
        .expect("range should resolve verse by verse");
    assert_eq!(alone, expected);
}

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{get_database_path, load_config, save_config, ScripRefConfig};
use crate::db::Database;
use crate::errors::{Result, ScripRefError};
use crate::import::{self, ImportOptions, ImportSummary, META_ID_SCHEME};
use crate::plan::DailyReading;
use crate::reference::split_reference_strings;
use crate::resolution::{BatchVerseFetcher, CancelToken};
use crate::types::StoreStats;

/// Entry point tying configuration, the verse store, and resolution together.
pub struct Engine {
    db: Database,
    config: ScripRefConfig,
    root: PathBuf,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

impl Engine {
    /// Initializes a new deployment at `root`.
    ///
    /// Creates the `.scripref` directory, writes a default configuration, and
    /// initializes an empty verse database.
    pub fn init(root: &Path) -> Result<Self> {
        let config = ScripRefConfig {
            root_dir: root.to_string_lossy().to_string(),
            ..ScripRefConfig::default()
        };
        save_config(root, &config)?;

        let db_path = get_database_path(root, &config);
        let db = Database::initialize(&db_path)?.with_translation(config.translation.clone());
        info!(path = %db_path.display(), "initialized verse store");

        Ok(Self {
            db,
            config,
            root: root.to_path_buf(),
        })
    }

    /// Opens an existing deployment using the configuration stored on disk.
    pub fn open(root: &Path) -> Result<Self> {
        let config = load_config(root)?;
        Self::open_with(root, config)
    }

    /// Opens an existing deployment with an explicit configuration.
    pub fn open_with(root: &Path, config: ScripRefConfig) -> Result<Self> {
        let db_path = get_database_path(root, &config);
        if !db_path.exists() {
            return Err(ScripRefError::Config {
                message: format!(
                    "no verse database found at '{}'; run 'scripref init' first",
                    db_path.display()
                ),
            });
        }

        let db = Database::open(&db_path)?.with_translation(config.translation.clone());

        if let Some(stored) = db.get_meta(META_ID_SCHEME)? {
            if stored != config.id_scheme.as_str() {
                warn!(
                    configured = config.id_scheme.as_str(),
                    imported_with = %stored,
                    "id scheme differs from the one the store was imported with; range lookups will miss"
                );
            }
        }

        Ok(Self {
            db,
            config,
            root: root.to_path_buf(),
        })
    }

    /// Returns `true` if a verse database exists under `root`.
    pub fn is_initialized(root: &Path) -> bool {
        load_config(root)
            .map(|config| get_database_path(root, &config).exists())
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

impl Engine {
    /// Resolves a free-form reference to its text.
    ///
    /// The reference is split into canonical segments, which are fetched in
    /// one batch. Resolved segment texts are joined in segment order with the
    /// configured separator. Fails with `NotFound` when no segment resolves.
    pub fn get_verse_by_reference(&self, reference: &str, cancel: &CancelToken) -> Result<String> {
        let segments = split_reference_strings(reference);
        let texts = self.fetcher().fetch_many(&segments, cancel)?;

        let joined = self.join_segments(&segments, &texts);
        joined.ok_or_else(|| ScripRefError::NotFound {
            reference: reference.to_string(),
        })
    }

    /// Resolves many references at once.
    ///
    /// Every segment of every reference goes into a single batch. References
    /// with nothing resolved are absent from the result.
    pub fn get_verses_by_references(
        &self,
        references: &[String],
        cancel: &CancelToken,
    ) -> Result<HashMap<String, String>> {
        let split: Vec<(&String, Vec<String>)> = references
            .iter()
            .map(|reference| (reference, split_reference_strings(reference)))
            .collect();

        let mut seen = HashSet::new();
        let unique: Vec<String> = split
            .iter()
            .flat_map(|(_, segments)| segments.iter())
            .filter(|segment| seen.insert(segment.as_str()))
            .cloned()
            .collect();
        debug!(
            references = references.len(),
            segments = unique.len(),
            "resolving references"
        );

        let texts = self.fetcher().fetch_many(&unique, cancel)?;

        Ok(split
            .into_iter()
            .filter_map(|(reference, segments)| {
                self.join_segments(&segments, &texts)
                    .map(|text| (reference.clone(), text))
            })
            .collect())
    }

    /// Fills `text` for readings that have none.
    ///
    /// Returns the days whose reference could not be resolved; their text is
    /// left empty.
    pub fn enrich_readings(
        &self,
        readings: &mut [DailyReading],
        cancel: &CancelToken,
    ) -> Result<Vec<u32>> {
        let wanted: Vec<String> = readings
            .iter()
            .filter(|r| r.text.is_empty() && !r.reference.trim().is_empty())
            .map(|r| r.reference.clone())
            .collect();
        let texts = if wanted.is_empty() {
            HashMap::new()
        } else {
            self.get_verses_by_references(&wanted, cancel)?
        };

        let mut unresolved = Vec::new();
        for reading in readings.iter_mut().filter(|r| r.text.is_empty()) {
            match texts.get(&reading.reference) {
                Some(text) => reading.text = text.clone(),
                None => unresolved.push(reading.day),
            }
        }
        if !unresolved.is_empty() {
            warn!(days = ?unresolved, "some plan readings could not be resolved");
        }
        Ok(unresolved)
    }

    fn fetcher(&self) -> BatchVerseFetcher<'_> {
        BatchVerseFetcher::new(&self.db, self.config.id_scheme.scheme())
            .with_fallback_on_miss(self.config.fallback_on_miss)
    }

    fn join_segments(&self, segments: &[String], texts: &HashMap<String, String>) -> Option<String> {
        let parts: Vec<&str> = segments
            .iter()
            .filter_map(|segment| texts.get(segment).map(String::as_str))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(&self.config.segment_separator))
        }
    }
}

// ---------------------------------------------------------------------------
// Validation, import, and status
// ---------------------------------------------------------------------------

impl Engine {
    /// `(true, "")` for a valid reference, otherwise `(false, reason)`.
    pub fn is_valid_reference(&self, reference: &str) -> (bool, String) {
        let (valid, reason) = crate::reference::is_valid_reference(reference);
        (valid, reason.unwrap_or_default())
    }

    /// Like [`is_valid_reference`](Self::is_valid_reference), as a
    /// `Validation` error naming the offending segment.
    pub fn validate_reference(&self, reference: &str) -> Result<()> {
        crate::reference::validate_reference(reference)?;
        Ok(())
    }

    /// Imports a Bible JSON document using the configured scheme and
    /// translation.
    pub fn import_json(&self, json: &str, force: bool) -> Result<ImportSummary> {
        let summary = import::import_bible_json(&self.db, json, &self.import_options(force))?;
        if !summary.unchanged {
            self.db.optimize()?;
        }
        Ok(summary)
    }

    /// Imports a Bible JSON file using the configured scheme and translation.
    pub fn import_file(&self, path: &Path, force: bool) -> Result<ImportSummary> {
        let summary = import::import_bible_file(&self.db, path, &self.import_options(force))?;
        if !summary.unchanged {
            self.db.optimize()?;
        }
        Ok(summary)
    }

    /// Returns verse, book, and chapter counts plus the database size.
    pub fn stats(&self) -> Result<StoreStats> {
        self.db.get_stats()
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &ScripRefConfig {
        &self.config
    }

    /// Returns the deployment root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the underlying verse store.
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn import_options(&self, force: bool) -> ImportOptions {
        ImportOptions {
            translation: self.config.translation.clone(),
            id_scheme: self.config.id_scheme,
            clear: true,
            force,
        }
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ScripRefError};
use crate::resolution::IdSchemeKind;

/// Name of the configuration file stored inside the `.scripref` directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Name of the hidden directory holding the configuration and verse database.
pub const SCRIPREF_DIR: &str = ".scripref";

/// Default database file name inside the `.scripref` directory.
pub const DEFAULT_DATABASE_FILE: &str = "bible.db";

/// Configuration for one scripref deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScripRefConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Directory the `.scripref` directory lives in.
    pub root_dir: String,
    /// Database file name, relative to the `.scripref` directory.
    pub database_file: String,
    /// Verse-id scheme the store was populated with.
    pub id_scheme: IdSchemeKind,
    /// Translation tag written on import and used to filter lookups.
    pub translation: String,
    /// Retry segments a successful batch query missed through the
    /// per-verse fallback chain.
    pub fallback_on_miss: bool,
    /// Separator placed between segment texts when one reference expands to
    /// several segments.
    pub segment_separator: String,
}

impl Default for ScripRefConfig {
    fn default() -> Self {
        Self {
            version: 1,
            root_dir: String::new(),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            id_scheme: IdSchemeKind::default(),
            translation: "kjv".to_string(),
            fallback_on_miss: true,
            segment_separator: "\n\n".to_string(),
        }
    }
}

/// Returns the path to the `.scripref` directory within the given root.
pub fn get_scripref_dir(root: &Path) -> PathBuf {
    root.join(SCRIPREF_DIR)
}

/// Returns the path to the configuration file within the `.scripref` directory.
pub fn get_config_path(root: &Path) -> PathBuf {
    get_scripref_dir(root).join(CONFIG_FILENAME)
}

/// Returns the path to the verse database configured for `root`.
pub fn get_database_path(root: &Path, config: &ScripRefConfig) -> PathBuf {
    get_scripref_dir(root).join(&config.database_file)
}

/// Loads the configuration from disk.
///
/// If the configuration file does not exist, returns a default configuration
/// with `root_dir` set to the given root. Missing fields take their defaults.
pub fn load_config(root: &Path) -> Result<ScripRefConfig> {
    let config_path = get_config_path(root);

    if !config_path.exists() {
        return Ok(ScripRefConfig {
            root_dir: root.to_string_lossy().to_string(),
            ..ScripRefConfig::default()
        });
    }

    let contents = fs::read_to_string(&config_path).map_err(|e| ScripRefError::Config {
        message: format!(
            "failed to read config file '{}': {}",
            config_path.display(),
            e
        ),
    })?;

    let config: ScripRefConfig =
        serde_json::from_str(&contents).map_err(|e| ScripRefError::Config {
            message: format!(
                "failed to parse config file '{}': {}",
                config_path.display(),
                e
            ),
        })?;

    validate_config(&config)?;
    Ok(config)
}

/// Saves the configuration to disk using an atomic write.
///
/// Writes to a temporary file first and then renames it into place.
pub fn save_config(root: &Path, config: &ScripRefConfig) -> Result<()> {
    validate_config(config)?;

    let scripref_dir = get_scripref_dir(root);
    fs::create_dir_all(&scripref_dir).map_err(|e| ScripRefError::Config {
        message: format!(
            "failed to create scripref directory '{}': {}",
            scripref_dir.display(),
            e
        ),
    })?;

    let config_path = get_config_path(root);
    let tmp_path = config_path.with_extension("tmp");

    let json = serde_json::to_string_pretty(config).map_err(|e| ScripRefError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| ScripRefError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, &config_path).map_err(|e| ScripRefError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            config_path.display(),
            e
        ),
    })?;

    Ok(())
}

/// Rejects values that would make the store unusable.
pub fn validate_config(config: &ScripRefConfig) -> Result<()> {
    if config.database_file.trim().is_empty() {
        return Err(ScripRefError::Config {
            message: "database_file must not be empty".to_string(),
        });
    }
    if Path::new(&config.database_file).is_absolute() {
        return Err(ScripRefError::Config {
            message: format!(
                "database_file '{}' must be relative to the {} directory",
                config.database_file, SCRIPREF_DIR
            ),
        });
    }
    if config.translation.trim().is_empty() {
        return Err(ScripRefError::Config {
            message: "translation must not be empty".to_string(),
        });
    }
    Ok(())
}

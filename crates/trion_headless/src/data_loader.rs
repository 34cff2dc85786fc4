//! Catalog and config loading for headless runs.
//!
//! Catalogs come from a single RON file or a directory of them. With no
//! path given, the standard data directory is searched and the built-in
//! table is the last resort.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use trion_core::catalog::{ItemCatalog, ItemSpec};
use trion_core::config::TrionConfig;
use trion_core::error::TrionError;

/// File name of the catalog inside a data directory.
pub const CATALOG_FILE: &str = "triggers.ron";

/// File name of the tuning table inside a data directory.
pub const CONFIG_FILE: &str = "trion_config.ron";

/// Errors raised while loading data files.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// Path does not exist.
    #[error("Data path not found: {0}")]
    NotFound(String),
    /// Failed to list a directory.
    #[error("Failed to read '{0}': {1}")]
    IoError(String, String),
    /// A directory held no loadable catalog file.
    #[error("No catalog files in directory: {0}")]
    EmptyDirectory(String),
    /// Parse or validation failure reported by the core.
    #[error(transparent)]
    Core(#[from] TrionError),
}

/// Locate the data directory.
///
/// `TRION_DATA_DIR` wins when it points at an existing directory; otherwise
/// a few paths relative to the working directory are tried.
pub fn default_data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("TRION_DATA_DIR") {
        let path = PathBuf::from(dir);
        if path.exists() {
            return Some(path);
        }
    }

    let candidates = ["assets/data", "../assets/data", "../../assets/data"];

    for candidate in &candidates {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Some(path);
        }
    }

    None
}

/// Load every `.ron` catalog in a directory into one catalog.
///
/// Files are read in name order. A file that fails to parse is skipped with
/// a warning; ids repeated across files are an error.
pub fn load_catalog_dir(dir: &Path) -> Result<ItemCatalog, DataLoadError> {
    if !dir.exists() {
        return Err(DataLoadError::NotFound(dir.display().to_string()));
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in
        fs::read_dir(dir).map_err(|e| DataLoadError::IoError(dir.display().to_string(), e.to_string()))?
    {
        let entry =
            entry.map_err(|e| DataLoadError::IoError(dir.display().to_string(), e.to_string()))?;
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "ron")
            && !path.file_name().is_some_and(|n| n == CONFIG_FILE)
        {
            paths.push(path);
        }
    }
    paths.sort();

    let mut items: Vec<ItemSpec> = Vec::new();
    let mut loaded = 0usize;
    for path in &paths {
        match ItemCatalog::load(path) {
            Ok(catalog) => {
                loaded += 1;
                items.extend(catalog.iter().cloned());
            }
            Err(e) => {
                tracing::warn!("Failed to load catalog from {:?}: {}", path, e);
            }
        }
    }

    if loaded == 0 {
        return Err(DataLoadError::EmptyDirectory(dir.display().to_string()));
    }

    let catalog = ItemCatalog::new(items)?;
    tracing::info!(files = loaded, items = catalog.len(), dir = %dir.display(), "Catalog loaded");
    Ok(catalog)
}

/// Load a catalog from a file, a directory, or the default location.
pub fn load_catalog(path: Option<&Path>) -> Result<ItemCatalog, DataLoadError> {
    match path {
        Some(p) if p.is_dir() => load_catalog_dir(p),
        Some(p) if p.exists() => Ok(ItemCatalog::load(p)?),
        Some(p) => Err(DataLoadError::NotFound(p.display().to_string())),
        None => {
            let default = default_data_dir()
                .map(|dir| dir.join(CATALOG_FILE))
                .filter(|p| p.exists());
            match default {
                Some(p) => {
                    tracing::debug!(path = %p.display(), "Using default catalog file");
                    Ok(ItemCatalog::load(p)?)
                }
                None => {
                    tracing::info!("No catalog file found, using built-in table");
                    Ok(ItemCatalog::standard())
                }
            }
        }
    }
}

/// Load a tuning table from a file or the default location.
pub fn load_config(path: Option<&Path>) -> Result<TrionConfig, DataLoadError> {
    match path {
        Some(p) if p.exists() => Ok(TrionConfig::load(p)?),
        Some(p) => Err(DataLoadError::NotFound(p.display().to_string())),
        None => match default_data_dir()
            .map(|dir| dir.join(CONFIG_FILE))
            .filter(|p| p.exists())
        {
            Some(p) => {
                tracing::debug!(path = %p.display(), "Using default config file");
                Ok(TrionConfig::load(p)?)
            }
            None => Ok(TrionConfig::default()),
        },
    }
}

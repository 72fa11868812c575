//! Fixture catalog
//!
//! Loads fixture definitions from a directory tree laid out as
//! `<root>/<manufacturer>/<fixture key>.json`.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::fixture::FixtureDefinition;

/// Errors raised while loading a fixture definition
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Fixture not found: {manufacturer}/{fixture_key} ({path:?})")]
    NotFound {
        manufacturer: String,
        fixture_key: String,
        path: PathBuf,
    },

    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid fixture definition {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// File-backed fixture catalog with an in-memory cache
#[derive(Debug)]
pub struct FixtureCatalog {
    root: PathBuf,
    cache: RwLock<HashMap<(String, String), Arc<FixtureDefinition>>>,
}

impl FixtureCatalog {
    /// Create a catalog rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the definition file for a fixture
    pub fn definition_path(&self, fixture_key: &str, manufacturer: &str) -> PathBuf {
        self.root
            .join(manufacturer)
            .join(format!("{}.json", fixture_key))
    }

    /// Load a fixture definition by key and manufacturer
    pub fn load(
        &self,
        fixture_key: &str,
        manufacturer: &str,
    ) -> Result<Arc<FixtureDefinition>, CatalogError> {
        let cache_key = (manufacturer.to_string(), fixture_key.to_string());
        if let Some(def) = self.cache.read().get(&cache_key) {
            return Ok(Arc::clone(def));
        }

        let path = self.definition_path(fixture_key, manufacturer);
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::NotFound {
                    manufacturer: manufacturer.to_string(),
                    fixture_key: fixture_key.to_string(),
                    path,
                });
            }
            Err(source) => return Err(CatalogError::Io { path, source }),
        };

        let def: FixtureDefinition = serde_json::from_str(&json)
            .map_err(|source| CatalogError::Parse {
                path: path.clone(),
                source,
            })?;
        let def = Arc::new(def);

        tracing::debug!(
            "Loaded fixture {}/{} with {} modes",
            manufacturer,
            fixture_key,
            def.modes.len()
        );

        self.cache.write().insert(cache_key, Arc::clone(&def));
        Ok(def)
    }
}

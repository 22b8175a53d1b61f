//! Metadata Cache - Completion suggestions learned from search results
//!
//! Collects field names and values of the built-in metadata fields as
//! results come back, and persists them as JSON between runs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::domain::ResultEntry;

/// Fields whose values are worth suggesting
pub const METADATA_FIELDS: &[&str] = &[
    "_sourcecategory",
    "_collector",
    "_source",
    "_sourcehost",
    "_sourcename",
];

#[derive(Debug, Error)]
pub enum MetadataCacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache format error: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataCache {
    #[serde(default)]
    pub fields: BTreeSet<String>,
    /// Lowercased metadata field → observed values
    #[serde(default)]
    pub values: BTreeMap<String, BTreeSet<String>>,
}

impl MetadataCache {
    /// Load from disk; a missing file is an empty cache
    pub fn load(path: &Path) -> Result<Self, MetadataCacheError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), MetadataCacheError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Union in everything seen in `entries`. Returns true if anything was new.
    pub fn absorb(&mut self, entries: &[ResultEntry]) -> bool {
        let mut changed = false;

        for entry in entries {
            for (field, value) in &entry.map {
                changed |= self.fields.insert(field.clone());

                let key = field.to_lowercase();
                if value.is_empty() || !METADATA_FIELDS.contains(&key.as_str()) {
                    continue;
                }

                changed |= self.values.entry(key).or_default().insert(value.clone());
            }
        }

        changed
    }

    /// Field names starting with `prefix` (case-insensitive)
    pub fn suggest_fields(&self, prefix: &str) -> Vec<&str> {
        matching(&self.fields, prefix)
    }

    /// Known values of a metadata field starting with `prefix` (case-insensitive)
    pub fn suggest_values(&self, field: &str, prefix: &str) -> Vec<&str> {
        self.values
            .get(&field.to_lowercase())
            .map(|values| matching(values, prefix))
            .unwrap_or_default()
    }
}

fn matching<'a>(set: &'a BTreeSet<String>, prefix: &str) -> Vec<&'a str> {
    let prefix = prefix.to_lowercase();
    set.iter()
        .filter(|item| item.to_lowercase().starts_with(&prefix))
        .map(String::as_str)
        .collect()
}

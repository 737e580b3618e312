//! Fingerprint database artifact
//!
//! A single JSON object mapping font identifiers to their mean feature
//! vectors. Vectors are kept as plain number lists so that an entry with
//! the wrong length does not poison the whole file; such entries are
//! skipped at match time instead.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::vision::features::{FeatureVector, FEATURE_LEN};

/// Font identifier to fingerprint mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FontDatabase {
    entries: BTreeMap<String, Vec<f64>>,
}

impl FontDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the fingerprint of `font_id`, replacing any previous one
    pub fn insert(&mut self, font_id: impl Into<String>, fingerprint: FeatureVector) {
        self.entries.insert(font_id.into(), fingerprint.to_vec());
    }

    /// Store a raw vector; lengths other than [`FEATURE_LEN`] are accepted
    /// here and ignored by the matcher
    pub fn insert_values(&mut self, font_id: impl Into<String>, values: Vec<f64>) {
        self.entries.insert(font_id.into(), values);
    }

    pub fn get(&self, font_id: &str) -> Option<&[f64]> {
        self.entries.get(font_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending font identifier order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.entries.iter().map(|(id, v)| (id.as_str(), v.as_slice()))
    }

    /// Number of entries per vector length
    pub fn dimension_histogram(&self) -> BTreeMap<usize, usize> {
        let mut histogram = BTreeMap::new();
        for values in self.entries.values() {
            *histogram.entry(values.len()).or_insert(0) += 1;
        }
        histogram
    }

    /// Load the artifact at `path`.
    ///
    /// A missing file, content that is not a JSON object of number lists,
    /// and an empty object are all errors.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::DatabaseNotFound(path.to_path_buf()));
        }

        let content = std::fs::read(path)?;
        let database: FontDatabase =
            serde_json::from_slice(&content).map_err(|e| Error::CorruptDatabase {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if database.is_empty() {
            return Err(Error::EmptyDatabase(path.to_path_buf()));
        }

        let mismatched = database
            .entries
            .values()
            .filter(|v| v.len() != FEATURE_LEN)
            .count();
        if mismatched > 0 {
            warn!(
                "{} of {} fingerprints in {:?} do not have {} components and will be ignored",
                mismatched,
                database.len(),
                path,
                FEATURE_LEN
            );
        }

        info!("Loaded {} font fingerprints from {:?}", database.len(), path);
        Ok(database)
    }

    /// Write the artifact to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        let write_error = |source: std::io::Error| Error::DatabaseWrite {
            path: path.to_path_buf(),
            source,
        };

        let content = serde_json::to_vec_pretty(self).map_err(|e| write_error(e.into()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(path, content).map_err(write_error)?;

        info!("Saved {} font fingerprints to {:?}", self.len(), path);
        Ok(())
    }
}

impl FromIterator<(String, FeatureVector)> for FontDatabase {
    fn from_iter<I: IntoIterator<Item = (String, FeatureVector)>>(iter: I) -> Self {
        let mut database = FontDatabase::new();
        for (id, fingerprint) in iter {
            database.insert(id, fingerprint);
        }
        database
    }
}

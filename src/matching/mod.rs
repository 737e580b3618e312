//! Font Matching
//!
//! Ranks database fingerprints against the glyph feature vectors of a
//! capture. The query vectors are averaged into one target vector and
//! every fingerprint is scored by cosine similarity.

use parking_lot::RwLock;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fingerprint::builder::FeatureAccumulator;
use crate::fingerprint::database::FontDatabase;
use crate::vision::features::FeatureVector;

/// A ranked candidate font
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontMatch {
    /// Database identifier of the font
    pub font_id: String,
    /// Cosine similarity to the query, in [-1, 1]
    pub score: f64,
}

/// Candidates sorted by descending score, then ascending font identifier
pub type MatchResult = Vec<FontMatch>;

/// Component-wise mean of the query vectors
pub fn mean_vector(query: &[FeatureVector]) -> Option<FeatureVector> {
    let mut accumulator = FeatureAccumulator::new();
    for vector in query {
        accumulator.add(vector);
    }
    accumulator.mean()
}

/// Cosine similarity of two equally long vectors; 0 if either has zero norm
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Rank every database entry against the mean of `query` and keep the
/// best `top_n`.
///
/// An empty query or database gives an empty result. Entries whose length
/// differs from the query's are skipped.
pub fn match_fonts(query: &[FeatureVector], database: &FontDatabase, top_n: usize) -> MatchResult {
    if database.is_empty() {
        debug!("Font database is empty, nothing to match");
        return Vec::new();
    }
    let Some(target) = mean_vector(query) else {
        debug!("Empty query, nothing to match");
        return Vec::new();
    };
    let target = target.as_slice();

    let mut skipped = 0;
    let mut ranked: MatchResult = database
        .iter()
        .filter_map(|(font_id, fingerprint)| {
            if fingerprint.len() != target.len() {
                skipped += 1;
                return None;
            }
            Some(FontMatch {
                font_id: font_id.to_string(),
                score: cosine_similarity(target, fingerprint),
            })
        })
        .collect();

    if skipped > 0 {
        warn!(
            "Skipped {} fingerprints with a dimension other than {}",
            skipped,
            target.len()
        );
    }

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.font_id.cmp(&b.font_id))
    });
    ranked.truncate(top_n);
    ranked
}

/// Matcher bound to one loaded database snapshot
#[derive(Debug, Clone)]
pub struct FontMatcher {
    database: Arc<FontDatabase>,
}

impl FontMatcher {
    pub fn new(database: Arc<FontDatabase>) -> Self {
        Self { database }
    }

    /// Load the database artifact; any load failure is returned
    pub fn load(path: &Path) -> Result<Self> {
        let database = FontDatabase::load(path)?;
        Ok(Self::new(Arc::new(database)))
    }

    pub fn database(&self) -> &FontDatabase {
        &self.database
    }

    /// Rank fonts for the glyph vectors of one capture
    pub fn find_best_matches(&self, query: &[FeatureVector], top_n: usize) -> MatchResult {
        match_fonts(query, &self.database, top_n)
    }
}

impl From<FontDatabase> for FontMatcher {
    fn from(database: FontDatabase) -> Self {
        Self::new(Arc::new(database))
    }
}

/// Reloadable database shared between threads.
///
/// Readers take a cheap `Arc` snapshot, so a reload never disturbs a match
/// in progress.
#[derive(Debug)]
pub struct DatabaseHandle {
    path: PathBuf,
    current: RwLock<Arc<FontDatabase>>,
}

impl DatabaseHandle {
    /// Load the database at `path`
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let database = FontDatabase::load(&path)?;
        Ok(Self {
            path,
            current: RwLock::new(Arc::new(database)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current database snapshot
    pub fn snapshot(&self) -> Arc<FontDatabase> {
        self.current.read().clone()
    }

    /// Matcher over the current snapshot
    pub fn matcher(&self) -> FontMatcher {
        FontMatcher::new(self.snapshot())
    }

    /// Re-read the artifact and swap it in, returning the new entry count.
    ///
    /// On failure the previous snapshot stays active.
    pub fn reload(&self) -> Result<usize> {
        let database = FontDatabase::load(&self.path)?;
        let count = database.len();
        *self.current.write() = Arc::new(database);
        info!("Reloaded font database from {:?} ({} fonts)", self.path, count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn v(values: [f64; 7]) -> FeatureVector {
        FeatureVector::new(values)
    }

    fn sample_database() -> FontDatabase {
        let mut db = FontDatabase::new();
        db.insert("Serif.ttf", v([0.6, 0.35, 0.5, 0.52, 1.2, 2.4, 0.11]));
        db.insert("Sans.ttf", v([0.55, 0.3, 0.5, 0.5, 0.9, 2.0, 0.09]));
        db.insert("Mono.ttf", v([0.8, 0.2, 0.5, 0.45, 0.4, 1.6, 0.07]));
        db
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let db = sample_database();
        let query = [v([0.55, 0.3, 0.5, 0.5, 0.9, 2.0, 0.09])];
        let result = match_fonts(&query, &db, 3);

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].font_id, "Sans.ttf");
        assert!((result[0].score - 1.0).abs() < 1e-5);
        assert!(result.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_query_mean_is_matched() {
        let db = sample_database();
        // Averages to the Mono.ttf fingerprint
        let query = [
            v([0.7, 0.1, 0.4, 0.45, 0.0, 1.2, 0.05]),
            v([0.9, 0.3, 0.6, 0.45, 0.8, 2.0, 0.09]),
        ];
        let result = match_fonts(&query, &db, 1);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].font_id, "Mono.ttf");
        assert!((result[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_query_or_database() {
        let db = sample_database();
        assert!(match_fonts(&[], &db, 3).is_empty());
        assert!(match_fonts(&[v([1.0; 7])], &FontDatabase::new(), 3).is_empty());
    }

    #[test]
    fn test_top_n_limits_result() {
        let db = sample_database();
        let query = [v([0.6, 0.3, 0.5, 0.5, 1.0, 2.0, 0.1])];
        assert_eq!(match_fonts(&query, &db, 2).len(), 2);
        assert_eq!(match_fonts(&query, &db, 10).len(), 3);
        assert!(match_fonts(&query, &db, 0).is_empty());
    }

    #[test]
    fn test_dimension_mismatch_is_skipped() {
        let mut db = sample_database();
        db.insert_values("Broken.ttf", vec![1.0, 2.0, 3.0]);
        db.insert_values("Long.ttf", vec![0.5; 8]);

        let query = [v([0.6, 0.35, 0.5, 0.52, 1.2, 2.4, 0.11])];
        let result = match_fonts(&query, &db, 10);

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].font_id, "Serif.ttf");
        assert!(result.iter().all(|m| m.font_id != "Broken.ttf" && m.font_id != "Long.ttf"));
    }

    #[test]
    fn test_ties_sorted_by_font_id() {
        let base = [0.5, 0.4, 0.5, 0.5, 1.0, 2.0, 0.1];
        let mut db = FontDatabase::new();
        // Scaled copies have the same cosine similarity
        db.insert("c.ttf", v(base));
        db.insert("a.ttf", v(base.map(|x| x * 2.0)));
        db.insert("b.ttf", v(base.map(|x| x * 4.0)));

        let query = [v(base)];
        for _ in 0..5 {
            let ids: Vec<_> = match_fonts(&query, &db, 3)
                .into_iter()
                .map(|m| m.font_id)
                .collect();
            assert_eq!(ids, vec!["a.ttf", "b.ttf", "c.ttf"]);
        }
    }

    #[test]
    fn test_zero_norm_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0; 7], &[1.0; 7]), 0.0);
        assert_eq!(cosine_similarity(&[1.0; 7], &[0.0; 7]), 0.0);

        let mut db = FontDatabase::new();
        db.insert("zero.ttf", FeatureVector::ZERO);
        db.insert("one.ttf", v([1.0; 7]));
        let result = match_fonts(&[v([1.0; 7])], &db, 2);
        assert_eq!(result[1].font_id, "zero.ttf");
        assert_eq!(result[1].score, 0.0);
    }

    #[test]
    fn test_opposite_vectors() {
        let a = [1.0, -2.0, 0.5];
        let b = [-1.0, 2.0, -0.5];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_vector() {
        assert!(mean_vector(&[]).is_none());
        let mean = mean_vector(&[v([1.0; 7]), v([3.0; 7])]).unwrap();
        assert_eq!(mean, v([2.0; 7]));
    }

    #[test]
    fn test_matcher_load_missing_database_is_error() {
        let result = FontMatcher::load(Path::new("/nonexistent/font_features.json"));
        assert!(matches!(result, Err(Error::DatabaseNotFound(_))));
    }

    #[test]
    fn test_matcher_from_saved_database() {
        let temp_file = NamedTempFile::new().unwrap();
        sample_database().save(temp_file.path()).unwrap();

        let matcher = FontMatcher::load(temp_file.path()).unwrap();
        assert_eq!(matcher.database().len(), 3);

        let result = matcher.find_best_matches(&[v([0.6, 0.35, 0.5, 0.52, 1.2, 2.4, 0.11])], 3);
        assert_eq!(result[0].font_id, "Serif.ttf");
    }

    #[test]
    fn test_database_handle_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("font_features.json");
        sample_database().save(&path).unwrap();

        let handle = DatabaseHandle::load(&path).unwrap();
        let before = handle.snapshot();
        assert_eq!(before.len(), 3);

        let mut bigger = sample_database();
        bigger.insert("Extra.ttf", v([0.1; 7]));
        bigger.save(&path).unwrap();

        assert_eq!(handle.reload().unwrap(), 4);
        assert_eq!(handle.snapshot().len(), 4);
        assert_eq!(handle.matcher().database().len(), 4);
        // Earlier snapshot is unaffected
        assert_eq!(before.len(), 3);
    }

    #[test]
    fn test_failed_reload_keeps_previous_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("font_features.json");
        sample_database().save(&path).unwrap();
        let handle = DatabaseHandle::load(&path).unwrap();

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "not json").unwrap();
        drop(file);

        assert!(matches!(handle.reload(), Err(Error::CorruptDatabase { .. })));
        assert_eq!(handle.snapshot().len(), 3);
        assert_eq!(handle.path(), path.as_path());
    }

    #[test]
    fn test_concurrent_matches_share_database() {
        let matcher = FontMatcher::from(sample_database());
        let query = [v([0.8, 0.2, 0.5, 0.45, 0.4, 1.6, 0.07])];

        let results: Vec<MatchResult> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| matcher.find_best_matches(&query, 3)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for result in &results {
            assert_eq!(result, &results[0]);
            assert_eq!(result[0].font_id, "Mono.ttf");
        }
    }
}

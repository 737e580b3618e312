//! Fingerprint database builder
//!
//! Renders every character of a fixed charset in every font, computes the
//! glyph feature vectors and averages them into one fingerprint per font.
//! Fonts are processed in parallel; each worker fills its own accumulator
//! per font and the accumulators are merged afterwards.

use crossbeam_channel::unbounded;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::BuildSettings;
use crate::error::Result;
use crate::fingerprint::database::FontDatabase;
use crate::fingerprint::sources::FontSource;
use crate::vision::features::{extract_features, FeatureVector, FEATURE_LEN};
use crate::vision::raster::BinaryRaster;

/// Explicit parameters of a database build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Characters sampled per font, without duplicates
    pub charset: Vec<char>,
    /// Side length of the square canvas glyphs are centred on
    pub canvas_size: u32,
    /// Rendering size in pixels per em
    pub point_size: f32,
    /// Worker threads (0 = available parallelism)
    pub workers: usize,
}

impl From<&BuildSettings> for BuildConfig {
    fn from(settings: &BuildSettings) -> Self {
        let mut charset: Vec<char> = Vec::new();
        for ch in settings.charset.chars().filter(|c| !c.is_whitespace()) {
            if !charset.contains(&ch) {
                charset.push(ch);
            }
        }
        Self {
            charset,
            canvas_size: settings.canvas_size,
            point_size: settings.point_size,
            workers: settings.workers,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::from(&BuildSettings::default())
    }
}

impl BuildConfig {
    fn worker_count(&self, jobs: usize) -> usize {
        let workers = if self.workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.workers
        };
        workers.min(jobs).max(1)
    }
}

/// An opened font that can render single characters
pub trait GlyphFace {
    /// Render `ch` centred on a `canvas_size` square canvas, or `None` if
    /// the font has no visible glyph for it
    fn render(&self, ch: char, canvas_size: u32, point_size: f32) -> Option<BinaryRaster>;
}

/// Opens font sources for rendering
pub trait GlyphRenderer: Sync {
    /// Open a font; an error skips the whole font
    fn open(&self, source: &FontSource) -> Result<Box<dyn GlyphFace>>;
}

/// Running component-wise sum of feature vectors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureAccumulator {
    sum: [f64; FEATURE_LEN],
    count: usize,
}

impl FeatureAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, vector: &FeatureVector) {
        for (total, value) in self.sum.iter_mut().zip(vector.as_slice()) {
            *total += value;
        }
        self.count += 1;
    }

    /// Fold another accumulator's samples into this one
    pub fn merge(&mut self, other: &FeatureAccumulator) {
        for (total, value) in self.sum.iter_mut().zip(other.sum.iter()) {
            *total += value;
        }
        self.count += other.count;
    }

    /// Number of samples added
    pub fn count(&self) -> usize {
        self.count
    }

    /// Component-wise mean, `None` without samples
    pub fn mean(&self) -> Option<FeatureVector> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(FeatureVector::new(self.sum.map(|total| total / n)))
    }
}

/// Outcome counters of a build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Font sources handed to the builder
    pub fonts_seen: usize,
    /// Sources that could not be opened
    pub fonts_unreadable: usize,
    /// Sources that opened but produced no usable glyph
    pub fonts_without_samples: usize,
    /// Retained per-character samples across all fonts
    pub samples: usize,
}

/// Builds a [`FontDatabase`] from font sources
pub struct DatabaseBuilder<R> {
    renderer: R,
    config: BuildConfig,
}

impl<R: GlyphRenderer> DatabaseBuilder<R> {
    pub fn new(renderer: R, config: BuildConfig) -> Self {
        Self { renderer, config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the database for `sources`
    pub fn build(&self, sources: &[FontSource]) -> FontDatabase {
        self.build_with_report(sources).0
    }

    /// Build the database for `sources` and report what was skipped
    pub fn build_with_report(&self, sources: &[FontSource]) -> (FontDatabase, BuildReport) {
        let started = Instant::now();
        let workers = self.config.worker_count(sources.len());
        info!(
            "Building fingerprints for {} font sources ({} characters, {} workers)",
            sources.len(),
            self.config.charset.len(),
            workers
        );

        let (job_tx, job_rx) = unbounded::<&FontSource>();
        let (result_tx, result_rx) = unbounded::<(String, Result<FeatureAccumulator>)>();
        // Sending only fails once every receiver is gone; job_rx lives until the scope ends
        for source in sources {
            job_tx.send(source).ok();
        }
        drop(job_tx);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for source in job_rx.iter() {
                        let result = self.fingerprint_font(source);
                        if result_tx.send((source.id.clone(), result)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        // Merge per-source accumulators by font identifier
        let mut report = BuildReport {
            fonts_seen: sources.len(),
            ..Default::default()
        };
        let mut merged: BTreeMap<String, FeatureAccumulator> = BTreeMap::new();
        for (id, result) in result_rx.iter() {
            match result {
                Ok(accumulator) => {
                    if accumulator.count() == 0 {
                        report.fonts_without_samples += 1;
                    }
                    report.samples += accumulator.count();
                    merged.entry(id).or_default().merge(&accumulator);
                }
                Err(e) => {
                    warn!("Skipping font {}: {}", id, e);
                    report.fonts_unreadable += 1;
                }
            }
        }

        let database: FontDatabase = merged
            .into_iter()
            .filter_map(|(id, accumulator)| {
                let mean = accumulator.mean();
                if mean.is_none() {
                    debug!("No usable glyphs in {}, leaving it out", id);
                }
                mean.map(|fingerprint| (id, fingerprint))
            })
            .collect();

        info!(
            "Built {} fingerprints from {} samples in {:.1?} ({} unreadable, {} without glyphs)",
            database.len(),
            report.samples,
            started.elapsed(),
            report.fonts_unreadable,
            report.fonts_without_samples
        );
        (database, report)
    }

    /// Render the charset in one font and accumulate its glyph vectors
    pub fn fingerprint_font(&self, source: &FontSource) -> Result<FeatureAccumulator> {
        let face = self.renderer.open(source)?;
        let mut accumulator = FeatureAccumulator::new();

        for &ch in &self.config.charset {
            let Some(raster) = face.render(ch, self.config.canvas_size, self.config.point_size) else {
                continue;
            };
            let features = extract_features(&raster);
            if features.is_zero() {
                continue;
            }
            accumulator.add(&features);
        }

        debug!(
            "{}: {} of {} characters usable",
            source.id,
            accumulator.count(),
            self.config.charset.len()
        );
        Ok(accumulator)
    }
}

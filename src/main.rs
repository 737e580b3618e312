//! TypePrint - identify fonts from glyph shapes
//!
//! Command-line front end: builds the font fingerprint database and ranks
//! fonts for glyph crops or whole captures.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use typeprint::config::{self, AppConfig};
use typeprint::fingerprint::{
    default_font_directories, discover_fonts, font_sources, BuildConfig, DatabaseBuilder,
    FontDatabase, OutlineRenderer,
};
use typeprint::matching::{FontMatcher, MatchResult};
use typeprint::pipeline::identify;
use typeprint::storage;
use typeprint::vision::{binarize_glyph, extract_features, FeatureVector, KnownTextRecognizer, TextPolarity};

/// TypePrint - font identification from glyph shapes
#[derive(Parser, Debug)]
#[command(name = "typeprint")]
#[command(about = "Fingerprint fonts by glyph geometry and match captured text against them")]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the fingerprint database from installed or given fonts
    Build {
        /// Where to write the database (defaults to the configured path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Font directory to scan; may be repeated
        #[arg(long = "font-dir")]
        font_dirs: Vec<PathBuf>,
    },

    /// Rank fonts for one or more single-glyph images
    Match {
        /// Number of candidates to print
        #[arg(short, long)]
        top: Option<usize>,

        /// Glyphs are light on a dark background
        #[arg(long)]
        light_on_dark: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Glyph images, one character each
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Rank fonts for a capture of a line of text whose content is known
    Identify {
        /// The text shown in the capture
        #[arg(long)]
        text: String,

        /// Number of candidates to print
        #[arg(short, long)]
        top: Option<usize>,

        /// Text is light on a dark background
        #[arg(long)]
        light_on_dark: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Capture image
        image: PathBuf,
    },

    /// Print the feature vector of a single-glyph image
    Features {
        /// Glyph is light on a dark background
        #[arg(long)]
        light_on_dark: bool,

        /// Glyph image
        image: PathBuf,
    },

    /// Summarize the fingerprint database
    Inspect,

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => storage::default_config_path().context("Could not locate the config directory")?,
    };

    let load_config = || {
        config::load_or_create_config(&config_path)
            .with_context(|| format!("Could not load configuration from {:?}", config_path))
    };

    match args.command {
        Command::InitConfig { force } => init_config(&config_path, force),
        Command::Build { output, font_dirs } => build(&load_config()?, output, font_dirs),
        Command::Match {
            top,
            light_on_dark,
            json,
            images,
        } => match_glyphs(&load_config()?, &images, top, polarity(light_on_dark), json),
        Command::Identify {
            text,
            top,
            light_on_dark,
            json,
            image,
        } => identify_capture(&load_config()?, &image, &text, top, polarity(light_on_dark), json),
        Command::Features {
            light_on_dark,
            image,
        } => print_features(&image, polarity(light_on_dark)),
        Command::Inspect => inspect(&load_config()?),
    }
}

fn polarity(light_on_dark: bool) -> TextPolarity {
    if light_on_dark {
        TextPolarity::LightOnDark
    } else {
        TextPolarity::DarkOnLight
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{:?} already exists (use --force to overwrite)", path);
    }
    config::save_config(&AppConfig::default(), path)
        .with_context(|| format!("Could not write {:?}", path))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn build(config: &AppConfig, output: Option<PathBuf>, font_dirs: Vec<PathBuf>) -> Result<()> {
    let output = match output {
        Some(path) => path,
        None => config.database_path().context("Could not resolve the database path")?,
    };

    // Command line, then config, then platform defaults
    let dirs = if !font_dirs.is_empty() {
        font_dirs
    } else if !config.build.font_dirs.is_empty() {
        config.build.font_dirs.clone()
    } else {
        default_font_directories()
    };
    info!("Scanning font directories: {:?}", dirs);

    let sources = font_sources(&discover_fonts(&dirs));
    if sources.is_empty() {
        bail!("No font files found in {:?}", dirs);
    }

    let builder = DatabaseBuilder::new(OutlineRenderer, BuildConfig::from(&config.build));
    let (database, report) = builder.build_with_report(&sources);
    if database.is_empty() {
        bail!(
            "None of the {} font sources produced a fingerprint ({} unreadable)",
            report.fonts_seen,
            report.fonts_unreadable
        );
    }

    database
        .save(&output)
        .with_context(|| format!("Could not write the font database to {:?}", output))?;
    println!(
        "Wrote {} font fingerprints to {} ({} of {} sources skipped)",
        database.len(),
        output.display(),
        report.fonts_unreadable + report.fonts_without_samples,
        report.fonts_seen
    );
    Ok(())
}

fn load_matcher(config: &AppConfig) -> Result<FontMatcher> {
    let path = config.database_path().context("Could not resolve the database path")?;
    FontMatcher::load(&path)
        .with_context(|| format!("Font database unavailable; run `typeprint build` first ({:?})", path))
}

fn glyph_features(path: &Path, polarity: TextPolarity) -> Result<FeatureVector> {
    let image = image::open(path).with_context(|| format!("Could not open {:?}", path))?;
    let raster = binarize_glyph(&image.to_luma8(), polarity);
    Ok(extract_features(&raster))
}

fn match_glyphs(
    config: &AppConfig,
    images: &[PathBuf],
    top: Option<usize>,
    polarity: TextPolarity,
    json: bool,
) -> Result<()> {
    let matcher = load_matcher(config)?;

    let mut query = Vec::with_capacity(images.len());
    for path in images {
        let features = glyph_features(path, polarity)?;
        if features.is_zero() {
            warn!("No glyph found in {:?}, ignoring it", path);
            continue;
        }
        query.push(features);
    }

    let matches = matcher.find_best_matches(&query, top.unwrap_or(config.matching.top_n));
    print_matches(&matches, json)
}

fn identify_capture(
    config: &AppConfig,
    image: &Path,
    text: &str,
    top: Option<usize>,
    polarity: TextPolarity,
    json: bool,
) -> Result<()> {
    let matcher = load_matcher(config)?;
    let capture = image::open(image).with_context(|| format!("Could not open {:?}", image))?;

    let mut settings = config.capture.clone();
    settings.polarity = polarity;
    let recognizer = KnownTextRecognizer::new(text);

    let result = identify(
        &capture,
        &recognizer,
        &matcher,
        &settings,
        top.unwrap_or(config.matching.top_n),
    )?;
    info!(
        "{} of {} characters produced a usable glyph",
        result.characters_used, result.characters_recognized
    );
    print_matches(&result.matches, json)
}

fn print_matches(matches: &MatchResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(matches)?);
        return Ok(());
    }

    if matches.is_empty() {
        println!("No matching fonts found");
        return Ok(());
    }
    for (rank, m) in matches.iter().enumerate() {
        println!("{:>2}. {:<40} {:.4}", rank + 1, m.font_id, m.score);
    }
    Ok(())
}

fn print_features(image: &Path, polarity: TextPolarity) -> Result<()> {
    let features = glyph_features(image, polarity)?;
    if features.is_zero() {
        warn!("No glyph found in {:?}", image);
    }
    for (name, value) in features.named() {
        println!("{:<22} {:.6}", name, value);
    }
    Ok(())
}

fn inspect(config: &AppConfig) -> Result<()> {
    let path = config.database_path().context("Could not resolve the database path")?;
    let database = FontDatabase::load(&path)
        .with_context(|| format!("Could not load the font database at {:?}", path))?;

    let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    println!("Database: {}", path.display());
    println!("Size:     {} bytes", size);
    println!("Fonts:    {}", database.len());
    for (dimension, count) in database.dimension_histogram() {
        println!("  {} entries with {} components", count, dimension);
    }
    Ok(())
}

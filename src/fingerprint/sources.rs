//! Font source discovery
//!
//! Walks font directories for font files and expands collections into
//! one source per contained face.

use skrifa::raw::FileRef;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const FONT_EXTENSIONS: [&str; 4] = ["ttf", "otf", "ttc", "otc"];
const COLLECTION_EXTENSIONS: [&str; 2] = ["ttc", "otc"];

/// One face inside a font file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontSource {
    /// Identifier stored in the database
    pub id: String,
    /// Path of the font file
    pub path: PathBuf,
    /// Face index inside a collection (0 for single fonts)
    pub index: u32,
}

impl FontSource {
    pub fn new(path: PathBuf, index: u32) -> Self {
        Self {
            id: font_id(&path, index),
            path,
            index,
        }
    }
}

/// Database identifier for a face: the file name, with `#index` appended
/// for collection members after the first
pub fn font_id(path: &Path, index: u32) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    if index == 0 {
        name
    } else {
        format!("{}#{}", name, index)
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// True for `.ttf`, `.otf`, `.ttc` and `.otc` files (any case)
pub fn is_font_file(path: &Path) -> bool {
    has_extension(path, &FONT_EXTENSIONS)
}

/// Recursively collect font files under `dirs`, sorted and deduplicated.
///
/// Missing directories and unreadable entries are skipped.
pub fn discover_fonts(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut fonts = BTreeSet::new();

    for dir in dirs {
        if !dir.is_dir() {
            debug!("Skipping missing font directory {:?}", dir);
            continue;
        }
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry under {:?}: {}", dir, e);
                    continue;
                }
            };
            if entry.file_type().is_file() && is_font_file(entry.path()) {
                fonts.insert(entry.into_path());
            }
        }
    }

    debug!("Discovered {} font files", fonts.len());
    fonts.into_iter().collect()
}

/// Expand font files into per-face sources.
///
/// Collections contribute one source per face. A collection whose header
/// cannot be read is passed through as face 0 so that the renderer
/// reports it as unreadable.
pub fn font_sources(paths: &[PathBuf]) -> Vec<FontSource> {
    let mut sources = Vec::with_capacity(paths.len());

    for path in paths {
        if !has_extension(path, &COLLECTION_EXTENSIONS) {
            sources.push(FontSource::new(path.clone(), 0));
            continue;
        }

        let faces = match std::fs::read(path) {
            Ok(data) => match FileRef::new(&data) {
                Ok(FileRef::Collection(collection)) => collection.len(),
                Ok(FileRef::Font(_)) => 1,
                Err(e) => {
                    warn!("Could not read collection header of {:?}: {}", path, e);
                    1
                }
            },
            Err(e) => {
                warn!("Could not read {:?}: {}", path, e);
                1
            }
        };
        sources.extend((0..faces.max(1)).map(|index| FontSource::new(path.clone(), index)));
    }

    sources
}

/// Standard font directories of the current platform
#[cfg(target_family = "windows")]
pub fn default_font_directories() -> Vec<PathBuf> {
    let system_root = std::env::var_os("SystemRoot")
        .or_else(|| std::env::var_os("WINDIR"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("C:\\Windows"));
    let mut directories = vec![system_root.join("Fonts")];
    if let Some(base) = directories::BaseDirs::new() {
        directories.push(
            base.data_local_dir()
                .join("Microsoft")
                .join("Windows")
                .join("Fonts"),
        );
    }
    directories
}

/// Standard font directories of the current platform
#[cfg(target_os = "macos")]
pub fn default_font_directories() -> Vec<PathBuf> {
    let mut directories = vec![
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from("/Library/Fonts"),
        PathBuf::from("/Network/Library/Fonts"),
    ];
    if let Some(base) = directories::BaseDirs::new() {
        directories.push(base.home_dir().join("Library").join("Fonts"));
    }
    directories
}

/// Standard font directories of the current platform
#[cfg(not(any(target_family = "windows", target_os = "macos")))]
pub fn default_font_directories() -> Vec<PathBuf> {
    let mut directories = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
    ];
    if let Some(base) = directories::BaseDirs::new() {
        directories.push(base.home_dir().join(".fonts"));
        directories.push(base.data_dir().join("fonts"));
    }
    directories
}

//! Error types shared across the engine

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("font database not found at {0}")]
    DatabaseNotFound(PathBuf),

    #[error("font database at {path} could not be parsed: {reason}")]
    CorruptDatabase { path: PathBuf, reason: String },

    #[error("font database at {0} contains no fonts")]
    EmptyDatabase(PathBuf),

    #[error("failed to write font database to {path}: {source}")]
    DatabaseWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unreadable font source {path}: {reason}")]
    UnreadableFont { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("text recognition failed: {0}")]
    Recognition(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;

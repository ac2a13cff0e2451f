//! Error taxonomy for experiment loading.
//!
//! Only file-level and configuration failures surface here. Record-level
//! problems are logged and skipped by the readers, and statistics guards
//! report missing data through `Option` instead of an error.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("could not open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("csv error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("could not draw {}: {message}", path.display())]
    Chart { path: PathBuf, message: String },

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("experiment load task failed: {0}")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;

impl StatsError {
    pub fn open(path: &Path, source: io::Error) -> Self {
        StatsError::Open {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        StatsError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn chart(path: &Path, err: impl std::fmt::Display) -> Self {
        StatsError::Chart {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardsightError {
    #[error("Catalog not initialized: no persisted catalog at {0} (run a rebuild first)")]
    CatalogNotInitialized(PathBuf),

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Catalog corrupt: {0}")]
    CatalogCorrupt(String),

    #[error("Empty reference set: no card images found under {root}")]
    EmptyReferenceSet { root: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CardsightError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CardsightError>;

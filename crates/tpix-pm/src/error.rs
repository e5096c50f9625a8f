use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TpixError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {url}")]
    HttpStatus { status: u16, url: String },

    // Download errors
    #[error("Size mismatch: expected {expected} bytes, received {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    // Format errors
    #[error("Unknown archive format: {0}")]
    UnknownArchiveFormat(String),

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("Invalid package reference: {0}")]
    InvalidPackageRef(String),

    // Version errors
    #[error("Version error: {0}")]
    Version(String),

    // Self-update errors
    #[error("{0}")]
    Precondition(String),

    #[error("No matching release asset for {os}-{arch} ({matches} candidates)")]
    PlatformAssetNotFound {
        os: String,
        arch: String,
        matches: usize,
    },

    // Cache errors
    #[error("Cache error at {}: {source}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    // Registry errors
    #[error("Registry error: {0}")]
    Registry(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TpixError {
    pub(crate) fn cache(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TpixError::Cache {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn manifest(message: impl Into<String>) -> Self {
        TpixError::InvalidManifest {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TpixError>;

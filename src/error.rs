//! error — типизированные ошибки библиотеки.
//!
//! Library code returns `CacheError`; the CLI and tests wrap it into
//! `anyhow::Error` with context, like the rest of the crate does.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// Invalid arguments to `open()` (empty path, zero save period).
    #[error("configuration error: {0}")]
    Config(String),

    /// Existing backing file is not valid JSON.
    #[error("decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Backing file decoded fine but its top-level value is a scalar.
    #[error("decode {}: root must be an object or array", .path.display())]
    BadRoot { path: PathBuf },

    #[error("io {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),

    /// Field key used on a sequence (only numeric field names address elements).
    #[error("key {key} cannot address a {kind}")]
    KeyKind { key: String, kind: &'static str },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, CacheError::Config(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, CacheError::Decode { .. } | CacheError::BadRoot { .. })
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

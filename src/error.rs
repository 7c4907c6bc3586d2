use std::path::PathBuf;
use thiserror::Error;

/// A fragment's content did not yield a valid literal at the expected binding.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("binding `{0}` not found in fragment")]
    MissingBinding(&'static str),
    #[error("`{0}` is not bound to an array literal")]
    NotAnArray(&'static str),
    #[error("array literal after `{0}` is not terminated")]
    UnterminatedLiteral(&'static str),
    #[error("unexpected content after the array literal at byte {offset}")]
    TrailingContent { offset: usize },
    #[error("array literal is not valid data: {0}")]
    Literal(#[from] json5::Error),
    #[error("entry {index} does not have the expected shape: {reason}")]
    Shape { index: usize, reason: String },
    #[error("entry {index} has an unreadable created_at `{value}`")]
    Timestamp { index: usize, value: String },
}

/// A fragment's content could not be read.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read fragment {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("fragment {0} is not valid UTF-8")]
    NotUtf8(String),
}

/// The persistence backend failed an open/get/put/clear.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("table `{0}` has not been opened")]
    NotOpened(String),
    #[error("storage I/O failed on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize value for key `{key}`: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("stored value for key `{key}` is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("slot {slot} has a fragment but no owner label")]
    MissingLabel { slot: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

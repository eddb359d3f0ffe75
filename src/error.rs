use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or truncated binary, or a missing magic marker.
    #[error("format error: {0}")]
    Format(String),
    /// Input with no sensible default (unknown chapter, malformed section).
    #[error("invalid argument: {0}")]
    Argument(String),
    /// A referenced key, section or index does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation attempted in the wrong lifecycle state.
    #[error("invalid state: {0}")]
    State(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("staging store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),
    #[error("glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("glob error: {0}")]
    Glob(#[from] glob::GlobError),
}

pub type Result<T> = std::result::Result<T, Error>;

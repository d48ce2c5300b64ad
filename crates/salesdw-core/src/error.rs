use std::path::PathBuf;

/// Error taxonomy for the hybrid-join ETL engine.
///
/// Configuration and sink errors are fatal and get their own variants so the
/// CLI can report them without an `anyhow` backtrace; everything else that
/// can go wrong during I/O or parsing is wrapped transparently. Per-row
/// problems (bad quantity, bad date, unknown product/customer) are handled
/// inline as skips/fallbacks and never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("input file not found: {0}")]
    MissingFile(PathBuf),

    #[error("sink error: {0}")]
    Sink(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Other(e.into())
    }
}

impl From<csv::Error> for EngineError {
    fn from(e: csv::Error) -> Self {
        EngineError::Other(e.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

//! Error type shared by the compressor, the decompressor and the command line front end.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PzipError {
    /// Bad thread count or chunk size. Reported before any work begins.
    #[error("configuration error: {0}")]
    Config(String),
    /// A named input could not be opened, stat'd or mapped.
    #[error("{}: {}", .path.display(), .source)]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The compressed stream ended part way through a 5 byte record.
    #[error("truncated record at offset {offset} ({len} of 5 bytes present)")]
    TruncatedRecord { offset: u64, len: usize },
    /// Another worker failed its write, so this run was abandoned.
    #[error("run aborted after an output failure")]
    Aborted,
}

impl PzipError {
    /// Attach the offending filename to an I/O failure on an input.
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PzipError>;

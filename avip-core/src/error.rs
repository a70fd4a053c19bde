//! Domain-specific error types for AVI playback.
//!
//! Container parsing fails with [`AviError`]; everything the players
//! surface to their callers is a [`PlayerError`]. Malformed input never
//! panics.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading a RIFF/AVI container.
#[derive(Debug, Error)]
pub enum AviError {
    // ── Container Errors ─────────────────────────────────────────
    /// The file does not start with a `RIFF` chunk.
    #[error("not a RIFF file")]
    NotRiff,

    /// The RIFF form type is not `AVI `.
    #[error("RIFF form type is {0:?}, expected \"AVI \"")]
    NotAvi(String),

    /// A mandatory header chunk is absent.
    #[error("missing {0} chunk")]
    MissingHeader(&'static str),

    /// The container holds no `vids` stream.
    #[error("no video stream")]
    NoVideoStream,

    /// A chunk claims more bytes than the file or its parent holds.
    #[error("truncated {chunk} chunk: need {needed} bytes, {available} available")]
    Truncated {
        chunk: String,
        needed: u64,
        available: u64,
    },

    /// A chunk carries a value that cannot be interpreted.
    #[error("invalid chunk: {0}")]
    InvalidChunk(&'static str),

    /// A frame number past the end of the index was requested.
    #[error("frame {frame} out of range (stream has {count} frames)")]
    FrameOutOfRange { frame: usize, count: usize },

    // ── I/O Errors ───────────────────────────────────────────────
    /// The file could not be opened or read.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// The canonical error type for the playback layer.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Opening the decoder handle failed. This is the only error a user
    /// ever sees; playback does not start afterwards.
    #[error("unable to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: AviError,
    },

    /// Reading from an already open stream failed.
    #[error("decode error: {0}")]
    Decode(#[from] AviError),

    /// The renderer instance could not be created or used.
    #[error("renderer error: {0}")]
    Renderer(String),

    /// A display surface rejected a frame.
    #[error("surface error: {0}")]
    Surface(String),

    /// An operation was issued in the wrong lifecycle phase.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// A worker task panicked or was aborted.
    #[error("worker failed: {0}")]
    Worker(String),

    /// Host I/O outside the container reader (surfaces, dumps).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl PlayerError {
    /// Wrap a container error raised while opening `path`.
    pub fn open(path: impl Into<PathBuf>, source: AviError) -> Self {
        PlayerError::Open {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for decoder-open failures.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, PlayerError::Open { .. })
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for PlayerError {
    fn from(s: String) -> Self {
        PlayerError::Other(s)
    }
}

impl From<&str> for PlayerError {
    fn from(s: &str) -> Self {
        PlayerError::Other(s.to_string())
    }
}

impl From<tokio::task::JoinError> for PlayerError {
    fn from(e: tokio::task::JoinError) -> Self {
        PlayerError::Worker(e.to_string())
    }
}

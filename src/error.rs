//! Error types for the VSS store decoder.
//!
//! Kinds follow the store taxonomy: size errors for truncated layouts,
//! structural errors for corrupt records, unsupported on-disk variants and
//! lookups that found nothing.

use std::fmt;
use std::io;

use thiserror::Error;

/// Main error type for store parsing and shadow copy reads.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{what}: buffer too small (needed {needed}, got {got})")]
    MessageSize {
        what: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("bad message: {0}")]
    BadMessage(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid seek: only start and current relative seeks are supported")]
    InvalidSeek,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used by callers that branch on the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MessageSize,
    BadMessage,
    InvalidArgument,
    NotSupported,
    NotFound,
    InvalidSeek,
    Io,
    Json,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::MessageSize => "message_size",
            ErrorKind::BadMessage => "bad_message",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotSupported => "not_supported",
            ErrorKind::NotFound => "no_such_file_or_directory",
            ErrorKind::InvalidSeek => "invalid_seek",
            ErrorKind::Io => "io",
            ErrorKind::Json => "json",
        };
        f.write_str(s)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MessageSize { .. } => ErrorKind::MessageSize,
            Error::BadMessage(_) => ErrorKind::BadMessage,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::NotSupported(_) => ErrorKind::NotSupported,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidSeek => ErrorKind::InvalidSeek,
            Error::Io(_) => ErrorKind::Io,
            Error::Json(_) => ErrorKind::Json,
        }
    }

    /// Shorthand for the size check every decoder starts with.
    pub(crate) fn check_size(what: &'static str, buf: &[u8], needed: usize) -> Result<()> {
        if buf.len() < needed {
            return Err(Error::MessageSize {
                what,
                needed,
                got: buf.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn bad(msg: impl Into<String>) -> Self {
        Error::BadMessage(msg.into())
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(inner) => inner,
            Error::InvalidSeek | Error::InvalidArgument(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, e)
            }
            Error::NotFound(_) => io::Error::new(io::ErrorKind::NotFound, e),
            Error::NotSupported(_) => io::Error::new(io::ErrorKind::Unsupported, e),
            Error::MessageSize { .. } | Error::BadMessage(_) | Error::Json(_) => {
                io::Error::new(io::ErrorKind::InvalidData, e)
            }
        }
    }
}

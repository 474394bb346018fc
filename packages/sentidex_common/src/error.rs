use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    /// Malformed input rejected at a call boundary, nothing was applied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),

    /// A broken invariant was detected while decoding. Never recoverable.
    #[error("index corrupted: {0}")]
    Corrupt(String),

    #[error("unsupported index file version {found:#x}, expected {expected:#x}")]
    VersionMismatch { found: i32, expected: i32 },

    #[error("reached the end of the index after {0} terms")]
    Exhausted(u64),

    #[error("document {doc_id} is beyond the last indexed document {max_doc_id}")]
    DocumentOutOfRange { doc_id: u64, max_doc_id: i64 },

    #[error("document {0} has no entry in the norm file")]
    DocumentNotFound(u64),
}

impl IndexError {
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        IndexError::InvalidArgument(message.into())
    }

    pub fn corrupt<S: Into<String>>(message: S) -> Self {
        IndexError::Corrupt(message.into())
    }

    /// Errors raised by the decoder in the middle of a record mean the file was cut short
    /// or holds garbage, which is corruption rather than an ordinary i/o failure.
    pub fn from_decode(err: io::Error, what: &str) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => IndexError::Corrupt(format!("truncated {}", what)),
            io::ErrorKind::InvalidData => IndexError::Corrupt(format!("malformed {}: {}", what, err)),
            _ => IndexError::Io(err),
        }
    }

    /// Whether this error indicates a broken on-disk invariant.
    pub fn is_corruption(&self) -> bool {
        matches!(self, IndexError::Corrupt(_) | IndexError::VersionMismatch { .. })
    }
}

//! Error types for product decoding

use thiserror::Error;

/// Errors that can occur when decoding radar or text products
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Stream ended before the declared structure was consumed
    #[error("stream ended before the declared structure was consumed")]
    Truncated,

    /// A pointer, count, or magic value violates the layout invariants
    #[error("malformed structure: {0}")]
    Malformed(String),

    /// The input uses a feature the decoder does not handle
    #[error("unsupported input: {0}")]
    Unsupported(String),

    /// A text field contained invalid UTF-8
    #[error("invalid string encoding")]
    InvalidString,
}

impl DecodeError {
    /// Map an I/O error from a stream read into a decode error.
    ///
    /// Short reads surface as `Truncated`; anything else is a malformed
    /// stream from the decoder's point of view.
    pub fn from_io(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            DecodeError::Truncated
        } else {
            DecodeError::Malformed(e.to_string())
        }
    }
}

//! Error types for the ingest layer

use stratus_core::DecodeError;
use thiserror::Error;

/// Errors surfaced by the product manager and providers
#[derive(Error, Debug)]
pub enum IngestError {
    /// A product failed to decode
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The provider returned no key for the requested time
    #[error("no object found for the requested time")]
    NotFound,

    /// Wrapped error from a data provider call
    #[error("provider error: {0}")]
    Provider(String),

    /// A caller-supplied argument was invalid
    #[error("{0}")]
    InvalidArgument(String),

    /// I/O operation failed
    #[error("I/O operation failed")]
    Io(#[from] std::io::Error),
}

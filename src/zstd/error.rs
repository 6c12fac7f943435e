//! Native Result Errors

use thiserror::Error;

use super::types::ErrorCode;
use crate::ffi::LibraryError;

/// Errors surfaced by the safe zstd wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZstdError {
    /// The native library reported an error result.
    #[error("zstd error {code}: {name}")]
    Native { code: ErrorCode, name: String },

    /// A `ZSTD_create*` function returned null.
    #[error("Failed to allocate native {0}")]
    Allocation(&'static str),

    /// The frame header does not carry the decompressed size.
    #[error("Frame content size is unknown")]
    ContentSizeUnknown,

    /// The input does not start with a valid zstd frame.
    #[error("Input is not a valid zstd frame")]
    ContentSizeError,

    /// The frame header claims more output than the input can produce or
    /// than this process can allocate.
    #[error("Frame content size {0} is too large to decompress in one shot")]
    ContentSizeTooLarge(u64),

    /// A size argument is inconsistent with the buffers passed in.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Library(#[from] LibraryError),
}

impl ZstdError {
    /// The native error code, when the error came from the library.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ZstdError::Native { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type for the safe zstd wrappers.
pub type ZstdResult<T> = Result<T, ZstdError>;

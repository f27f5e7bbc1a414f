//! Error types for compression and decompression.
//!
//! This module provides the [`PompomError`] type which covers all failures
//! that can occur when configuring the codec, framing the compressed stream,
//! or running the coder over it.
//!
//! ## Error Categories
//!
//! | Category | Errors | Description |
//! |----------|--------|-------------|
//! | Configuration | [`InvalidOrder`], [`InvalidMemoryLimit`], [`InvalidAdaptSize`] | Parameters outside their documented ranges |
//! | Allocation | [`AllocationFailed`] | The up-front model buffers could not be reserved |
//! | Framing | [`BadMagic`], [`UnexpectedEof`] | Stream is not a pompom stream, or ends early |
//! | Integrity | [`ChecksumMismatch`] | Trailing CRC does not match the decoded plaintext |
//! | I/O | [`Io`] | Read/write errors from the underlying streams |
//!
//! [`InvalidOrder`]: PompomError::InvalidOrder
//! [`InvalidMemoryLimit`]: PompomError::InvalidMemoryLimit
//! [`InvalidAdaptSize`]: PompomError::InvalidAdaptSize
//! [`AllocationFailed`]: PompomError::AllocationFailed
//! [`BadMagic`]: PompomError::BadMagic
//! [`UnexpectedEof`]: PompomError::UnexpectedEof
//! [`ChecksumMismatch`]: PompomError::ChecksumMismatch
//! [`Io`]: PompomError::Io

use std::fmt;
use std::io;

use crate::config::{ADAPT_MAX, LIMIT_MAX, LIMIT_MIN, ORDER_MAX, ORDER_MIN};

/// Error type for codec operations.
///
/// Covers configuration validation, stream framing, integrity checking and
/// I/O. Implements [`std::error::Error`] for integration with the Rust error
/// handling ecosystem.
#[derive(Debug)]
pub enum PompomError {
    /// Model order outside the accepted range.
    ///
    /// Accepted orders are [`ORDER_MIN`]..=[`ORDER_MAX`].
    ///
    /// [`ORDER_MIN`]: crate::config::ORDER_MIN
    /// [`ORDER_MAX`]: crate::config::ORDER_MAX
    InvalidOrder(u8),

    /// Model memory limit outside the accepted range.
    ///
    /// Accepted limits are [`LIMIT_MIN`]..=[`LIMIT_MAX`] MiB.
    ///
    /// [`LIMIT_MIN`]: crate::config::LIMIT_MIN
    /// [`LIMIT_MAX`]: crate::config::LIMIT_MAX
    InvalidMemoryLimit(u16),

    /// Adaptation exponent outside the accepted range.
    ///
    /// 0 disables fast local adaptation; otherwise the exponent must be
    /// at most [`ADAPT_MAX`].
    ///
    /// [`ADAPT_MAX`]: crate::config::ADAPT_MAX
    InvalidAdaptSize(u8),

    /// One of the model's backing buffers could not be allocated.
    ///
    /// The model allocates all of its memory up front; this reports the
    /// size of the reservation that failed.
    AllocationFailed {
        /// Number of bytes requested.
        bytes: usize,
    },

    /// The stream does not start with the `pim\0` magic.
    BadMagic,

    /// The compressed stream ended before the end-of-stream symbol.
    ///
    /// This usually indicates a truncated file or an interrupted transfer.
    UnexpectedEof,

    /// The trailing CRC-32 does not match the decoded plaintext.
    ChecksumMismatch {
        /// Checksum stored in the stream trailer.
        stored: u32,
        /// Checksum computed over the decoded bytes.
        computed: u32,
    },

    /// An I/O error occurred on one of the underlying streams.
    Io(io::Error),
}

impl fmt::Display for PompomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOrder(o) => {
                write!(f, "accepted order is {}-{}, got {}", ORDER_MIN, ORDER_MAX, o)
            }
            Self::InvalidMemoryLimit(m) => {
                write!(f, "accepted limit is {}-{} MiB, got {}", LIMIT_MIN, LIMIT_MAX, m)
            }
            Self::InvalidAdaptSize(a) => {
                write!(f, "accepted adaptation exponent is 1-{}, got {}", ADAPT_MAX, a)
            }
            Self::AllocationFailed { bytes } => {
                write!(f, "couldn't allocate {} bytes for the model", bytes)
            }
            Self::BadMagic => write!(f, "no magic"),
            Self::UnexpectedEof => write!(f, "unexpected end of compressed data"),
            Self::ChecksumMismatch { stored, computed } => {
                write!(
                    f,
                    "checksum does not match: file {:08x}, output {:08x}",
                    stored, computed
                )
            }
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for PompomError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PompomError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof
        } else {
            Self::Io(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, PompomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_conversion() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(PompomError::from(io_err), PompomError::UnexpectedEof));

        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(PompomError::from(io_err), PompomError::Io(_)));
    }

    #[test]
    fn test_display_carries_context() {
        let err = PompomError::ChecksumMismatch {
            stored: 0xdeadbeef,
            computed: 0x12345678,
        };
        let msg = err.to_string();
        assert!(msg.contains("deadbeef"));
        assert!(msg.contains("12345678"));
    }
}

//! Error and warning types for XEX parsing and extraction.

use thiserror::Error;

/// Errors that abort parsing or extraction.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] stribog_common::Error),

    /// Container does not start with "XEX2".
    #[error("invalid XEX magic: expected \"XEX2\", got {actual:?}")]
    BadMagic { actual: [u8; 4] },

    /// LZX decompression failed.
    #[error("LZX decompression failed: {0}")]
    Lzx(#[from] stribog_lzx::Error),

    /// Delta-compressed images carry patches, not a full PE.
    #[error("delta-compressed images are not supported")]
    UnsupportedCompression,

    /// Compression window is not a power of two in 32 KiB..2 MiB.
    #[error("invalid compression window of {0} bytes")]
    InvalidWindow(u32),

    /// Payload is encrypted but no session key was recovered.
    #[error("payload is encrypted but no session key is available")]
    MissingSessionKey,
}

/// Result type for XEX operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal conditions surfaced to the caller in encounter order.
#[derive(Debug, Clone)]
pub enum Warning {
    /// A compressed block's SHA-1 did not match its recorded hash.
    /// Extraction continues so tampered files can still be inspected.
    HashMismatch {
        block: usize,
        expected: [u8; 20],
        actual: [u8; 20],
    },

    /// An optional-header entry failed to decode; the entry is kept
    /// with no decoded payload.
    OptionalHeader { id: u32, reason: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HashMismatch {
                block,
                expected,
                actual,
            } => {
                write!(f, "block {block} hash mismatch: expected ")?;
                for byte in expected {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str(", got ")?;
                for byte in actual {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Self::OptionalHeader { id, reason } => {
                write!(f, "optional header {id:#010x} not decoded: {reason}")
            }
        }
    }
}

//! Error types for resource parsing.

use thiserror::Error;

/// Errors that can occur when parsing embedded resources.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] stribog_common::Error),

    /// Entry table runs past the end of the blob.
    #[error("XDBF entry table of {count} entries does not fit in a {len}-byte blob")]
    EntryTableTooLarge { count: u32, len: usize },
}

/// Result type for resource operations.
pub type Result<T> = std::result::Result<T, Error>;

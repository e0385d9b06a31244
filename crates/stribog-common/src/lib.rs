//! Common utilities for stribog.
//!
//! This crate provides the foundational types used across all stribog
//! crates:
//!
//! - [`BinaryReader`] - bounds-checked big-endian reading from byte slices
//! - [`swap_u32_words`] - in-place word-wise byte swap for key material
//! - [`Error`] / [`Result`] - the shared parse error type

mod error;
mod reader;

pub use error::{Error, Result};
pub use reader::{swap_u32_words, BinaryReader};

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Re-export memchr for accelerated byte searching
pub use memchr;

//! Resource recovery for extracted Xbox 360 executables.
//!
//! Two independent facilities:
//!
//! - [`Xdbf`] parses the Xbox Dashboard File resource and recovers the
//!   human-readable title string, with an [`scan_title`] fallback for
//!   blobs whose entry table is unusable.
//! - [`scan_images`] hunts for embedded images (PNG, JPEG, DDS,
//!   XPR2/XPR0) by signature, with per-format end detection.

mod error;
mod scan;
mod xdbf;

pub use error::{Error, Result};
pub use scan::{scan_images, ContentKind, FoundImage, SCAN_LIMIT, XPR_SIZE_CAP};
pub use xdbf::{scan_title, Xdbf, XdbfEntry, XDBF_MAGIC};

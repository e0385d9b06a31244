//! Stribog: Xbox 360 XEX2 executable extraction toolkit.
//!
//! Umbrella crate re-exporting the stribog libraries:
//!
//! - [`xex`] - container parsing, decryption and PE extraction
//! - [`lzx`] - the LZX window decompressor
//! - [`res`] - XDBF titles and embedded-image scanning
//! - [`common`] - shared binary-reading primitives

pub use stribog_common as common;
pub use stribog_lzx as lzx;
pub use stribog_res as res;
pub use stribog_xex as xex;

/// The types most callers need.
pub mod prelude {
    pub use stribog_lzx::LzxDecoder;
    pub use stribog_res::{scan_images, ContentKind, FoundImage, Xdbf};
    pub use stribog_xex::{
        extract_pe, recover_title, resolve_resources, Extraction, Warning, Xex, XexFile,
    };
}

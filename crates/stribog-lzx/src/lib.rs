//! LZX decompression for XEX2 payloads.
//!
//! LZX is the LZ77 + canonical-Huffman method used by Microsoft cabinet
//! and console container formats, with sliding windows of 2^15..2^21
//! bytes, an aligned-offset block type and a post-decompression Intel E8
//! call translation. This crate implements the decoder only.
//!
//! # Example
//!
//! ```no_run
//! use stribog_lzx::LzxDecoder;
//!
//! let bitstream: Vec<u8> = std::fs::read("payload.lzx")?;
//! let mut decoder = LzxDecoder::new(15)?;
//! let image = decoder.decompress(&bitstream, 0x10000)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod bitstream;
mod decoder;
mod error;
mod huffman;

pub use decoder::{LzxDecoder, FRAME_SIZE};
pub use error::{Error, Result};

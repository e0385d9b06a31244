//! PE image extraction.
//!
//! The compression record names the storage regime: absent means the
//! payload is raw unencrypted PE bytes; zeroed/raw payloads are a
//! length-bounded decrypt-and-copy; compressed payloads go through the
//! block destreamer and the LZX decoder. Delta-compressed images carry
//! patches rather than a full PE and are refused.

use stribog_lzx::LzxDecoder;

use crate::blocks;
use crate::crypto::CbcStream;
use crate::optheader::{CompressionKind, EncryptionKind};
use crate::{Error, Result, Warning, Xex};

const CHUNK_SIZE: usize = 0x10000;

/// A recovered PE image plus the warnings raised while producing it.
#[derive(Debug)]
pub struct Extraction {
    pub pe: Vec<u8>,
    pub warnings: Vec<Warning>,
}

/// Extract the PE image from the container bytes.
pub fn extract_pe(xex: &Xex, data: &[u8]) -> Result<Extraction> {
    let mut warnings = Vec::new();

    let pe = match &xex.compression {
        None => raw_copy(xex, data, false)?,
        Some(info) => match info.compression {
            CompressionKind::Zeroed | CompressionKind::Raw => {
                raw_copy(xex, data, info.encryption == EncryptionKind::Encrypted)?
            }
            CompressionKind::Compressed => {
                let window_bits = info.window_bits()?;
                let key = match info.encryption {
                    EncryptionKind::Encrypted => {
                        Some(xex.session_key.ok_or(Error::MissingSessionKey)?)
                    }
                    EncryptionKind::Unencrypted => None,
                };
                let bitstream = blocks::destream(
                    data,
                    xex.data_offset as usize,
                    info,
                    key.as_ref(),
                    &mut warnings,
                )?;

                let mut decoder = LzxDecoder::new(window_bits)?;
                decoder.decompress(&bitstream, xex.file_header.image_size as usize)?
            }
            CompressionKind::DeltaCompressed => return Err(Error::UnsupportedCompression),
        },
    };

    Ok(Extraction { pe, warnings })
}

/// Stream `min(file_length - data_offset, image_size)` bytes to the
/// output in fixed-size chunks, decrypting whole 16-byte runs when the
/// payload is encrypted. The CBC IV state persists across chunks.
fn raw_copy(xex: &Xex, data: &[u8], encrypted: bool) -> Result<Vec<u8>> {
    let start = xex.data_offset as usize;
    if start > data.len() {
        return Err(stribog_common::Error::UnexpectedEof {
            needed: start,
            available: data.len(),
        }
        .into());
    }

    let total = (data.len() - start).min(xex.file_header.image_size as usize);
    let mut cbc = if encrypted {
        let key = xex.session_key.as_ref().ok_or(Error::MissingSessionKey)?;
        Some(CbcStream::new(key))
    } else {
        None
    };

    let mut out = Vec::with_capacity(total);
    let mut position = start;
    while out.len() < total {
        let length = CHUNK_SIZE.min(total - out.len());
        let mut chunk = data[position..position + length].to_vec();
        if let Some(cbc) = cbc.as_mut() {
            cbc.decrypt(&mut chunk);
        }
        out.extend_from_slice(&chunk);
        position += length;
    }

    Ok(out)
}

//! Compressed-block destreaming.
//!
//! The LZX payload is stored as a chain of blocks. Each block, once
//! decrypted, opens with the size of the *next* block (and its SHA-1
//! when verification is enabled), followed by length-prefixed chunks of
//! LZX bitstream terminated by a zero length:
//!
//! ```text
//! [ next_block_size : u32 BE ]
//! [ next_block_hash : 20 bytes ]      -- only when verifying
//! [ ( chunk_len : u16 BE, chunk_bytes[chunk_len] )* 0x0000 ]
//! ```
//!
//! The descriptor carries the size and hash of block 0. Verification is
//! enabled iff the first-block hash is non-zero; a mismatch is reported
//! but never fatal, so tampered files can still be inspected. CBC state
//! is continuous across the whole chain.

use sha1_smol::Sha1;
use stribog_common::BinaryReader;

use crate::crypto::CbcStream;
use crate::optheader::CompressionInfo;
use crate::{Result, Warning};

/// Walk the block chain, decrypting and verifying as configured, and
/// concatenate the chunk bytes into one contiguous LZX bitstream.
pub(crate) fn destream(
    data: &[u8],
    data_offset: usize,
    info: &CompressionInfo,
    key: Option<&[u8; 16]>,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<u8>> {
    let verify = info.verify_hashes();
    let mut cbc = key.map(CbcStream::new);

    let mut cursor = data_offset;
    let mut block_size = info.first_block_size as usize;
    let mut expected_hash = info.first_block_hash;
    let mut bitstream = Vec::new();
    let mut index = 0usize;

    while block_size != 0 {
        let mut block = {
            let mut reader = BinaryReader::new_at(data, cursor);
            reader.read_bytes(block_size)?.to_vec()
        };
        cursor += block_size;

        if let Some(cbc) = cbc.as_mut() {
            cbc.decrypt(&mut block);
        }

        if verify {
            let actual = Sha1::from(block.as_slice()).digest().bytes();
            if actual != expected_hash {
                warnings.push(Warning::HashMismatch {
                    block: index,
                    expected: expected_hash,
                    actual,
                });
            }
        }

        let mut reader = BinaryReader::new(&block);
        let next_size = reader.read_u32()? as usize;
        let next_hash = if verify {
            reader.read_array::<20>()?
        } else {
            [0u8; 20]
        };

        loop {
            let chunk_len = reader.read_u16()? as usize;
            if chunk_len == 0 {
                break;
            }
            bitstream.extend_from_slice(reader.read_bytes(chunk_len)?);
        }

        block_size = next_size;
        expected_hash = next_hash;
        index += 1;
    }

    Ok(bitstream)
}

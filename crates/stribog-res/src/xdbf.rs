//! XDBF (Xbox Dashboard File) parsing.
//!
//! XDBF is a tagged blob carrying strings, images and settings. Here it
//! is queried only for the title string: namespace 1 ("string"),
//! resource id 0x8000 ("title, English"). A linear `XSTC` scan serves as
//! a fallback for blobs whose entry table is damaged.

use stribog_common::{memchr::memmem, BinaryReader};
use zerocopy::byteorder::big_endian::{U16, U32, U64};
use zerocopy::FromBytes;

use crate::{Error, Result};

/// XDBF magic bytes.
pub const XDBF_MAGIC: &[u8; 4] = b"XDBF";

/// Namespace of string resources.
const NAMESPACE_STRING: u16 = 1;

/// Resource id of the English title string.
const TITLE_RESOURCE_ID: u64 = 0x8000;

const HEADER_SIZE: usize = 24;
const ENTRY_SIZE: usize = 18;
const FREE_ENTRY_SIZE: usize = 8;

/// One 18-byte entry-table record, as stored.
#[derive(FromBytes, zerocopy::KnownLayout, zerocopy::Immutable, zerocopy::Unaligned)]
#[repr(C)]
struct RawEntry {
    namespace: U16,
    id: U64,
    offset: U32,
    length: U32,
}

/// A decoded entry-table record.
#[derive(Debug, Clone, Copy)]
pub struct XdbfEntry {
    pub namespace: u16,
    pub id: u64,
    /// Byte offset relative to the data region.
    pub offset: u32,
    pub length: u32,
}

/// Parsed XDBF blob.
#[derive(Debug)]
pub struct Xdbf<'a> {
    data: &'a [u8],
    version: u32,
    entries: Vec<XdbfEntry>,
    data_start: usize,
}

impl<'a> Xdbf<'a> {
    /// Check for the XDBF magic without parsing.
    pub fn is_xdbf(data: &[u8]) -> bool {
        data.len() >= XDBF_MAGIC.len() && &data[..XDBF_MAGIC.len()] == XDBF_MAGIC
    }

    /// Parse the header and entry table.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        reader.expect_magic(XDBF_MAGIC)?;

        let version = reader.read_u32()?;
        let entry_count = reader.read_u32()?;
        let free_count = reader.read_u32()?;
        reader.seek(HEADER_SIZE);

        // The data region follows the entry table and the free table;
        // free entries themselves are irrelevant to string lookup.
        let data_start = HEADER_SIZE
            + entry_count as usize * ENTRY_SIZE
            + free_count as usize * FREE_ENTRY_SIZE;
        if data_start > data.len() {
            return Err(Error::EntryTableTooLarge {
                count: entry_count,
                len: data.len(),
            });
        }

        let mut entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let raw = RawEntry::read_from_bytes(reader.read_bytes(ENTRY_SIZE)?)
                .map_err(|_| stribog_common::Error::UnexpectedEof {
                    needed: ENTRY_SIZE,
                    available: 0,
                })?;
            entries.push(XdbfEntry {
                namespace: raw.namespace.get(),
                id: raw.id.get(),
                offset: raw.offset.get(),
                length: raw.length.get(),
            });
        }

        Ok(Self {
            data,
            version,
            entries,
            data_start,
        })
    }

    /// Format version from the header.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// All entry-table records.
    pub fn entries(&self) -> &[XdbfEntry] {
        &self.entries
    }

    /// Raw bytes of one entry, if it lies inside the data region.
    pub fn entry_data(&self, entry: &XdbfEntry) -> Option<&'a [u8]> {
        let start = self.data_start + entry.offset as usize;
        let end = start + entry.length as usize;
        self.data.get(start..end)
    }

    /// Look up a string resource and decode it as UTF-16BE.
    pub fn string(&self, namespace: u16, id: u64) -> Option<String> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.namespace == namespace && e.id == id)?;
        let bytes = self.entry_data(entry)?;
        let text = decode_utf16be(bytes);
        (!text.is_empty()).then_some(text)
    }

    /// The English title string, if present.
    pub fn title(&self) -> Option<String> {
        self.string(NAMESPACE_STRING, TITLE_RESOURCE_ID)
    }
}

/// Decode UTF-16BE up to the first NUL or the end of the slice.
fn decode_utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Fallback title recovery: scan for an `XSTC` string-table record.
///
/// The record is a u32 entry count followed by (id, offset) pairs, the
/// offsets pointing into a UTF-16BE string pool that follows the pairs.
/// Returns the first non-empty string free of control characters.
pub fn scan_title(data: &[u8]) -> Option<String> {
    for pos in memmem::find_iter(data, b"XSTC") {
        let mut reader = BinaryReader::new_at(data, pos + 4);
        let Ok(count) = reader.read_u32() else {
            continue;
        };
        // Guard against stray magic bytes in front of garbage.
        if count == 0 || count > 0x1000 {
            continue;
        }

        let mut offsets = Vec::with_capacity(count as usize);
        let mut valid = true;
        for _ in 0..count {
            let pair = (reader.read_u32(), reader.read_u32());
            match pair {
                (Ok(_id), Ok(offset)) => offsets.push(offset),
                _ => {
                    valid = false;
                    break;
                }
            }
        }
        if !valid {
            continue;
        }

        let pool_start = reader.position();
        for offset in offsets {
            let Some(pool) = data.get(pool_start + offset as usize..) else {
                continue;
            };
            let text = decode_utf16be(pool);
            if !text.is_empty()
                && text.chars().count() <= 256
                && !text.chars().any(char::is_control)
            {
                return Some(text);
            }
        }
    }
    None
}

//! Resource directory decoding and post-extraction enrichment.
//!
//! Resource entries name a span of the loaded image. Spans that fall
//! inside the container's physical bytes are pulled out and classified
//! immediately; spans living inside the PE image proper are tagged
//! [`ContentKind::PeEmbedded`] and backfilled from the decrypted image
//! by [`resolve_resources`].

use stribog_common::{memchr::memmem, BinaryReader};
use stribog_res::{scan_title, ContentKind, Xdbf, XDBF_MAGIC};

use crate::{Result, Xex};

const RECORD_SIZE: usize = 16;

/// One named resource from the resource directory.
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    /// 8-byte ASCII name; for the dashboard resource this is the hex
    /// title id.
    pub name: String,
    /// Address relative to the loaded image.
    pub virtual_address: u32,
    pub size: u32,
    pub kind: ContentKind,
    pub data: Option<Vec<u8>>,
}

pub(crate) fn parse_directory(
    data: &[u8],
    offset: usize,
    image_base: u32,
) -> Result<Vec<ResourceEntry>> {
    let mut reader = BinaryReader::new_at(data, offset);
    let total = reader.read_u32()? as usize;
    let count = total.saturating_sub(4) / RECORD_SIZE;

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let name = reader.read_ascii(8)?.to_string();
        let virtual_address = reader.read_u32()?;
        let size = reader.read_u32()?;

        let mut entry = ResourceEntry {
            name,
            virtual_address,
            size,
            kind: ContentKind::Unknown,
            data: None,
        };

        if image_base != 0 && virtual_address >= image_base {
            let file_offset = (virtual_address - image_base) as usize;
            match data.get(file_offset..file_offset + size as usize) {
                Some(bytes) => {
                    entry.kind = ContentKind::detect(bytes);
                    entry.data = Some(bytes.to_vec());
                }
                // Past the container's physical bytes: lives in the PE.
                None => entry.kind = ContentKind::PeEmbedded,
            }
        }

        entries.push(entry);
    }
    Ok(entries)
}

/// Backfill `PeEmbedded` resources from the decrypted PE image.
pub fn resolve_resources(xex: &mut Xex, pe: &[u8]) {
    for entry in &mut xex.resources {
        if entry.kind != ContentKind::PeEmbedded || entry.data.is_some() {
            continue;
        }
        let Some(file_offset) = entry.virtual_address.checked_sub(xex.image_base) else {
            continue;
        };
        let file_offset = file_offset as usize;
        if let Some(bytes) = pe.get(file_offset..file_offset + entry.size as usize) {
            entry.kind = ContentKind::detect(bytes);
            entry.data = Some(bytes.to_vec());
        }
    }
}

/// Recover the title string: first from any XDBF resource, then by
/// scanning the image for an XDBF blob, finally via the XSTC string
/// table fallback.
pub fn recover_title(xex: &Xex, pe: &[u8]) -> Option<String> {
    for entry in &xex.resources {
        let Some(data) = &entry.data else { continue };
        if !Xdbf::is_xdbf(data) {
            continue;
        }
        if let Some(title) = Xdbf::parse(data).ok().and_then(|xdbf| xdbf.title()) {
            return Some(title);
        }
    }

    for position in memmem::find_iter(pe, XDBF_MAGIC) {
        if let Some(title) = Xdbf::parse(&pe[position..])
            .ok()
            .and_then(|xdbf| xdbf.title())
        {
            return Some(title);
        }
    }

    scan_title(pe)
}

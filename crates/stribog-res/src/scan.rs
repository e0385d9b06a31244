//! Embedded-image scanning.
//!
//! Signature-driven linear scan for images embedded in container bytes
//! or a decrypted PE image: PNG, JPEG, DDS and the XPR2/XPR0 packed
//! texture containers. Each hit gets a per-format end so the reported
//! span is a complete, standalone file.

use stribog_common::memchr::memmem;

const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const DDS_SIGNATURE: &[u8] = b"DDS ";
const XPR2_SIGNATURE: &[u8] = b"XPR2";
const XPR0_SIGNATURE: &[u8] = b"XPR0";

/// Only the front of very large inputs is scanned.
pub const SCAN_LIMIT: usize = 50 * 1024 * 1024;

/// XPR containers claiming more than this are treated as garbage.
pub const XPR_SIZE_CAP: u32 = 10 * 1024 * 1024;

/// Content classification for resource and scanned data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Png,
    Jpeg,
    Dds,
    Bmp,
    Gif,
    Xpr2,
    Xpr0,
    /// Resource living inside the PE image; bytes resolved after
    /// extraction.
    PeEmbedded,
    Unknown,
}

impl ContentKind {
    /// Classify a byte blob by its leading signature.
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(PNG_SIGNATURE) {
            Self::Png
        } else if data.starts_with(JPEG_SIGNATURE) {
            Self::Jpeg
        } else if data.starts_with(DDS_SIGNATURE) {
            Self::Dds
        } else if data.starts_with(b"BM") {
            Self::Bmp
        } else if data.starts_with(b"GIF8") {
            Self::Gif
        } else if data.starts_with(XPR2_SIGNATURE) {
            Self::Xpr2
        } else if data.starts_with(XPR0_SIGNATURE) {
            Self::Xpr0
        } else {
            Self::Unknown
        }
    }

    /// Conventional file extension for dumping.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Dds => "dds",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
            Self::Xpr2 | Self::Xpr0 => "xpr",
            Self::PeEmbedded | Self::Unknown => "bin",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Dds => "DDS",
            Self::Bmp => "BMP",
            Self::Gif => "GIF",
            Self::Xpr2 => "XPR2",
            Self::Xpr0 => "XPR0",
            Self::PeEmbedded => "PE-embedded",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One image found by [`scan_images`]. The span `offset..offset + size`
/// always lies inside the scanned input.
#[derive(Debug, Clone, Copy)]
pub struct FoundImage {
    pub kind: ContentKind,
    pub offset: usize,
    pub size: usize,
}

/// Scan up to [`SCAN_LIMIT`] bytes for embedded images.
pub fn scan_images(data: &[u8]) -> Vec<FoundImage> {
    let data = &data[..data.len().min(SCAN_LIMIT)];
    let mut found = Vec::new();

    for offset in memmem::find_iter(data, PNG_SIGNATURE) {
        if let Some(size) = png_length(&data[offset..]) {
            found.push(FoundImage {
                kind: ContentKind::Png,
                offset,
                size,
            });
        }
    }

    for offset in memmem::find_iter(data, JPEG_SIGNATURE) {
        if let Some(size) = jpeg_length(&data[offset..]) {
            found.push(FoundImage {
                kind: ContentKind::Jpeg,
                offset,
                size,
            });
        }
    }

    for offset in memmem::find_iter(data, DDS_SIGNATURE) {
        if let Some(size) = dds_length(&data[offset..]) {
            found.push(FoundImage {
                kind: ContentKind::Dds,
                offset,
                size,
            });
        }
    }

    for (signature, kind) in [
        (XPR2_SIGNATURE, ContentKind::Xpr2),
        (XPR0_SIGNATURE, ContentKind::Xpr0),
    ] {
        for offset in memmem::find_iter(data, signature) {
            if let Some(size) = xpr_length(&data[offset..]) {
                found.push(FoundImage { kind, offset, size });
            }
        }
    }

    found.sort_by_key(|image| image.offset);
    found
}

fn read_u16_be(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_u32_le(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// PNG: everything through the IEND chunk id and its trailing CRC.
fn png_length(data: &[u8]) -> Option<usize> {
    let iend = memmem::find(data, b"IEND")?;
    let end = iend + 8;
    (end <= data.len()).then_some(end)
}

/// JPEG: structural walk of the marker segments.
///
/// The byte after FFD8 must begin a plausible segment (APPn, DQT or
/// SOFn). 0xFFDA starts entropy-coded data, which runs to the 0xFFD9
/// end-of-image marker; restart markers carry no length field.
fn jpeg_length(data: &[u8]) -> Option<usize> {
    match data.get(3)? {
        0xE0..=0xEF | 0xDB | 0xC0..=0xC3 => {}
        _ => return None,
    }

    let mut pos = 2;
    loop {
        if *data.get(pos)? != 0xFF {
            return None;
        }
        match *data.get(pos + 1)? {
            0xD9 => return Some(pos + 2),
            0xD8 | 0xD0..=0xD7 => pos += 2,
            0xDA => {
                // Entropy-coded data: scan for EOI, skipping stuffed
                // 0xFF00 bytes and restart markers.
                pos += 2;
                loop {
                    let next = memmem::find(&data[pos..], &[0xFF])? + pos;
                    match *data.get(next + 1)? {
                        0xD9 => return Some(next + 2),
                        _ => pos = next + 1,
                    }
                }
            }
            _ => {
                let length = read_u16_be(data, pos + 2)? as usize;
                pos += 2 + length;
            }
        }
    }
}

/// DDS: fixed 128-byte header plus `pitch_or_linear_size`, accepted
/// only when the header length field and the dimensions are plausible.
fn dds_length(data: &[u8]) -> Option<usize> {
    if read_u32_le(data, 4)? != 124 {
        return None;
    }
    let height = read_u32_le(data, 12)?;
    let width = read_u32_le(data, 16)?;
    if !(1..=4096).contains(&width) || !(1..=4096).contains(&height) {
        return None;
    }
    let pitch_or_linear_size = read_u32_le(data, 20)? as usize;
    let end = 128 + pitch_or_linear_size;
    (end <= data.len()).then_some(end)
}

/// XPR2/XPR0: the container records its own total size.
fn xpr_length(data: &[u8]) -> Option<usize> {
    let total = read_u32_le(data, 4)?;
    if total < 8 || total > XPR_SIZE_CAP {
        return None;
    }
    let end = total as usize;
    (end <= data.len()).then_some(end)
}

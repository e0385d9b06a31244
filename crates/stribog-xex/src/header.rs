//! XEX2 container header walking.
//!
//! The container opens with a fixed 24-byte header, followed by the
//! optional-header list. The file-header region (at `file_header_offset`)
//! carries the load parameters and the encrypted session key. Fields in
//! that region sit at fixed sub-offsets and are read with a seek each
//! time; the non-monotonic order matches the on-disk layout.

use stribog_common::BinaryReader;

use crate::crypto::{decrypt_session_key, RETAIL_KEY};
use crate::flags::{AllowedMedia, GameRegion, ImageFlags, ModuleFlags};
use crate::optheader::{
    parse_bound_path, CompressionInfo, ExecutionId, HeaderId, LibraryVersion, OptionalHeader,
};
use crate::resource::{self, ResourceEntry};
use crate::{Error, Result, Warning};

/// Container magic.
pub const XEX2_MAGIC: &[u8; 4] = b"XEX2";

const CONTAINER_HEADER_SIZE: usize = 24;

/// Encrypted session key within the file-header region.
const SESSION_KEY_OFFSET: usize = 0x150;

/// Fixed load parameters from the file-header region.
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    /// Size of the file-header region (+0x000).
    pub info_size: u32,
    /// Byte size of the loaded PE image (+0x004).
    pub image_size: u32,
    /// Image flags (+0x10C).
    pub image_flags: ImageFlags,
    /// Virtual address the image loads at (+0x110).
    pub load_address: u32,
    /// Region lockout mask (+0x178).
    pub game_region: GameRegion,
    /// Media the image may run from (+0x17C).
    pub allowed_media: AllowedMedia,
}

impl FileHeader {
    fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let field = |sub: usize| -> Result<u32> {
            let mut reader = BinaryReader::new_at(data, offset + sub);
            Ok(reader.read_u32()?)
        };

        // On-disk read order: 0x000, 0x110, 0x004, 0x178, 0x10C, 0x17C.
        let info_size = field(0x000)?;
        let load_address = field(0x110)?;
        let image_size = field(0x004)?;
        let game_region = GameRegion::from_bits_retain(field(0x178)?);
        let image_flags = ImageFlags::from_bits_retain(field(0x10C)?);
        let allowed_media = AllowedMedia::from_bits_retain(field(0x17C)?);

        Ok(Self {
            info_size,
            image_size,
            image_flags,
            load_address,
            game_region,
            allowed_media,
        })
    }
}

/// Parsed container descriptor: everything recovered from the headers,
/// plus the post-extraction enrichments (resources, title). Immutable
/// from the caller's point of view once produced.
#[derive(Debug)]
pub struct Xex {
    pub magic: [u8; 4],
    pub module_flags: ModuleFlags,
    /// Absolute offset of the encrypted/compressed payload.
    pub data_offset: u32,
    pub file_header_offset: u32,
    pub optional_header_count: u32,
    pub file_header: FileHeader,
    /// Every optional-header entry in on-disk order.
    pub optional_headers: Vec<OptionalHeader>,
    pub libraries: Vec<LibraryVersion>,
    pub bound_path: Option<String>,
    pub compression: Option<CompressionInfo>,
    /// AES session key, decrypted under the retail key.
    pub session_key: Option<[u8; 16]>,
    /// Image base virtual address (optional header 0x00010201).
    pub image_base: u32,
    pub resource_dir_offset: Option<u32>,
    pub resources: Vec<ResourceEntry>,
    pub execution_id: Option<ExecutionId>,
    /// Title string recovered from the XDBF resource after extraction.
    pub title: Option<String>,
    /// Ordered log of non-fatal parse problems.
    pub warnings: Vec<Warning>,
}

impl Xex {
    /// Parse the container headers from the full file contents.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);

        let magic: [u8; 4] = reader.read_array()?;
        if &magic != XEX2_MAGIC {
            return Err(Error::BadMagic { actual: magic });
        }

        let module_flags = ModuleFlags::from_bits_retain(reader.read_u32()?);
        let data_offset = reader.read_u32()?;
        let _reserved = reader.read_u32()?;
        let file_header_offset = reader.read_u32()?;
        let optional_header_count = reader.read_u32()?;

        let file_header = FileHeader::parse(data, file_header_offset as usize)?;

        let mut key_reader =
            BinaryReader::new_at(data, file_header_offset as usize + SESSION_KEY_OFFSET);
        let encrypted_key: [u8; 16] = key_reader.read_array()?;
        let session_key = decrypt_session_key(&encrypted_key, &RETAIL_KEY);

        let mut reader = BinaryReader::new_at(data, CONTAINER_HEADER_SIZE);
        let mut optional_headers = Vec::with_capacity(optional_header_count as usize);
        for _ in 0..optional_header_count {
            let id = reader.read_u32()?;
            let datum = reader.read_u32()?;
            optional_headers.push(OptionalHeader {
                id,
                kind: HeaderId::from_id(id),
                datum,
            });
        }

        let mut xex = Self {
            magic,
            module_flags,
            data_offset,
            file_header_offset,
            optional_header_count,
            file_header,
            optional_headers,
            libraries: Vec::new(),
            bound_path: None,
            compression: None,
            session_key: Some(session_key),
            image_base: 0,
            resource_dir_offset: None,
            resources: Vec::new(),
            execution_id: None,
            title: None,
            warnings: Vec::new(),
        };

        // Pass 1: decode everything except the resource directory, which
        // needs the image base that may appear later in the list.
        for index in 0..xex.optional_headers.len() {
            let header = xex.optional_headers[index];
            let Some(kind) = header.kind else { continue };
            if !kind.has_decoder() {
                continue;
            }
            if let Err(error) = xex.decode_optional(data, kind, header.datum) {
                xex.warnings.push(Warning::OptionalHeader {
                    id: header.id,
                    reason: error.to_string(),
                });
            }
        }

        // Pass 2: the resource directory alone.
        if let Some(offset) = xex.resource_dir_offset {
            match resource::parse_directory(data, offset as usize, xex.image_base) {
                Ok(resources) => xex.resources = resources,
                Err(error) => xex.warnings.push(Warning::OptionalHeader {
                    id: 0x0000_02FF,
                    reason: error.to_string(),
                }),
            }
        }

        Ok(xex)
    }

    fn decode_optional(&mut self, data: &[u8], kind: HeaderId, datum: u32) -> Result<()> {
        match kind {
            HeaderId::ExecutionId => {
                self.execution_id = Some(ExecutionId::parse(data, datum as usize)?);
            }
            HeaderId::ImageBaseAddress => {
                self.image_base = datum;
            }
            HeaderId::StaticLibraries => {
                self.libraries = LibraryVersion::parse_list(data, datum as usize)?;
            }
            HeaderId::FileFormatInfo => {
                self.compression = Some(CompressionInfo::parse(data, datum as usize)?);
            }
            HeaderId::BoundingPath => {
                self.bound_path = Some(parse_bound_path(data, datum as usize)?);
            }
            HeaderId::ResourceInfo => {
                self.resource_dir_offset = Some(datum);
            }
            _ => {}
        }
        Ok(())
    }

    /// Look up a recorded optional header by kind.
    pub fn optional_header(&self, kind: HeaderId) -> Option<&OptionalHeader> {
        self.optional_headers
            .iter()
            .find(|header| header.kind == Some(kind))
    }

    /// Entry point, when the header carries one.
    pub fn entry_point(&self) -> Option<u32> {
        self.optional_header(HeaderId::EntryPoint)
            .map(|header| header.datum)
    }
}

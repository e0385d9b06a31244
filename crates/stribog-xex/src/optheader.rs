//! Optional-header identifiers and payload decoders.
//!
//! Each optional-header entry is an (id, datum) pair; the datum is an
//! inline value or an absolute file offset depending on the identifier.
//! Whether an identifier has a decoder is a property of the identifier,
//! not of the value; unknown identifiers are preserved undecoded.

use stribog_common::BinaryReader;

use crate::{Error, Result};

/// The known optional-header identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderId {
    ResourceInfo,
    FileFormatInfo,
    BoundingPath,
    ExecutionId,
    OriginalBaseAddress,
    EntryPoint,
    ImageBaseAddress,
    ImportLibraries,
    ChecksumTimestamp,
    CallcapImports,
    FastcapEnabled,
    OriginalPeName,
    StaticLibraries,
    TlsInfo,
    DefaultStackSize,
    DefaultFsCacheSize,
    DefaultHeapSize,
    SystemFlags,
    TitleWorkspaceSize,
    GameRatings,
    LanKey,
    Xbox360Logo,
    ExportsByName,
}

impl HeaderId {
    /// Map a raw identifier to the closed enumeration.
    pub fn from_id(id: u32) -> Option<Self> {
        Some(match id {
            0x0000_02FF => Self::ResourceInfo,
            0x0000_03FF => Self::FileFormatInfo,
            0x0000_80FF => Self::BoundingPath,
            0x0004_0006 => Self::ExecutionId,
            0x0001_0001 => Self::OriginalBaseAddress,
            0x0001_0100 => Self::EntryPoint,
            0x0001_0201 => Self::ImageBaseAddress,
            0x0001_03FF => Self::ImportLibraries,
            0x0001_8002 => Self::ChecksumTimestamp,
            0x0001_8102 => Self::CallcapImports,
            0x0001_8200 => Self::FastcapEnabled,
            0x0001_83FF => Self::OriginalPeName,
            0x0002_00FF => Self::StaticLibraries,
            0x0002_0104 => Self::TlsInfo,
            0x0002_0200 => Self::DefaultStackSize,
            0x0002_0301 => Self::DefaultFsCacheSize,
            0x0002_0401 => Self::DefaultHeapSize,
            0x0003_0000 => Self::SystemFlags,
            0x0004_0201 => Self::TitleWorkspaceSize,
            0x0004_0310 => Self::GameRatings,
            0x0004_0404 => Self::LanKey,
            0x0004_05FF => Self::Xbox360Logo,
            0x00E1_0402 => Self::ExportsByName,
            _ => return None,
        })
    }

    /// True for the identifiers this parser decodes into the
    /// descriptor; the rest are recorded raw.
    pub fn has_decoder(self) -> bool {
        matches!(
            self,
            Self::ExecutionId
                | Self::ImageBaseAddress
                | Self::StaticLibraries
                | Self::ResourceInfo
                | Self::FileFormatInfo
                | Self::BoundingPath
        )
    }
}

/// The low id byte encodes the datum's size in words; 0 and 1 mean the
/// datum itself is the value, anything larger makes it a file offset.
/// The checksum/timestamp pair is the one exception: its id claims two
/// words but the datum is recorded inline.
pub fn is_inline(id: u32) -> bool {
    id == 0x0001_8002 || id & 0xFF <= 1
}

/// One optional-header entry, always preserved even when undecoded.
#[derive(Debug, Clone, Copy)]
pub struct OptionalHeader {
    pub id: u32,
    pub kind: Option<HeaderId>,
    pub datum: u32,
}

/// Execution identity of the title (id 0x00040006).
#[derive(Debug, Clone, Copy)]
pub struct ExecutionId {
    pub media_id: u32,
    pub version: u32,
    pub base_version: u32,
    pub title_id: u32,
    pub platform: u8,
    pub executable_type: u8,
    pub disc_number: u8,
    pub disc_count: u8,
    pub save_game_id: u32,
}

impl ExecutionId {
    pub(crate) fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let mut reader = BinaryReader::new_at(data, offset);
        Ok(Self {
            media_id: reader.read_u32()?,
            version: reader.read_u32()?,
            base_version: reader.read_u32()?,
            title_id: reader.read_u32()?,
            platform: reader.read_u8()?,
            executable_type: reader.read_u8()?,
            disc_number: reader.read_u8()?,
            disc_count: reader.read_u8()?,
            save_game_id: reader.read_u32()?,
        })
    }

    /// Title id in the conventional `XX-NNNN` publisher form.
    pub fn title_id_string(&self) -> String {
        let bytes = self.title_id.to_be_bytes();
        if bytes[0].is_ascii_uppercase() && bytes[1].is_ascii_alphanumeric() {
            format!(
                "{}{}-{:04}",
                bytes[0] as char,
                bytes[1] as char,
                u16::from_be_bytes([bytes[2], bytes[3]])
            )
        } else {
            format!("{:08X}", self.title_id)
        }
    }

    /// Version word decoded as major.minor.build.qfe.
    pub fn version_string(&self) -> String {
        format_version(self.version)
    }
}

fn format_version(version: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        version >> 28,
        (version >> 24) & 0xF,
        (version >> 8) & 0xFFFF,
        version & 0xFF
    )
}

/// A referenced static library (id 0x000200FF).
#[derive(Debug, Clone)]
pub struct LibraryVersion {
    /// 8-byte ASCII name, NUL padding removed.
    pub name: String,
    /// Four version words; bit 15 of the last flags "unapproved".
    pub version: [u16; 4],
}

impl LibraryVersion {
    const RECORD_SIZE: usize = 16;

    pub fn approved(&self) -> bool {
        self.version[3] & 0x8000 == 0
    }

    pub fn version_string(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.version[0],
            self.version[1],
            self.version[2],
            self.version[3] & 0x7FFF
        )
    }

    pub(crate) fn parse_list(data: &[u8], offset: usize) -> Result<Vec<Self>> {
        let mut reader = BinaryReader::new_at(data, offset);
        let total = reader.read_u32()? as usize;
        let count = total.saturating_sub(4) / Self::RECORD_SIZE;

        let mut libraries = Vec::with_capacity(count);
        for _ in 0..count {
            let name = reader.read_ascii(8)?.to_string();
            let version = [
                reader.read_u16()?,
                reader.read_u16()?,
                reader.read_u16()?,
                reader.read_u16()?,
            ];
            libraries.push(Self { name, version });
        }
        Ok(libraries)
    }
}

/// Pathname the image was bound to at link time (id 0x000080FF).
pub(crate) fn parse_bound_path(data: &[u8], offset: usize) -> Result<String> {
    let mut reader = BinaryReader::new_at(data, offset);
    let length = reader.read_u32()? as usize;
    Ok(reader.read_ascii(length)?.to_string())
}

/// How the payload is stored (id 0x000003FF).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionKind {
    Unencrypted,
    Encrypted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    Zeroed,
    Raw,
    Compressed,
    DeltaCompressed,
}

impl std::fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Zeroed => "zeroed",
            Self::Raw => "raw",
            Self::Compressed => "LZX-compressed",
            Self::DeltaCompressed => "delta-compressed",
        };
        f.write_str(name)
    }
}

/// Decoded compression/encryption parameters.
#[derive(Debug, Clone)]
pub struct CompressionInfo {
    pub encryption: EncryptionKind,
    pub compression: CompressionKind,
    /// Compression window in bytes; zero unless LZX-compressed.
    pub window_size: u32,
    /// Byte length of compressed block 0.
    pub first_block_size: u32,
    /// SHA-1 of decrypted block 0; all zero disables verification.
    pub first_block_hash: [u8; 20],
    /// The undecoded payload, kept for observability.
    pub raw: Vec<u8>,
}

impl CompressionInfo {
    pub(crate) fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let mut reader = BinaryReader::new_at(data, offset);
        let length = reader.read_u32()? as usize;
        let raw = reader.read_bytes(length)?.to_vec();

        let mut reader = BinaryReader::new(&raw);
        let encryption = match reader.read_u16()? {
            0 => EncryptionKind::Unencrypted,
            _ => EncryptionKind::Encrypted,
        };
        let compression = match reader.read_u16()? {
            0 => CompressionKind::Zeroed,
            1 => CompressionKind::Raw,
            2 => CompressionKind::Compressed,
            _ => CompressionKind::DeltaCompressed,
        };

        let (window_size, first_block_size, first_block_hash) =
            if compression == CompressionKind::Compressed {
                let window = reader.read_u32()?;
                let block = reader.read_u32()?;
                let hash = reader.read_array::<20>()?;
                (window, block, hash)
            } else {
                (0, 0, [0u8; 20])
            };

        Ok(Self {
            encryption,
            compression,
            window_size,
            first_block_size,
            first_block_hash,
            raw,
        })
    }

    /// True when block hashes should be checked against SHA-1.
    pub fn verify_hashes(&self) -> bool {
        self.first_block_hash != [0u8; 20]
    }

    /// Window exponent for the LZX decoder. Non-power-of-two windows
    /// and exponents outside [15, 21] are rejected outright.
    pub fn window_bits(&self) -> Result<u32> {
        if !self.window_size.is_power_of_two() {
            return Err(Error::InvalidWindow(self.window_size));
        }
        let bits = self.window_size.trailing_zeros();
        if !(15..=21).contains(&bits) {
            return Err(Error::InvalidWindow(self.window_size));
        }
        Ok(bits)
    }
}

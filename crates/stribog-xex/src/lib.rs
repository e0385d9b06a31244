//! XEX2 container parsing and PE image extraction.
//!
//! XEX2 is the Xbox 360 executable container: a big-endian header, a
//! list of optional headers, a file-header region holding the load
//! parameters and an AES-encrypted session key, and a payload that may
//! be AES-CBC-encrypted and LZX-compressed. This crate parses the
//! container into an immutable [`Xex`] descriptor and recovers the
//! embedded PE image byte-exactly.
//!
//! # Example
//!
//! ```no_run
//! use stribog_xex::XexFile;
//!
//! let mut file = XexFile::open("default.xex")?;
//! let extraction = file.extract()?;
//! for warning in &extraction.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! std::fs::write("default.exe", &extraction.pe)?;
//! # Ok::<(), stribog_xex::Error>(())
//! ```

mod blocks;
mod crypto;
mod error;
mod extract;
mod file;
mod flags;
mod header;
mod optheader;
mod resource;

pub use crypto::{decrypt_session_key, CbcStream, RETAIL_KEY};
pub use error::{Error, Result, Warning};
pub use extract::{extract_pe, Extraction};
pub use file::XexFile;
pub use flags::{AllowedMedia, GameRegion, ImageFlags, ModuleFlags};
pub use header::{FileHeader, Xex, XEX2_MAGIC};
pub use optheader::{
    is_inline, CompressionInfo, CompressionKind, EncryptionKind, ExecutionId, HeaderId,
    LibraryVersion, OptionalHeader,
};
pub use resource::{recover_title, resolve_resources, ResourceEntry};
pub use stribog_res::ContentKind;


#[cfg(test)]
mod tests {
    use sha1_smol::Sha1;

    use super::testutil::*;
    use super::*;

    fn compression_blob(record: &[u8]) -> Vec<u8> {
        let mut blob = Vec::new();
        blob.extend_from_slice(&(record.len() as u32).to_be_bytes());
        blob.extend_from_slice(record);
        blob
    }

    fn raw_unencrypted_record() -> Vec<u8> {
        compression_blob(&[0x00, 0x00, 0x00, 0x01])
    }

    fn compressed_record(encrypted: bool, window: u32, block_size: u32, hash: [u8; 20]) -> Vec<u8> {
        let mut record = Vec::new();
        record.extend_from_slice(&[0x00, u8::from(encrypted), 0x00, 0x02]);
        record.extend_from_slice(&window.to_be_bytes());
        record.extend_from_slice(&block_size.to_be_bytes());
        record.extend_from_slice(&hash);
        compression_blob(&record)
    }

    #[test]
    fn test_bad_magic_aborts_parse() {
        let data = [0u8; 64];
        assert!(matches!(
            Xex::parse(&data),
            Err(Error::BadMagic { actual: [0, 0, 0, 0] })
        ));
    }

    #[test]
    fn test_magic_alone_is_truncated() {
        assert!(matches!(
            Xex::parse(b"XEX2"),
            Err(Error::Common(stribog_common::Error::UnexpectedEof { .. }))
        ));
    }

    #[test]
    fn test_parse_descriptor_fields() {
        let mut exec = Vec::new();
        for word in [7u32, 0x2000_4E00, 0x2000_0000, 0x4D53_0805] {
            exec.extend_from_slice(&word.to_be_bytes());
        }
        exec.extend_from_slice(&[0, 1, 1, 2]);
        exec.extend_from_slice(&0u32.to_be_bytes());

        let mut libs = Vec::new();
        libs.extend_from_slice(&20u32.to_be_bytes());
        libs.extend_from_slice(b"XAPILIB\0");
        for word in [2u16, 0, 20871, 0] {
            libs.extend_from_slice(&word.to_be_bytes());
        }

        let mut path = Vec::new();
        path.extend_from_slice(&12u32.to_be_bytes());
        path.extend_from_slice(b"default.exe\0");

        // Scenario: encrypted LZX, 32 KiB window, verification off.
        let record = compressed_record(true, 0x8000, 0x1000, [0u8; 20]);

        let data = XexBuilder::new()
            .image_size(0x1000)
            .entry(0x0004_0006, 0x400)
            .entry(0x0002_00FF, 0x440)
            .entry(0x0000_80FF, 0x480)
            .entry(0x0000_03FF, 0x4C0)
            .entry(0x0001_0201, 0x8200_0000)
            .entry(0x0001_0100, 0x8200_1234)
            .entry(0x00FF_8877, 0xAABB_CCDD) // unknown id, preserved raw
            .blob(0x400, exec)
            .blob(0x440, libs)
            .blob(0x480, path)
            .blob(0x4C0, record)
            .build();

        let xex = Xex::parse(&data).unwrap();
        assert_eq!(&xex.magic, b"XEX2");
        assert!(xex.module_flags.contains(ModuleFlags::TITLE_MODULE));
        assert_eq!(xex.data_offset, DATA_OFFSET);
        assert_eq!(xex.optional_header_count, 7);
        assert_eq!(xex.file_header.image_size, 0x1000);
        assert_eq!(xex.file_header.load_address, LOAD_ADDRESS);
        assert!(xex.file_header.allowed_media.contains(AllowedMedia::HARD_DISK));

        let exec = xex.execution_id.unwrap();
        assert_eq!(exec.title_id_string(), "MS-2053");
        assert_eq!(exec.disc_count, 2);

        assert_eq!(xex.libraries.len(), 1);
        assert_eq!(xex.libraries[0].name, "XAPILIB");
        assert_eq!(xex.bound_path.as_deref(), Some("default.exe"));
        assert_eq!(xex.image_base, 0x8200_0000);
        assert_eq!(xex.entry_point(), Some(0x8200_1234));

        let info = xex.compression.as_ref().unwrap();
        assert_eq!(info.encryption, EncryptionKind::Encrypted);
        assert_eq!(info.compression, CompressionKind::Compressed);
        assert_eq!(info.window_bits().unwrap(), 15);
        assert_eq!(info.first_block_size, 0x1000);
        assert!(!info.verify_hashes());

        let unknown = xex
            .optional_headers
            .iter()
            .find(|h| h.id == 0x00FF_8877)
            .unwrap();
        assert_eq!(unknown.kind, None);
        assert_eq!(unknown.datum, 0xAABB_CCDD);

        assert_eq!(xex.session_key, Some(*b"stribog-test-key"));
        assert!(xex.warnings.is_empty());
    }

    #[test]
    fn test_malformed_optional_entry_is_isolated() {
        // Execution id datum points far past the end of the file; the
        // parse survives, records a warning, and decodes the rest.
        let data = XexBuilder::new()
            .entry(0x0004_0006, 0x00FF_0000)
            .entry(0x0001_0201, 0x8200_0000)
            .build();

        let xex = Xex::parse(&data).unwrap();
        assert!(xex.execution_id.is_none());
        assert_eq!(xex.image_base, 0x8200_0000);
        assert_eq!(xex.warnings.len(), 1);
        assert!(xex.warnings[0].to_string().contains("0x00040006"));
    }

    #[test]
    fn test_extract_raw_unencrypted() {
        let data = XexBuilder::new()
            .image_size(0x1000)
            .entry(0x0000_03FF, 0x400)
            .blob(0x400, raw_unencrypted_record())
            .payload(vec![0xAA; 0x1000])
            .build();

        let xex = Xex::parse(&data).unwrap();
        let extraction = extract_pe(&xex, &data).unwrap();
        assert_eq!(extraction.pe.len(), 0x1000);
        assert!(extraction.pe.iter().all(|&b| b == 0xAA));
        assert!(extraction.warnings.is_empty());
    }

    #[test]
    fn test_extract_without_compression_record_is_raw() {
        let data = XexBuilder::new()
            .image_size(16)
            .payload((0..16).collect())
            .build();

        let xex = Xex::parse(&data).unwrap();
        let extraction = extract_pe(&xex, &data).unwrap();
        assert_eq!(extraction.pe, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_extract_raw_encrypted() {
        let plain: Vec<u8> = (0..32).map(|i| i * 3).collect();
        let builder = XexBuilder::new();
        let ciphertext = cbc_encrypt(&builder.session_key, &plain);

        let data = builder
            .image_size(32)
            .entry(0x0000_03FF, 0x400)
            .blob(0x400, compression_blob(&[0x00, 0x01, 0x00, 0x01]))
            .payload(ciphertext)
            .build();

        let xex = Xex::parse(&data).unwrap();
        let extraction = extract_pe(&xex, &data).unwrap();
        assert_eq!(extraction.pe, plain);
    }

    #[test]
    fn test_extract_compressed_unencrypted() {
        let payload: Vec<u8> = (0..64).map(|i| (i * 11) as u8).collect();
        let block = single_block(&lzx_uncompressed_stream(&payload), false);

        let data = XexBuilder::new()
            .image_size(64)
            .entry(0x0000_03FF, 0x400)
            .blob(
                0x400,
                compressed_record(false, 0x8000, block.len() as u32, [0u8; 20]),
            )
            .payload(block)
            .build();

        let xex = Xex::parse(&data).unwrap();
        let extraction = extract_pe(&xex, &data).unwrap();
        assert_eq!(extraction.pe, payload);
        assert!(extraction.warnings.is_empty());
    }

    #[test]
    fn test_extract_compressed_encrypted_with_hash_verification() {
        let payload: Vec<u8> = (0..48).map(|i| (255 - i) as u8).collect();
        let builder = XexBuilder::new();

        let block = single_block(&lzx_uncompressed_stream(&payload), true);
        let hash = Sha1::from(block.as_slice()).digest().bytes();
        let encrypted = cbc_encrypt(&builder.session_key, &block);

        let data = builder
            .image_size(48)
            .entry(0x0000_03FF, 0x400)
            .blob(
                0x400,
                compressed_record(true, 0x8000, encrypted.len() as u32, hash),
            )
            .payload(encrypted)
            .build();

        let xex = Xex::parse(&data).unwrap();
        let extraction = extract_pe(&xex, &data).unwrap();
        assert_eq!(extraction.pe, payload);
        assert!(extraction.warnings.is_empty());
    }

    #[test]
    fn test_hash_mismatch_is_reported_not_fatal() {
        let payload: Vec<u8> = (0..48).collect();
        let block = single_block(&lzx_uncompressed_stream(&payload), true);
        let mut hash = Sha1::from(block.as_slice()).digest().bytes();
        hash[0] ^= 0xFF;

        let data = XexBuilder::new()
            .image_size(48)
            .entry(0x0000_03FF, 0x400)
            .blob(
                0x400,
                compressed_record(false, 0x8000, block.len() as u32, hash),
            )
            .payload(block)
            .build();

        let xex = Xex::parse(&data).unwrap();
        let extraction = extract_pe(&xex, &data).unwrap();
        assert_eq!(extraction.pe, payload);
        assert_eq!(extraction.warnings.len(), 1);
        assert!(matches!(
            extraction.warnings[0],
            Warning::HashMismatch { block: 0, .. }
        ));
    }

    #[test]
    fn test_delta_compression_refused() {
        let data = XexBuilder::new()
            .image_size(16)
            .entry(0x0000_03FF, 0x400)
            .blob(0x400, compression_blob(&[0x00, 0x00, 0x00, 0x03]))
            .payload(vec![0; 16])
            .build();

        let xex = Xex::parse(&data).unwrap();
        assert!(matches!(
            extract_pe(&xex, &data),
            Err(Error::UnsupportedCompression)
        ));
    }

    #[test]
    fn test_invalid_window_rejected() {
        let data = XexBuilder::new()
            .image_size(16)
            .entry(0x0000_03FF, 0x400)
            .blob(0x400, compressed_record(false, 0x9000, 16, [0u8; 20]))
            .payload(vec![0; 16])
            .build();

        let xex = Xex::parse(&data).unwrap();
        assert!(matches!(
            extract_pe(&xex, &data),
            Err(Error::InvalidWindow(0x9000))
        ));
    }

    #[test]
    fn test_pe_embedded_resource_resolution_and_title() {
        let xdbf = xdbf_blob("Halo");

        // Resource at image offset 0x2800, past the container's
        // physical bytes (the container ends at 0x1100).
        let mut resources = Vec::new();
        resources.extend_from_slice(&20u32.to_be_bytes());
        resources.extend_from_slice(b"4D530805");
        resources.extend_from_slice(&(0x8200_2800u32).to_be_bytes());
        resources.extend_from_slice(&(xdbf.len() as u32).to_be_bytes());

        let data = XexBuilder::new()
            .image_size(0x3000)
            .entry(0x0000_02FF, 0x440)
            .entry(0x0001_0201, 0x8200_0000)
            .blob(0x440, resources)
            .payload(vec![0u8; 0x100])
            .build();

        let mut xex = Xex::parse(&data).unwrap();
        assert_eq!(xex.resources.len(), 1);
        assert_eq!(xex.resources[0].name, "4D530805");
        assert_eq!(xex.resources[0].kind, ContentKind::PeEmbedded);
        assert!(xex.resources[0].data.is_none());

        // Decrypted image with the XDBF blob at the resource address.
        let mut pe = vec![0u8; 0x3000];
        pe[0x2800..0x2800 + xdbf.len()].copy_from_slice(&xdbf);

        resolve_resources(&mut xex, &pe);
        let entry = &xex.resources[0];
        assert!(entry.data.as_deref().is_some_and(|d| d.starts_with(b"XDBF")));

        let title = recover_title(&xex, &pe);
        assert_eq!(title.as_deref(), Some("Halo"));
    }

    #[test]
    fn test_container_resident_resource_is_classified() {
        // A resource whose image span maps inside the container's
        // physical bytes is pulled out and classified immediately.
        let mut resources = Vec::new();
        resources.extend_from_slice(&20u32.to_be_bytes());
        resources.extend_from_slice(b"icon\0\0\0\0");
        resources.extend_from_slice(&(0x8200_0800u32).to_be_bytes());
        resources.extend_from_slice(&8u32.to_be_bytes());

        let data = XexBuilder::new()
            .entry(0x0000_02FF, 0x440)
            .entry(0x0001_0201, 0x8200_0000)
            .blob(0x440, resources)
            .blob(0x800, vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
            .build();

        let xex = Xex::parse(&data).unwrap();
        let entry = &xex.resources[0];
        assert_eq!(entry.name, "icon");
        assert_eq!(entry.kind, ContentKind::Png);
        assert_eq!(entry.data.as_deref().map(|d| d.len()), Some(8));
    }
}

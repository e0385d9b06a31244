//! Bit-field decodes for the container header words.

use bitflags::bitflags;

bitflags! {
    /// Module flags from the container header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModuleFlags: u32 {
        const TITLE_MODULE = 0x01;
        const EXPORTS_TO_TITLE = 0x02;
        const SYSTEM_DEBUGGER = 0x04;
        const DLL_MODULE = 0x08;
        const MODULE_PATCH = 0x10;
        const FULL_PATCH = 0x20;
        const DELTA_PATCH = 0x40;
        const USER_MODE = 0x80;
    }
}

bitflags! {
    /// Image flags from the file header (+0x10C).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ImageFlags: u32 {
        const REVOCATION_CHECK_OPTIONAL = 0x0000_0001;
        const MANUFACTURING_UTILITY = 0x0000_0002;
        const MANUFACTURING_SUPPORT_TOOL = 0x0000_0004;
        const XGD2_MEDIA_ONLY = 0x0000_0008;
        const CARDEA_KEY = 0x0000_0100;
        const XEIKA_KEY = 0x0000_0200;
        const TITLE_USER_MODE = 0x0000_0400;
        const SYSTEM_USER_MODE = 0x0000_0800;
        const ONLINE_ACTIVATION_REQUIRED = 0x0800_0000;
        const PAGE_SIZE_4KB = 0x1000_0000;
        const REGION_FREE = 0x2000_0000;
        const REVOCATION_CHECK_REQUIRED = 0x4000_0000;
    }
}

bitflags! {
    /// Game region mask from the file header (+0x178).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GameRegion: u32 {
        const NTSC_U = 0x0000_00FF;
        const NTSC_J = 0x0000_FF00;
        const PAL = 0x00FF_0000;
        const OTHER = 0xFF00_0000;
    }
}

bitflags! {
    /// Media the image is allowed to run from (+0x17C).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AllowedMedia: u32 {
        const HARD_DISK = 0x0000_0001;
        const DVD_X2 = 0x0000_0002;
        const DVD_CD = 0x0000_0004;
        const DVD_5 = 0x0000_0008;
        const DVD_9 = 0x0000_0010;
        const SYSTEM_FLASH = 0x0000_0020;
        const MEMORY_UNIT = 0x0000_0080;
        const MASS_STORAGE = 0x0000_0100;
        const SMB_FILESYSTEM = 0x0000_0200;
        const DIRECT_FROM_RAM = 0x0000_0400;
        const INSECURE_PACKAGE = 0x0100_0000;
        const SAVE_GAME_PACKAGE = 0x0200_0000;
        const LOCALLY_SIGNED_PACKAGE = 0x0400_0000;
        const LIVE_SIGNED_PACKAGE = 0x0800_0000;
        const XBOX_PLATFORM_PACKAGE = 0x1000_0000;
    }
}

impl GameRegion {
    /// Short human-readable region summary.
    pub fn describe(&self) -> String {
        if self.bits() == u32::MAX {
            return "region free".to_string();
        }
        let mut parts = Vec::new();
        if self.intersects(Self::NTSC_U) {
            parts.push("NTSC-U");
        }
        if self.intersects(Self::NTSC_J) {
            parts.push("NTSC-J");
        }
        if self.intersects(Self::PAL) {
            parts.push("PAL");
        }
        if parts.is_empty() {
            parts.push("none");
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_describe() {
        assert_eq!(GameRegion::from_bits_retain(u32::MAX).describe(), "region free");
        assert_eq!(GameRegion::NTSC_U.describe(), "NTSC-U");
        assert_eq!(
            (GameRegion::NTSC_J | GameRegion::PAL).describe(),
            "NTSC-J, PAL"
        );
    }
}

//! Memory-mapped container access.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::extract::{extract_pe, Extraction};
use crate::resource::{recover_title, resolve_resources};
use crate::{Result, Xex};

/// An opened XEX container: the memory-mapped bytes paired with the
/// parsed descriptor.
pub struct XexFile {
    mmap: Mmap,
    xex: Xex,
}

impl XexFile {
    /// Open and parse a container from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let xex = Xex::parse(&mmap)?;
        Ok(Self { mmap, xex })
    }

    /// The parsed descriptor.
    pub fn descriptor(&self) -> &Xex {
        &self.xex
    }

    /// The raw container bytes.
    pub fn data(&self) -> &[u8] {
        &self.mmap
    }

    /// Extract the PE image and enrich the descriptor with resolved
    /// resources and the title string.
    pub fn extract(&mut self) -> Result<Extraction> {
        let extraction = extract_pe(&self.xex, &self.mmap)?;
        resolve_resources(&mut self.xex, &extraction.pe);
        if self.xex.title.is_none() {
            self.xex.title = recover_title(&self.xex, &extraction.pe);
        }
        Ok(extraction)
    }
}

impl std::fmt::Debug for XexFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XexFile")
            .field("len", &self.mmap.len())
            .field("descriptor", &self.xex)
            .finish()
    }
}

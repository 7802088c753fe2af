//! Board layout configuration.
//!
//! Fixed constants describing where bootloader-owned data lives inside a
//! partition. These are properties of the board, not negotiated with the
//! device.

use core::ops::Range;

/// NAND page size on Astro boards (4KB).
pub const ASTRO_NAND_PAGE_SIZE: usize = 4 * 1024;

/// BL2 firmware stage size on Astro boards (64KB).
pub const ASTRO_BL2_SIZE: usize = 64 * 1024;

/// Blocks of firmware metadata at the start of the Sherlock bootloader
/// partition.
pub const SHERLOCK_METADATA_BLOCKS: u64 = 1;

/// Placement of the BL2 image inside the first erase block of the
/// bootloader partition.
///
/// The first NAND page holds the page-0 boot header; BL2 follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bl2Layout {
    /// NAND page size in bytes. BL2 starts one page into the block.
    pub page_size: usize,
    /// Size of the BL2 image in bytes.
    pub bl2_size: usize,
}

impl Default for Bl2Layout {
    fn default() -> Self {
        Self::astro()
    }
}

impl Bl2Layout {
    /// Layout used by Astro.
    pub const fn astro() -> Self {
        Self {
            page_size: ASTRO_NAND_PAGE_SIZE,
            bl2_size: ASTRO_BL2_SIZE,
        }
    }

    /// Set NAND page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set BL2 image size.
    pub fn with_bl2_size(mut self, bl2_size: usize) -> Self {
        self.bl2_size = bl2_size;
        self
    }

    /// Byte range of BL2 inside the erase block, or `None` on overflow.
    pub fn window(&self) -> Option<Range<usize>> {
        let end = self.page_size.checked_add(self.bl2_size)?;
        Some(self.page_size..end)
    }

    /// Whether the window fits inside an erase block of `block_size` bytes.
    pub fn fits(&self, block_size: usize) -> bool {
        matches!(self.window(), Some(w) if w.end <= block_size)
    }
}

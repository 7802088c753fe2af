//! BL2 partition client.
//!
//! On Astro the BL2 firmware stage lives inside the first erase block of
//! the bootloader NAND partition, one page after the start. The client
//! exposes just that window. Writes must cover the whole image: a partial
//! BL2 leaves the board unbootable.

use alloc::vec;

use super::{check_buffer, PartitionClient, SkipBlockPartitionClient};
use crate::config::Bl2Layout;
use crate::error::{PartitionError, Result};
use crate::transport::skip_block::SkipBlockTransport;
use crate::transport::RawHandle;

/// Fixed-window client for the BL2 image.
pub struct Bl2PartitionClient<T: SkipBlockTransport> {
    inner: SkipBlockPartitionClient<T>,
    layout: Bl2Layout,
}

impl<T: SkipBlockTransport> Bl2PartitionClient<T> {
    /// Create a client using the Astro layout.
    pub fn new(transport: T) -> Self {
        Self::with_layout(transport, Bl2Layout::astro())
    }

    /// Create a client using a custom `layout`.
    pub fn with_layout(transport: T, layout: Bl2Layout) -> Self {
        Self {
            inner: SkipBlockPartitionClient::new(transport),
            layout,
        }
    }

    /// Layout this client was built with.
    pub fn layout(&self) -> Bl2Layout {
        self.layout
    }

    /// Get the wrapped skip-block client.
    pub fn inner(&self) -> &SkipBlockPartitionClient<T> {
        &self.inner
    }
}

impl<T: SkipBlockTransport> PartitionClient for Bl2PartitionClient<T> {
    // Not the erase block size; callers only ever move the whole image.
    fn block_size(&mut self) -> Result<usize> {
        Ok(self.layout.bl2_size)
    }

    fn partition_size(&mut self) -> Result<u64> {
        Ok(self.layout.bl2_size as u64)
    }

    /// Reads the whole erase block and copies out the BL2 window.
    ///
    /// `buffer` must hold the full image; `size` may not exceed it.
    fn read(&mut self, buffer: &mut [u8], size: usize) -> Result<()> {
        let bl2_size = self.layout.bl2_size;
        if size > bl2_size {
            log::error!("BL2 read of {} bytes exceeds image size {}", size, bl2_size);
            return Err(PartitionError::OutOfRange);
        }
        check_buffer(buffer.len(), bl2_size)?;

        let block_size = self.inner.block_size()?;
        let window = match self.layout.window() {
            Some(window) if self.layout.fits(block_size) => window,
            _ => {
                log::error!(
                    "BL2 window {:?} does not fit erase block of {} bytes",
                    self.layout,
                    block_size
                );
                return Err(PartitionError::OutOfRange);
            }
        };

        let mut full = vec![0u8; block_size];
        self.inner.read(&mut full, block_size)?;

        buffer[..bl2_size].copy_from_slice(&full[window]);
        Ok(())
    }

    fn write(&mut self, buffer: &[u8], size: usize) -> Result<()> {
        if size != self.layout.bl2_size {
            log::error!(
                "BL2 write of {} bytes rejected, image must be exactly {} bytes",
                size,
                self.layout.bl2_size
            );
            return Err(PartitionError::InvalidArgument);
        }
        self.inner
            .write_bytes(buffer, self.layout.page_size as u64, self.layout.bl2_size)
    }

    fn trim(&mut self) -> Result<()> {
        Err(PartitionError::Unsupported)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn raw_handle(&self) -> RawHandle {
        self.inner.raw_handle()
    }
}

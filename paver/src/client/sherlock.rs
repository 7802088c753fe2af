//! Sherlock bootloader partition client.
//!
//! The Sherlock bootloader partition starts with one block of metadata
//! used only by the firmware. Reads, writes and the reported size skip it.

use super::{BlockPartitionClient, PartitionClient};
use crate::config::SHERLOCK_METADATA_BLOCKS;
use crate::error::{PartitionError, Result};
use crate::transport::block::BlockTransport;
use crate::transport::RawHandle;

/// Block client for the Sherlock bootloader, offset past its metadata block.
pub struct SherlockBootloaderPartitionClient<T: BlockTransport> {
    client: BlockPartitionClient<T>,
}

impl<T: BlockTransport> SherlockBootloaderPartitionClient<T> {
    /// Create a client over `transport`.
    pub fn new(transport: T) -> Self {
        Self::from_client(BlockPartitionClient::new(transport))
    }

    /// Wrap an existing block client.
    pub fn from_client(client: BlockPartitionClient<T>) -> Self {
        Self { client }
    }

    /// Get the wrapped block client.
    pub fn inner(&self) -> &BlockPartitionClient<T> {
        &self.client
    }
}

impl<T: BlockTransport> PartitionClient for SherlockBootloaderPartitionClient<T> {
    fn block_size(&mut self) -> Result<usize> {
        self.client.block_size()
    }

    fn partition_size(&mut self) -> Result<u64> {
        let block_size = self.block_size()? as u64;
        let full_size = self.client.partition_size()?;

        block_size
            .checked_mul(SHERLOCK_METADATA_BLOCKS)
            .and_then(|metadata| full_size.checked_sub(metadata))
            .ok_or_else(|| {
                log::error!(
                    "bootloader partition of {} bytes smaller than its metadata",
                    full_size
                );
                PartitionError::OutOfRange
            })
    }

    fn read(&mut self, buffer: &mut [u8], size: usize) -> Result<()> {
        self.client.read_at(buffer, size, SHERLOCK_METADATA_BLOCKS)
    }

    fn write(&mut self, buffer: &[u8], size: usize) -> Result<()> {
        self.client.write_at(buffer, size, SHERLOCK_METADATA_BLOCKS)
    }

    fn trim(&mut self) -> Result<()> {
        self.client.trim()
    }

    fn flush(&mut self) -> Result<()> {
        self.client.flush()
    }

    fn raw_handle(&self) -> RawHandle {
        self.client.raw_handle()
    }
}

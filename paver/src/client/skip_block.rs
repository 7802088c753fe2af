//! Skip-block (NAND) partition client.

use super::{block_count, check_buffer, PartitionClient};
use crate::error::{PartitionError, Result};
use crate::transport::skip_block::{
    ReadWriteOperation, SkipBlockPartitionInfo, SkipBlockTransport, WriteBytesOperation,
};
use crate::transport::RawHandle;

/// Partition client for NAND partitions behind the skip-block service.
///
/// Reads and writes always start at erase block 0 and cover whole erase
/// blocks. [`write_bytes`](Self::write_bytes) patches a byte range without
/// disturbing the rest of the block.
pub struct SkipBlockPartitionClient<T: SkipBlockTransport> {
    /// The underlying skip-block service
    transport: T,
    /// Geometry, fetched on first use
    partition_info: Option<SkipBlockPartitionInfo>,
}

impl<T: SkipBlockTransport> SkipBlockPartitionClient<T> {
    /// Create a client over `transport`. Nothing is queried until first use.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            partition_info: None,
        }
    }

    /// Get the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn read_partition_info(&mut self) -> Result<SkipBlockPartitionInfo> {
        if let Some(info) = self.partition_info {
            return Ok(info);
        }

        let info = self.transport.partition_info().map_err(|e| {
            log::error!("Failed to get partition info: {}", e);
            PartitionError::from(e)
        })?;
        log::trace!(
            "skip-block partition geometry: {} x {} bytes",
            info.partition_block_count,
            info.block_size_bytes
        );
        self.partition_info = Some(info);
        Ok(info)
    }

    /// Validate a block-granular transfer and build its operation.
    fn operation(&mut self, buffer_len: usize, size: usize) -> Result<ReadWriteOperation> {
        let info = self.read_partition_info()?;
        let block_size = self.block_size()?;
        let count = block_count(size, block_size)?;
        check_buffer(buffer_len, size)?;

        if count > info.partition_block_count {
            log::error!(
                "transfer of {} blocks exceeds partition of {} blocks",
                count,
                info.partition_block_count
            );
            return Err(PartitionError::OutOfRange);
        }

        Ok(ReadWriteOperation {
            vmo_offset: 0,
            block: 0,
            block_count: count,
        })
    }

    /// Write `size` bytes from `buffer` at byte `offset` into the partition.
    pub fn write_bytes(&mut self, buffer: &[u8], offset: u64, size: usize) -> Result<()> {
        check_buffer(buffer.len(), size)?;
        let partition_size = self.partition_size()?;
        let end = offset
            .checked_add(size as u64)
            .ok_or(PartitionError::OutOfRange)?;
        if end > partition_size {
            log::error!(
                "write of {} bytes at {} exceeds partition of {} bytes",
                size,
                offset,
                partition_size
            );
            return Err(PartitionError::OutOfRange);
        }

        let op = WriteBytesOperation {
            vmo_offset: 0,
            offset,
            size: size as u64,
        };
        self.transport.write_bytes(&op, &buffer[..size]).map_err(|e| {
            log::error!("Error writing partition data: {}", e);
            PartitionError::from(e)
        })
    }
}

impl<T: SkipBlockTransport> PartitionClient for SkipBlockPartitionClient<T> {
    fn block_size(&mut self) -> Result<usize> {
        let info = self.read_partition_info()?;
        usize::try_from(info.block_size_bytes).map_err(|_| PartitionError::OutOfRange)
    }

    fn partition_size(&mut self) -> Result<u64> {
        let info = self.read_partition_info()?;
        info.block_size_bytes
            .checked_mul(info.partition_block_count as u64)
            .ok_or(PartitionError::OutOfRange)
    }

    fn read(&mut self, buffer: &mut [u8], size: usize) -> Result<()> {
        let op = self.operation(buffer.len(), size)?;
        self.transport.read(&op, &mut buffer[..size]).map_err(|e| {
            log::error!("Error reading partition data: {}", e);
            PartitionError::from(e)
        })
    }

    fn write(&mut self, buffer: &[u8], size: usize) -> Result<()> {
        let op = self.operation(buffer.len(), size)?;
        self.transport.write(&op, &buffer[..size]).map_err(|e| {
            log::error!("Error writing partition data: {}", e);
            PartitionError::from(e)
        })
    }

    fn trim(&mut self) -> Result<()> {
        Err(PartitionError::Unsupported)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn raw_handle(&self) -> RawHandle {
        self.transport.clone_handle()
    }
}

//! Block partition client.
//!
//! Drives a partition through the block FIFO transaction transport. Every
//! read or write attaches the caller buffer afresh; tokens are never reused
//! across operations.

use super::{block_count, check_buffer, PartitionClient};
use crate::error::{PartitionError, Result};
use crate::transport::block::{BlockBuffer, BlockInfo, BlockRequest, BlockTransport, Vmoid};
use crate::transport::RawHandle;

/// Partition client for block devices.
pub struct BlockPartitionClient<T: BlockTransport> {
    /// The underlying transport
    transport: T,
    /// Geometry, fetched on first use
    block_info: Option<BlockInfo>,
    /// Whether the fast-I/O session is open
    session_open: bool,
}

impl<T: BlockTransport> BlockPartitionClient<T> {
    /// Create a client over `transport`. Nothing is queried until first use.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            block_info: None,
            session_open: false,
        }
    }

    /// Get the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn read_block_info(&mut self) -> Result<BlockInfo> {
        if let Some(info) = self.block_info {
            return Ok(info);
        }

        let info = self.transport.info().map_err(|e| {
            log::error!("Failed to get partition info: {}", e);
            PartitionError::from(e)
        })?;
        log::trace!(
            "block partition geometry: {} x {} bytes",
            info.block_count,
            info.block_size
        );
        self.block_info = Some(info);
        Ok(info)
    }

    fn register_fast_block_io(&mut self) -> Result<()> {
        if self.session_open {
            return Ok(());
        }

        self.transport.open_session().map_err(|e| {
            log::error!("Failed to open block FIFO session: {}", e);
            PartitionError::from(e)
        })?;
        log::debug!("block FIFO session opened");
        self.session_open = true;
        Ok(())
    }

    /// Open the session and attach a buffer of `len` bytes.
    fn setup(&mut self, len: usize) -> Result<Vmoid> {
        self.register_fast_block_io()?;
        self.transport.attach_buffer(len).map_err(|e| {
            log::error!("Couldn't attach buffer: {}", e);
            PartitionError::from(e)
        })
    }

    /// Validate a transfer and return its length in blocks.
    fn prepare(&mut self, buffer_len: usize, size: usize, dev_offset: u64) -> Result<u32> {
        let info = self.read_block_info()?;
        let length = block_count(size, info.block_size as usize)?;
        check_buffer(buffer_len, size)?;

        let end = dev_offset
            .checked_add(length as u64)
            .ok_or(PartitionError::OutOfRange)?;
        if end > info.block_count {
            log::error!(
                "transfer of {} blocks at block {} exceeds partition of {} blocks",
                length,
                dev_offset,
                info.block_count
            );
            return Err(PartitionError::OutOfRange);
        }
        Ok(length)
    }

    fn release(&mut self, vmoid: Vmoid) {
        if let Err(e) = self.transport.detach_buffer(vmoid) {
            log::warn!("Couldn't detach buffer {:?}: {}", vmoid, e);
        }
    }

    /// Read `size` bytes starting `dev_offset` blocks into the partition.
    pub fn read_at(&mut self, buffer: &mut [u8], size: usize, dev_offset: u64) -> Result<()> {
        let length = self.prepare(buffer.len(), size, dev_offset)?;
        let vmoid = self.setup(buffer.len())?;

        let request = BlockRequest::read(vmoid, length, dev_offset);
        let status = self
            .transport
            .transaction(&request, BlockBuffer::Read(buffer));
        self.release(vmoid);

        status.map_err(|e| {
            log::error!("Error reading partition data: {}", e);
            PartitionError::from(e)
        })
    }

    /// Write `size` bytes starting `dev_offset` blocks into the partition.
    pub fn write_at(&mut self, buffer: &[u8], size: usize, dev_offset: u64) -> Result<()> {
        let length = self.prepare(buffer.len(), size, dev_offset)?;
        let vmoid = self.setup(buffer.len())?;

        let request = BlockRequest::write(vmoid, length, dev_offset);
        let status = self
            .transport
            .transaction(&request, BlockBuffer::Write(buffer));
        self.release(vmoid);

        status.map_err(|e| {
            log::error!("Error writing partition data: {}", e);
            PartitionError::from(e)
        })
    }
}

impl<T: BlockTransport> PartitionClient for BlockPartitionClient<T> {
    fn block_size(&mut self) -> Result<usize> {
        Ok(self.read_block_info()?.block_size as usize)
    }

    fn partition_size(&mut self) -> Result<u64> {
        let info = self.read_block_info()?;
        (info.block_size as u64)
            .checked_mul(info.block_count)
            .ok_or(PartitionError::OutOfRange)
    }

    fn read(&mut self, buffer: &mut [u8], size: usize) -> Result<()> {
        self.read_at(buffer, size, 0)
    }

    fn write(&mut self, buffer: &[u8], size: usize) -> Result<()> {
        self.write_at(buffer, size, 0)
    }

    fn trim(&mut self) -> Result<()> {
        let info = self.read_block_info()?;
        let length = u32::try_from(info.block_count).map_err(|_| {
            log::error!("partition of {} blocks too large to trim", info.block_count);
            PartitionError::OutOfRange
        })?;
        self.register_fast_block_io()?;

        self.transport
            .transaction(&BlockRequest::trim(length), BlockBuffer::None)
            .map_err(|e| {
                log::error!("Error trimming partition: {}", e);
                PartitionError::from(e)
            })
    }

    fn flush(&mut self) -> Result<()> {
        self.register_fast_block_io()?;

        self.transport
            .transaction(&BlockRequest::flush(), BlockBuffer::None)
            .map_err(|e| {
                log::error!("Error flushing partition: {}", e);
                PartitionError::from(e)
            })
    }

    fn raw_handle(&self) -> RawHandle {
        self.transport.clone_handle()
    }
}

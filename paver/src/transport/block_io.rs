//! `BlockIo` bridge for the block transaction transport.
//!
//! Lets a partition client drive any `gpt_disk_io::BlockIo` device (VirtIO-blk,
//! AHCI, an in-memory image) as if it were a FIFO transaction queue.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │        BlockPartitionClient            │
//! └───────────────────┬────────────────────┘
//!                     │ BlockTransport
//!                     ▼
//! ┌────────────────────────────────────────┐
//! │      BlockIoTransport (this)           │
//! │  vmoid bookkeeping, opcode dispatch    │
//! └───────────────────┬────────────────────┘
//!                     │ gpt_disk_io::BlockIo
//!                     ▼
//! ┌────────────────────────────────────────┐
//! │         Block device driver            │
//! └────────────────────────────────────────┘
//! ```

use alloc::vec;
use alloc::vec::Vec;

use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

use super::block::{
    BlockBuffer, BlockError, BlockInfo, BlockOpcode, BlockRequest, BlockTransport, Vmoid,
};
use super::RawHandle;

/// Synchronous [`BlockTransport`] over a `BlockIo` device.
pub struct BlockIoTransport<B: BlockIo> {
    /// The underlying block device
    device: B,
    /// Whether `open_session` has been called
    session_open: bool,
    /// Attached buffers: token and length in bytes
    attached: Vec<(Vmoid, usize)>,
    /// Where the search for the next free token starts
    next_vmoid: u16,
    /// Handle reported through `clone_handle`
    handle: RawHandle,
}

impl<B: BlockIo> BlockIoTransport<B> {
    /// Maximum bytes zeroed per trim write (64KB)
    pub const MAX_TRIM_CHUNK: usize = 64 * 1024;

    /// Create a transport over `device`.
    pub fn new(device: B) -> Self {
        Self {
            device,
            session_open: false,
            attached: Vec::new(),
            next_vmoid: 1,
            handle: RawHandle::invalid(),
        }
    }

    /// Report `handle` from `clone_handle`.
    pub fn with_handle(mut self, handle: RawHandle) -> Self {
        self.handle = handle;
        self
    }

    /// Get the underlying device.
    pub fn device(&self) -> &B {
        &self.device
    }

    /// Consume the transport and return the device.
    pub fn into_inner(self) -> B {
        self.device
    }

    /// Number of buffers currently attached.
    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    fn block_size(&self) -> usize {
        self.device.block_size().to_u32() as usize
    }

    fn attached_len(&self, vmoid: Vmoid) -> Result<usize, BlockError> {
        self.attached
            .iter()
            .find(|(v, _)| *v == vmoid)
            .map(|(_, len)| *len)
            .ok_or(BlockError::BadVmoid)
    }

    /// Check `[dev_offset, dev_offset + length)` against the device size.
    fn check_device_range(&mut self, dev_offset: u64, length: u32) -> Result<(), BlockError> {
        let num_blocks = self.device.num_blocks().map_err(|e| {
            log::error!("BlockIo: failed to query block count: {:?}", e);
            BlockError::IoError
        })?;
        let end = dev_offset
            .checked_add(length as u64)
            .ok_or(BlockError::InvalidSector)?;
        if end > num_blocks {
            return Err(BlockError::InvalidSector);
        }
        Ok(())
    }

    /// Byte range inside the attached buffer covered by `request`.
    fn buffer_range(
        &self,
        request: &BlockRequest,
        buffer_len: usize,
    ) -> Result<core::ops::Range<usize>, BlockError> {
        let attached_len = self.attached_len(request.vmoid)?;
        let block_size = self.block_size() as u64;

        let start = request
            .vmo_offset
            .checked_mul(block_size)
            .ok_or(BlockError::RequestTooLarge)?;
        let len = (request.length as u64)
            .checked_mul(block_size)
            .ok_or(BlockError::RequestTooLarge)?;
        let end = start.checked_add(len).ok_or(BlockError::RequestTooLarge)?;

        let limit = attached_len.min(buffer_len) as u64;
        if end > limit {
            return Err(BlockError::RequestTooLarge);
        }
        Ok(start as usize..end as usize)
    }

    /// Next non-zero token not currently attached, wrapping after `u16::MAX`.
    fn allocate_vmoid(&mut self) -> Option<Vmoid> {
        for _ in 0..u16::MAX {
            let candidate = Vmoid(self.next_vmoid);
            self.next_vmoid = match self.next_vmoid {
                u16::MAX => 1,
                n => n + 1,
            };
            if !self.attached.iter().any(|(v, _)| *v == candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn zero_range(&mut self, dev_offset: u64, length: u32) -> Result<(), BlockError> {
        let block_size = self.block_size();
        let blocks_per_chunk = (Self::MAX_TRIM_CHUNK / block_size).max(1) as u64;
        let zeros = vec![0u8; blocks_per_chunk as usize * block_size];

        let mut current = dev_offset;
        let mut remaining = length as u64;
        while remaining > 0 {
            let chunk_blocks = remaining.min(blocks_per_chunk);
            let chunk_bytes = chunk_blocks as usize * block_size;
            self.device
                .write_blocks(Lba(current), &zeros[..chunk_bytes])
                .map_err(|e| {
                    log::error!("BlockIo: trim failed at block {}: {:?}", current, e);
                    BlockError::IoError
                })?;
            current += chunk_blocks;
            remaining -= chunk_blocks;
        }
        Ok(())
    }
}

impl<B: BlockIo> BlockTransport for BlockIoTransport<B> {
    fn info(&mut self) -> Result<BlockInfo, BlockError> {
        let block_count = self.device.num_blocks().map_err(|e| {
            log::error!("BlockIo: failed to query block count: {:?}", e);
            BlockError::IoError
        })?;
        Ok(BlockInfo {
            block_size: self.device.block_size().to_u32(),
            block_count,
        })
    }

    fn open_session(&mut self) -> Result<(), BlockError> {
        self.session_open = true;
        Ok(())
    }

    fn attach_buffer(&mut self, len: usize) -> Result<Vmoid, BlockError> {
        if !self.session_open {
            return Err(BlockError::DeviceNotReady);
        }
        let vmoid = self.allocate_vmoid().ok_or(BlockError::QueueFull)?;
        self.attached.push((vmoid, len));
        Ok(vmoid)
    }

    fn detach_buffer(&mut self, vmoid: Vmoid) -> Result<(), BlockError> {
        let before = self.attached.len();
        self.attached.retain(|(v, _)| *v != vmoid);
        if self.attached.len() == before {
            return Err(BlockError::BadVmoid);
        }
        Ok(())
    }

    fn transaction(
        &mut self,
        request: &BlockRequest,
        buffer: BlockBuffer<'_>,
    ) -> Result<(), BlockError> {
        if !self.session_open {
            return Err(BlockError::DeviceNotReady);
        }

        match (request.opcode, buffer) {
            (BlockOpcode::Read, BlockBuffer::Read(dst)) => {
                let range = self.buffer_range(request, dst.len())?;
                self.check_device_range(request.dev_offset, request.length)?;
                self.device
                    .read_blocks(Lba(request.dev_offset), &mut dst[range])
                    .map_err(|e| {
                        log::error!(
                            "BlockIo: read at block {} failed: {:?}",
                            request.dev_offset,
                            e
                        );
                        BlockError::IoError
                    })
            }
            (BlockOpcode::Write, BlockBuffer::Write(src)) => {
                let range = self.buffer_range(request, src.len())?;
                self.check_device_range(request.dev_offset, request.length)?;
                self.device
                    .write_blocks(Lba(request.dev_offset), &src[range])
                    .map_err(|e| {
                        log::error!(
                            "BlockIo: write at block {} failed: {:?}",
                            request.dev_offset,
                            e
                        );
                        BlockError::IoError
                    })
            }
            (BlockOpcode::Trim, BlockBuffer::None) => {
                self.check_device_range(request.dev_offset, request.length)?;
                self.zero_range(request.dev_offset, request.length)
            }
            (BlockOpcode::Flush, BlockBuffer::None) => self.device.flush().map_err(|e| {
                log::error!("BlockIo: flush failed: {:?}", e);
                BlockError::IoError
            }),
            _ => Err(BlockError::BadVmoid),
        }
    }

    fn clone_handle(&self) -> RawHandle {
        self.handle
    }
}

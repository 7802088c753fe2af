//! Partition clients
//!
//! A partition client binds to one physical or logical partition and gives
//! the update driver a uniform way to size, read, write, trim and flush it.
//!
//! # Adapters
//!
//! ```text
//! PartitionCopyClient ──▶ [Box<dyn PartitionClient>; N]
//!
//! SherlockBootloaderPartitionClient ──▶ BlockPartitionClient ──▶ BlockTransport
//! Bl2PartitionClient ──────────────────▶ SkipBlockPartitionClient ──▶ SkipBlockTransport
//! AstroSysconfigPartitionClientBuffered ──▶ PartitionerContext ──▶ SysconfigTransport
//! SysconfigPartitionClient ──────────────────────────────────────▶ SysconfigTransport
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut client: Box<dyn PartitionClient> = Box::new(BlockPartitionClient::new(transport));
//!
//! let size = client.partition_size()?;
//! client.write(&image, image.len())?;
//! client.flush()?;
//! ```

mod bl2;
mod block;
mod copy;
mod sherlock;
mod skip_block;
mod sysconfig;

pub use bl2::Bl2PartitionClient;
pub use block::BlockPartitionClient;
pub use copy::PartitionCopyClient;
pub use sherlock::SherlockBootloaderPartitionClient;
pub use skip_block::SkipBlockPartitionClient;
pub use sysconfig::{
    AstroPartitionerContext, AstroSysconfigPartitionClientBuffered, SysconfigPartitionClient,
};

use crate::error::{PartitionError, Result};
use crate::transport::RawHandle;

/// Common contract for every partition adapter.
///
/// Each call runs to completion before returning. `buffer` is borrowed for
/// the duration of the call only; `size` is the number of bytes to move and
/// must not exceed `buffer.len()`.
pub trait PartitionClient {
    /// I/O granularity in bytes.
    fn block_size(&mut self) -> Result<usize>;

    /// Logical byte length addressable through this client.
    fn partition_size(&mut self) -> Result<u64>;

    /// Read `size` bytes from the start of the partition into `buffer`.
    fn read(&mut self, buffer: &mut [u8], size: usize) -> Result<()>;

    /// Write `size` bytes from `buffer` to the start of the partition.
    fn write(&mut self, buffer: &[u8], size: usize) -> Result<()>;

    /// Discard the whole partition.
    fn trim(&mut self) -> Result<()>;

    /// Force buffered writes to stable storage.
    fn flush(&mut self) -> Result<()>;

    /// Device handle for legacy access, or [`RawHandle::invalid()`].
    fn raw_handle(&self) -> RawHandle;
}

/// Reject a `size` larger than the caller's buffer.
pub(crate) fn check_buffer(buffer_len: usize, size: usize) -> Result<()> {
    if size > buffer_len {
        log::error!(
            "transfer of {} bytes exceeds {}-byte buffer",
            size,
            buffer_len
        );
        return Err(PartitionError::OutOfRange);
    }
    Ok(())
}

/// Convert a byte size into a block count for a 32-bit transport field.
///
/// Sizes that are not a whole number of blocks are rejected instead of
/// silently dropping the tail.
pub(crate) fn block_count(size: usize, block_size: usize) -> Result<u32> {
    if block_size == 0 {
        log::error!("device reported a zero block size");
        return Err(PartitionError::Io);
    }
    if size % block_size != 0 {
        log::error!(
            "size {} is not a multiple of block size {}",
            size,
            block_size
        );
        return Err(PartitionError::InvalidArgument);
    }
    u32::try_from(size / block_size).map_err(|_| {
        log::error!("size {} too large for a single transfer", size);
        PartitionError::OutOfRange
    })
}

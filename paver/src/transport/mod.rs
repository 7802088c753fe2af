//! Transports consumed by the partition clients.
//!
//! These are the services a partition client drives. None of them are
//! implemented here except [`BlockIoTransport`], which lets any
//! `gpt_disk_io::BlockIo` device stand in for a block transaction queue.

pub mod block;
pub mod block_io;
pub mod skip_block;
pub mod sysconfig;

pub use block::{
    BlockBuffer, BlockError, BlockInfo, BlockOpcode, BlockRequest, BlockTransport, Vmoid,
};
pub use block_io::BlockIoTransport;
pub use skip_block::{
    ReadWriteOperation, SkipBlockError, SkipBlockPartitionInfo, SkipBlockTransport,
    WriteBytesOperation,
};
pub use sysconfig::{SysconfigError, SysconfigPartition, SysconfigTransport};

/// Raw device handle for legacy POSIX-style access.
///
/// Partition clients that have no such handle return
/// [`RawHandle::invalid()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawHandle(Option<u64>);

impl RawHandle {
    /// Wrap a valid raw handle.
    pub const fn new(raw: u64) -> Self {
        Self(Some(raw))
    }

    /// Handle for clients with no legacy access.
    pub const fn invalid() -> Self {
        Self(None)
    }

    /// Whether this carries a real handle.
    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    /// The raw value, if any.
    pub fn get(&self) -> Option<u64> {
        self.0
    }
}

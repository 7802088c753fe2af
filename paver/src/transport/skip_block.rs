//! Skip-block (NAND) transport definitions.
//!
//! NAND partitions are addressed by erase block, not by byte offset. The
//! service underneath skips bad blocks transparently, which is where the
//! name comes from.

use super::RawHandle;

/// Skip-block service error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipBlockError {
    /// NAND I/O failed.
    IoError,
    /// Ran out of good blocks while skipping bad ones.
    BadBlock,
    /// Block range or byte range beyond the partition.
    OutOfRange,
    /// Malformed operation.
    InvalidArgs,
    /// Partition not present on this device.
    NoPartition,
}

impl core::fmt::Display for SkipBlockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IoError => write!(f, "NAND I/O error"),
            Self::BadBlock => write!(f, "No good blocks left"),
            Self::OutOfRange => write!(f, "Range beyond partition"),
            Self::InvalidArgs => write!(f, "Invalid operation"),
            Self::NoPartition => write!(f, "Partition not found"),
        }
    }
}

/// Skip-block partition geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipBlockPartitionInfo {
    /// Erase block size in bytes
    pub block_size_bytes: u64,
    /// Number of erase blocks in the partition
    pub partition_block_count: u32,
}

/// Block-granular read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadWriteOperation {
    /// Byte offset into the caller buffer
    pub vmo_offset: u64,
    /// First erase block
    pub block: u32,
    /// Number of erase blocks
    pub block_count: u32,
}

/// Byte-granular write.
///
/// The service reads the affected erase blocks, patches
/// `[offset, offset + size)` and writes them back, leaving the rest of the
/// block intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteBytesOperation {
    /// Byte offset into the caller buffer
    pub vmo_offset: u64,
    /// Byte offset into the partition
    pub offset: u64,
    /// Bytes to write
    pub size: u64,
}

/// Skip-block service.
pub trait SkipBlockTransport {
    /// Query partition geometry.
    fn partition_info(&mut self) -> Result<SkipBlockPartitionInfo, SkipBlockError>;

    /// Read whole erase blocks into `dst`.
    fn read(&mut self, op: &ReadWriteOperation, dst: &mut [u8]) -> Result<(), SkipBlockError>;

    /// Erase and program whole blocks from `src`.
    fn write(&mut self, op: &ReadWriteOperation, src: &[u8]) -> Result<(), SkipBlockError>;

    /// Patch a byte range inside the partition from `src`.
    fn write_bytes(&mut self, op: &WriteBytesOperation, src: &[u8]) -> Result<(), SkipBlockError>;

    /// Duplicate the underlying device handle, if there is one.
    fn clone_handle(&self) -> RawHandle {
        RawHandle::invalid()
    }
}

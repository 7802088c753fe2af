//! Sysconfig sync client definitions.
//!
//! The sysconfig NAND partition is carved into fixed sub-partitions
//! (sysconfig data, A/B/R metadata, verified boot metadata). The sync
//! client reads and writes one whole sub-partition at a time.

/// Sysconfig client error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysconfigError {
    IoError,
    OutOfRange,
    InvalidArgs,
    NotSupported,
}

impl core::fmt::Display for SysconfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IoError => write!(f, "Sysconfig I/O error"),
            Self::OutOfRange => write!(f, "Sysconfig range error"),
            Self::InvalidArgs => write!(f, "Invalid sysconfig request"),
            Self::NotSupported => write!(f, "Sysconfig operation not supported"),
        }
    }
}

/// Sub-partitions of the sysconfig partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysconfigPartition {
    Sysconfig,
    AbrMetadata,
    VerifiedBootMetadataA,
    VerifiedBootMetadataB,
    VerifiedBootMetadataR,
}

impl SysconfigPartition {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sysconfig => "sysconfig",
            Self::AbrMetadata => "abr-metadata",
            Self::VerifiedBootMetadataA => "vbmeta-a",
            Self::VerifiedBootMetadataB => "vbmeta-b",
            Self::VerifiedBootMetadataR => "vbmeta-r",
        }
    }
}

/// Sysconfig sync client.
///
/// Buffered implementations keep writes in memory until [`flush`](Self::flush).
pub trait SysconfigTransport {
    /// Size in bytes of one sub-partition.
    fn partition_size(&mut self, partition: SysconfigPartition) -> Result<usize, SysconfigError>;

    /// Read the whole sub-partition into `dst`.
    fn read_partition(
        &mut self,
        partition: SysconfigPartition,
        dst: &mut [u8],
    ) -> Result<(), SysconfigError>;

    /// Replace the whole sub-partition with `src`.
    fn write_partition(
        &mut self,
        partition: SysconfigPartition,
        src: &[u8],
    ) -> Result<(), SysconfigError>;

    /// Commit buffered writes.
    fn flush(&mut self) -> Result<(), SysconfigError> {
        Ok(())
    }
}

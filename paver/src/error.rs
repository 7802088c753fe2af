//! Partition client error types
//!
//! Every partition client reports failures through [`PartitionError`].
//! Transport-level errors (`BlockError`, `SkipBlockError`,
//! `SysconfigError`) convert into it so adapters can use `?` directly.

use thiserror::Error;

use crate::transport::block::BlockError;
use crate::transport::skip_block::SkipBlockError;
use crate::transport::sysconfig::SysconfigError;

/// Errors returned by partition client operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PartitionError {
    /// Transport or hardware failure (possibly transient)
    #[error("partition I/O failed")]
    Io,
    /// Request exceeds capacity or overflows address arithmetic
    #[error("request out of range")]
    OutOfRange,
    /// Size or argument rejected by the adapter
    #[error("invalid argument")]
    InvalidArgument,
    /// Operation is not meaningful for this device class
    #[error("operation not supported")]
    Unsupported,
    /// Geometry, context or handle unavailable
    #[error("not found")]
    NotFound,
}

impl PartitionError {
    /// Get a human-readable description of the error
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Io => "Partition I/O operation failed",
            Self::OutOfRange => "Request exceeds partition capacity",
            Self::InvalidArgument => "Request size or argument rejected",
            Self::Unsupported => "Operation not supported by this partition",
            Self::NotFound => "Partition resource not found",
        }
    }
}

/// Result type for partition client operations.
pub type Result<T> = core::result::Result<T, PartitionError>;

impl From<BlockError> for PartitionError {
    fn from(e: BlockError) -> Self {
        match e {
            BlockError::IoError | BlockError::DeviceNotReady | BlockError::QueueFull => {
                PartitionError::Io
            }
            BlockError::InvalidSector | BlockError::RequestTooLarge => PartitionError::OutOfRange,
            BlockError::BadVmoid => PartitionError::InvalidArgument,
            BlockError::ReadOnly | BlockError::Unsupported => PartitionError::Unsupported,
            BlockError::NoDevice => PartitionError::NotFound,
        }
    }
}

impl From<SkipBlockError> for PartitionError {
    fn from(e: SkipBlockError) -> Self {
        match e {
            SkipBlockError::IoError | SkipBlockError::BadBlock => PartitionError::Io,
            SkipBlockError::OutOfRange => PartitionError::OutOfRange,
            SkipBlockError::InvalidArgs => PartitionError::InvalidArgument,
            SkipBlockError::NoPartition => PartitionError::NotFound,
        }
    }
}

impl From<SysconfigError> for PartitionError {
    fn from(e: SysconfigError) -> Self {
        match e {
            SysconfigError::IoError => PartitionError::Io,
            SysconfigError::OutOfRange => PartitionError::OutOfRange,
            SysconfigError::InvalidArgs => PartitionError::InvalidArgument,
            SysconfigError::NotSupported => PartitionError::Unsupported,
        }
    }
}

//! Block transaction transport definitions.
//!
//! Defines the interface for block devices driven through a FIFO
//! transaction queue. Partition clients attach a caller buffer, receive a
//! [`Vmoid`] token and submit [`BlockRequest`]s that run to completion.

use super::RawHandle;

/// Block transport error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// Request queue is full.
    QueueFull,
    /// Device not ready.
    DeviceNotReady,
    /// I/O error from device.
    IoError,
    /// Invalid sector number.
    InvalidSector,
    /// Request too large.
    RequestTooLarge,
    /// Device is read-only.
    ReadOnly,
    /// Unsupported operation.
    Unsupported,
    /// Request references a buffer token that is not attached.
    BadVmoid,
    /// No device bound to this transport.
    NoDevice,
}

impl core::fmt::Display for BlockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::QueueFull => write!(f, "Request queue full"),
            Self::DeviceNotReady => write!(f, "Block device not ready"),
            Self::IoError => write!(f, "Block I/O error"),
            Self::InvalidSector => write!(f, "Invalid sector"),
            Self::RequestTooLarge => write!(f, "Request too large"),
            Self::ReadOnly => write!(f, "Device is read-only"),
            Self::Unsupported => write!(f, "Unsupported operation"),
            Self::BadVmoid => write!(f, "Buffer token not attached"),
            Self::NoDevice => write!(f, "No block device"),
        }
    }
}

/// Buffer registration token handed out by [`BlockTransport::attach_buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vmoid(pub u16);

impl Vmoid {
    /// Token carried by requests that move no data (trim, flush).
    pub const INVALID: Vmoid = Vmoid(0);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

/// Transaction opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOpcode {
    Read,
    Write,
    Trim,
    Flush,
}

/// A single FIFO transaction.
///
/// `length`, `vmo_offset` and `dev_offset` are all in blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRequest {
    /// Transaction group (always 0, requests are never batched)
    pub group: u16,
    /// Attached buffer, or [`Vmoid::INVALID`]
    pub vmoid: Vmoid,
    pub opcode: BlockOpcode,
    /// Number of blocks
    pub length: u32,
    /// Block offset into the attached buffer
    pub vmo_offset: u64,
    /// Block offset on the device
    pub dev_offset: u64,
}

impl BlockRequest {
    /// Read `length` blocks at `dev_offset` into the buffer behind `vmoid`.
    pub const fn read(vmoid: Vmoid, length: u32, dev_offset: u64) -> Self {
        Self {
            group: 0,
            vmoid,
            opcode: BlockOpcode::Read,
            length,
            vmo_offset: 0,
            dev_offset,
        }
    }

    /// Write `length` blocks from the buffer behind `vmoid` to `dev_offset`.
    pub const fn write(vmoid: Vmoid, length: u32, dev_offset: u64) -> Self {
        Self {
            group: 0,
            vmoid,
            opcode: BlockOpcode::Write,
            length,
            vmo_offset: 0,
            dev_offset,
        }
    }

    /// Discard `length` blocks starting at block 0.
    pub const fn trim(length: u32) -> Self {
        Self {
            group: 0,
            vmoid: Vmoid::INVALID,
            opcode: BlockOpcode::Trim,
            length,
            vmo_offset: 0,
            dev_offset: 0,
        }
    }

    /// Zero-length flush.
    pub const fn flush() -> Self {
        Self {
            group: 0,
            vmoid: Vmoid::INVALID,
            opcode: BlockOpcode::Flush,
            length: 0,
            vmo_offset: 0,
            dev_offset: 0,
        }
    }
}

/// Data side of a transaction.
///
/// Stands in for the memory behind a [`Vmoid`] for the duration of one
/// [`BlockTransport::transaction`] call.
#[derive(Debug)]
pub enum BlockBuffer<'a> {
    /// Trim and flush carry no data.
    None,
    /// Destination of a read.
    Read(&'a mut [u8]),
    /// Source of a write.
    Write(&'a [u8]),
}

/// Block device geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Logical block size in bytes
    pub block_size: u32,
    /// Total blocks in the partition
    pub block_count: u64,
}

/// Block transaction transport.
///
/// Owned by the OS; partition clients only drive it. Every transaction is
/// synchronous: it either lands completely or returns an error.
pub trait BlockTransport {
    /// Query partition geometry.
    fn info(&mut self) -> Result<BlockInfo, BlockError>;

    /// Open the fast-I/O FIFO session.
    ///
    /// Callers open it once per client; a transport may treat repeated
    /// calls as a no-op.
    fn open_session(&mut self) -> Result<(), BlockError>;

    /// Register a buffer of `len` bytes and return a fresh token for it.
    fn attach_buffer(&mut self, len: usize) -> Result<Vmoid, BlockError>;

    /// Release a token returned by [`attach_buffer`](Self::attach_buffer).
    fn detach_buffer(&mut self, vmoid: Vmoid) -> Result<(), BlockError> {
        let _ = vmoid;
        Ok(())
    }

    /// Run one transaction to completion.
    fn transaction(
        &mut self,
        request: &BlockRequest,
        buffer: BlockBuffer<'_>,
    ) -> Result<(), BlockError>;

    /// Duplicate the underlying device handle, if there is one.
    fn clone_handle(&self) -> RawHandle {
        RawHandle::invalid()
    }
}

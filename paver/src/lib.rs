//! Morpheus Paver
//!
//! Partition clients used while paving firmware images onto a device.
//! Each client hides how one partition class is reached (block FIFO, NAND
//! skip-block, sysconfig sync client) behind [`PartitionClient`], so the
//! update driver can size, read, write, trim and flush any of them the same
//! way.
//!
//! Designed to be no_std compatible; requires `alloc`.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod logger;
pub mod transport;

pub use client::{
    AstroPartitionerContext, AstroSysconfigPartitionClientBuffered, Bl2PartitionClient,
    BlockPartitionClient, PartitionClient, PartitionCopyClient, SherlockBootloaderPartitionClient,
    SkipBlockPartitionClient, SysconfigPartitionClient,
};
pub use config::Bl2Layout;
pub use context::PartitionerContext;
pub use error::{PartitionError, Result};
pub use transport::RawHandle;

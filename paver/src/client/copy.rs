//! Redundant copy client.
//!
//! Presents several copies of the same partition as one. Reads succeed if
//! any copy can be read; writes succeed if any copy took the data. A copy
//! that failed a write is trimmed so a later read cannot return stale data
//! from it.

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::PartitionClient;
use crate::error::{PartitionError, Result};
use crate::transport::RawHandle;

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Least common multiple, `None` on overflow. A zero operand yields 0.
fn lcm(a: usize, b: usize) -> Option<usize> {
    if a == 0 || b == 0 {
        return Some(0);
    }
    (a / gcd(a, b)).checked_mul(b)
}

/// Partition client over an ordered set of redundant copies.
pub struct PartitionCopyClient {
    partitions: Vec<Box<dyn PartitionClient>>,
}

impl PartitionCopyClient {
    /// Build a copy client. The set must not be empty.
    pub fn new(partitions: Vec<Box<dyn PartitionClient>>) -> Result<Self> {
        if partitions.is_empty() {
            log::error!("copy client needs at least one partition");
            return Err(PartitionError::InvalidArgument);
        }
        Ok(Self { partitions })
    }

    /// Number of copies.
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Always false once built.
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

impl PartitionClient for PartitionCopyClient {
    fn block_size(&mut self) -> Result<usize> {
        let mut result = 1usize;
        for (index, partition) in self.partitions.iter_mut().enumerate() {
            match partition.block_size() {
                Ok(size) => {
                    result = lcm(result, size).ok_or_else(|| {
                        log::error!("block size LCM overflows at copy {}", index);
                        PartitionError::OutOfRange
                    })?;
                }
                Err(e) => log::debug!("copy {} has no block size: {}", index, e),
            }
        }

        if result <= 1 {
            log::error!("no copy reported a usable block size");
            return Err(PartitionError::Io);
        }
        Ok(result)
    }

    fn partition_size(&mut self) -> Result<u64> {
        let mut result: Option<u64> = None;
        for (index, partition) in self.partitions.iter_mut().enumerate() {
            match partition.partition_size() {
                Ok(size) => result = Some(result.map_or(size, |min| min.min(size))),
                Err(e) => log::debug!("copy {} has no partition size: {}", index, e),
            }
        }

        result.ok_or_else(|| {
            log::error!("no copy reported a partition size");
            PartitionError::Io
        })
    }

    fn read(&mut self, buffer: &mut [u8], size: usize) -> Result<()> {
        for (index, partition) in self.partitions.iter_mut().enumerate() {
            match partition.read(buffer, size) {
                Ok(()) => return Ok(()),
                Err(e) => log::warn!("read from copy {} failed: {}", index, e),
            }
        }

        log::error!("read failed on every copy");
        Err(PartitionError::Io)
    }

    fn write(&mut self, buffer: &[u8], size: usize) -> Result<()> {
        let mut written = 0usize;
        for (index, partition) in self.partitions.iter_mut().enumerate() {
            match partition.write(buffer, size) {
                Ok(()) => written += 1,
                Err(e) => {
                    log::warn!("write to copy {} failed: {}", index, e);
                    if let Err(e) = partition.trim() {
                        log::warn!("trim of failed copy {} also failed: {}", index, e);
                    }
                }
            }
        }

        if written == 0 {
            log::error!("write failed on every copy");
            return Err(PartitionError::Io);
        }
        log::debug!("wrote {} of {} copies", written, self.partitions.len());
        Ok(())
    }

    fn trim(&mut self) -> Result<()> {
        for partition in self.partitions.iter_mut() {
            partition.trim()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for partition in self.partitions.iter_mut() {
            partition.flush()?;
        }
        Ok(())
    }

    fn raw_handle(&self) -> RawHandle {
        RawHandle::invalid()
    }
}

//! Sysconfig partition clients.
//!
//! Each sysconfig sub-partition is moved as a whole: reads fetch the full
//! sub-partition and writes must replace it exactly.

use super::{check_buffer, PartitionClient};
use crate::context::PartitionerContext;
use crate::error::{PartitionError, Result};
use crate::transport::sysconfig::{SysconfigPartition, SysconfigTransport};
use crate::transport::RawHandle;

/// Sub-partition size, queried from `client` only on first use.
fn sub_partition_size<S: SysconfigTransport>(
    client: &mut S,
    partition: SysconfigPartition,
    cache: &mut Option<usize>,
) -> Result<usize> {
    if let Some(size) = *cache {
        return Ok(size);
    }

    let size = client.partition_size(partition).map_err(|e| {
        log::error!("Failed to get {} partition size: {}", partition.name(), e);
        PartitionError::from(e)
    })?;
    log::trace!("{} partition is {} bytes", partition.name(), size);
    *cache = Some(size);
    Ok(size)
}

fn read_sub_partition<S: SysconfigTransport>(
    client: &mut S,
    partition: SysconfigPartition,
    cache: &mut Option<usize>,
    buffer: &mut [u8],
    size: usize,
) -> Result<()> {
    check_buffer(buffer.len(), size)?;
    let partition_size = sub_partition_size(client, partition, cache)?;
    if size > partition_size {
        log::error!(
            "read of {} bytes exceeds {} partition of {} bytes",
            size,
            partition.name(),
            partition_size
        );
        return Err(PartitionError::OutOfRange);
    }
    check_buffer(buffer.len(), partition_size)?;

    client
        .read_partition(partition, &mut buffer[..partition_size])
        .map_err(|e| {
            log::error!("Failed to read {} partition: {}", partition.name(), e);
            PartitionError::from(e)
        })
}

fn write_sub_partition<S: SysconfigTransport>(
    client: &mut S,
    partition: SysconfigPartition,
    cache: &mut Option<usize>,
    buffer: &[u8],
    size: usize,
) -> Result<()> {
    check_buffer(buffer.len(), size)?;
    let partition_size = sub_partition_size(client, partition, cache)?;
    if size != partition_size {
        log::error!(
            "write of {} bytes rejected, {} partition is {} bytes",
            size,
            partition.name(),
            partition_size
        );
        return Err(PartitionError::InvalidArgument);
    }

    client
        .write_partition(partition, &buffer[..size])
        .map_err(|e| {
            log::error!("Failed to write {} partition: {}", partition.name(), e);
            PartitionError::from(e)
        })
}

/// Client for one sysconfig sub-partition over a directly owned sync client.
pub struct SysconfigPartitionClient<S: SysconfigTransport> {
    client: S,
    partition: SysconfigPartition,
    /// Sub-partition size, fetched on first use
    partition_size: Option<usize>,
}

impl<S: SysconfigTransport> SysconfigPartitionClient<S> {
    /// Create a client for `partition` over `client`.
    pub fn new(client: S, partition: SysconfigPartition) -> Self {
        Self {
            client,
            partition,
            partition_size: None,
        }
    }

    /// Sub-partition this client is bound to.
    pub fn partition(&self) -> SysconfigPartition {
        self.partition
    }

    /// Get the underlying sync client.
    pub fn client(&self) -> &S {
        &self.client
    }
}

impl<S: SysconfigTransport> PartitionClient for SysconfigPartitionClient<S> {
    fn block_size(&mut self) -> Result<usize> {
        sub_partition_size(&mut self.client, self.partition, &mut self.partition_size)
    }

    fn partition_size(&mut self) -> Result<u64> {
        Ok(self.block_size()? as u64)
    }

    fn read(&mut self, buffer: &mut [u8], size: usize) -> Result<()> {
        read_sub_partition(
            &mut self.client,
            self.partition,
            &mut self.partition_size,
            buffer,
            size,
        )
    }

    fn write(&mut self, buffer: &[u8], size: usize) -> Result<()> {
        write_sub_partition(
            &mut self.client,
            self.partition,
            &mut self.partition_size,
            buffer,
            size,
        )
    }

    fn trim(&mut self) -> Result<()> {
        Err(PartitionError::Unsupported)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn raw_handle(&self) -> RawHandle {
        RawHandle::invalid()
    }
}

/// State shared by every Astro sysconfig client.
///
/// The Astro sync client buffers writes for all sub-partitions and must
/// only be driven by one caller at a time.
pub struct AstroPartitionerContext<S: SysconfigTransport> {
    pub client: S,
}

impl<S: SysconfigTransport> AstroPartitionerContext<S> {
    /// Wrap the shared sync client.
    pub fn new(client: S) -> Self {
        Self { client }
    }
}

/// Client for one sysconfig sub-partition over the shared buffered client.
///
/// Every operation, including the size check a write makes, happens inside
/// a single [`PartitionerContext::call`].
pub struct AstroSysconfigPartitionClientBuffered<S: SysconfigTransport> {
    context: PartitionerContext<AstroPartitionerContext<S>>,
    partition: SysconfigPartition,
    /// Sub-partition size, fetched on first use
    partition_size: Option<usize>,
}

impl<S: SysconfigTransport> AstroSysconfigPartitionClientBuffered<S> {
    /// Create a client for `partition` on the shared `context`.
    pub fn new(
        context: PartitionerContext<AstroPartitionerContext<S>>,
        partition: SysconfigPartition,
    ) -> Self {
        Self {
            context,
            partition,
            partition_size: None,
        }
    }

    /// Sub-partition this client is bound to.
    pub fn partition(&self) -> SysconfigPartition {
        self.partition
    }
}

impl<S: SysconfigTransport> PartitionClient for AstroSysconfigPartitionClientBuffered<S> {
    fn block_size(&mut self) -> Result<usize> {
        let partition = self.partition;
        let cache = &mut self.partition_size;
        self.context
            .call(|ctx| sub_partition_size(&mut ctx.client, partition, cache))
    }

    fn partition_size(&mut self) -> Result<u64> {
        Ok(self.block_size()? as u64)
    }

    fn read(&mut self, buffer: &mut [u8], size: usize) -> Result<()> {
        let partition = self.partition;
        let cache = &mut self.partition_size;
        self.context
            .call(|ctx| read_sub_partition(&mut ctx.client, partition, cache, buffer, size))
    }

    fn write(&mut self, buffer: &[u8], size: usize) -> Result<()> {
        let partition = self.partition;
        let cache = &mut self.partition_size;
        self.context
            .call(|ctx| write_sub_partition(&mut ctx.client, partition, cache, buffer, size))
    }

    fn trim(&mut self) -> Result<()> {
        Err(PartitionError::Unsupported)
    }

    fn flush(&mut self) -> Result<()> {
        let partition = self.partition;
        self.context.call(|ctx| {
            ctx.client.flush().map_err(|e| {
                log::error!("Failed to flush {} partition: {}", partition.name(), e);
                PartitionError::from(e)
            })
        })
    }

    fn raw_handle(&self) -> RawHandle {
        RawHandle::invalid()
    }
}

//! Common test utilities and mock transports

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

use morpheus_paver::transport::{
    BlockBuffer, BlockError, BlockInfo, BlockOpcode, BlockRequest, BlockTransport,
    ReadWriteOperation, SkipBlockError, SkipBlockPartitionInfo, SkipBlockTransport,
    SysconfigError, SysconfigPartition, SysconfigTransport, Vmoid, WriteBytesOperation,
};
use morpheus_paver::{PartitionClient, PartitionError, RawHandle, Result};

/// Fill `len` bytes with a recognisable pattern.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

// ---------------------------------------------------------------------------
// Block transport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockCall {
    Info,
    OpenSession,
    Attach(usize),
    Detach(Vmoid),
    Transaction(BlockRequest),
}

pub struct BlockState {
    pub block_size: u32,
    pub block_count: u64,
    pub data: Vec<u8>,
    pub calls: Vec<BlockCall>,
    pub fail_info: Option<BlockError>,
    pub fail_transaction: Option<BlockError>,
    pub handle: RawHandle,
    next_vmoid: u16,
}

/// Scripted in-memory block FIFO transport.
///
/// Clones share state, so a test can keep one to inspect the call log
/// after moving the other into a client.
#[derive(Clone)]
pub struct MockBlockTransport {
    pub state: Rc<RefCell<BlockState>>,
}

impl MockBlockTransport {
    /// Transport over a zero-filled device of `block_count` blocks.
    pub fn new(block_size: u32, block_count: u64) -> Self {
        let len = block_size as u64 * block_count;
        // Huge geometries are only used to exercise range checks.
        let data = if len <= 16 * 1024 * 1024 {
            vec![0u8; len as usize]
        } else {
            Vec::new()
        };
        Self::build(block_size, block_count, data)
    }

    /// Transport over `data`, which must be a whole number of blocks.
    pub fn with_data(block_size: u32, data: Vec<u8>) -> Self {
        let block_count = (data.len() / block_size as usize) as u64;
        Self::build(block_size, block_count, data)
    }

    fn build(block_size: u32, block_count: u64, data: Vec<u8>) -> Self {
        Self {
            state: Rc::new(RefCell::new(BlockState {
                block_size,
                block_count,
                data,
                calls: Vec::new(),
                fail_info: None,
                fail_transaction: None,
                handle: RawHandle::new(7),
                next_vmoid: 1,
            })),
        }
    }

    pub fn calls(&self) -> Vec<BlockCall> {
        self.state.borrow().calls.clone()
    }

    pub fn info_calls(&self) -> usize {
        self.count(|c| matches!(c, BlockCall::Info))
    }

    pub fn session_opens(&self) -> usize {
        self.count(|c| matches!(c, BlockCall::OpenSession))
    }

    pub fn transactions(&self) -> Vec<BlockRequest> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                BlockCall::Transaction(r) => Some(*r),
                _ => None,
            })
            .collect()
    }

    /// Calls other than geometry queries.
    pub fn io_calls(&self) -> usize {
        self.count(|c| !matches!(c, BlockCall::Info))
    }

    pub fn count(&self, f: impl Fn(&BlockCall) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| f(c)).count()
    }

    pub fn fail_transactions(&self, error: BlockError) {
        self.state.borrow_mut().fail_transaction = Some(error);
    }

    pub fn fail_info(&self, error: BlockError) {
        self.state.borrow_mut().fail_info = Some(error);
    }

    pub fn data(&self) -> Vec<u8> {
        self.state.borrow().data.clone()
    }

    /// Contents of one block.
    pub fn block(&self, index: u64) -> Vec<u8> {
        let state = self.state.borrow();
        let bs = state.block_size as usize;
        let start = index as usize * bs;
        state.data[start..start + bs].to_vec()
    }
}

impl BlockTransport for MockBlockTransport {
    fn info(&mut self) -> std::result::Result<BlockInfo, BlockError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(BlockCall::Info);
        if let Some(e) = state.fail_info {
            return Err(e);
        }
        Ok(BlockInfo {
            block_size: state.block_size,
            block_count: state.block_count,
        })
    }

    fn open_session(&mut self) -> std::result::Result<(), BlockError> {
        self.state.borrow_mut().calls.push(BlockCall::OpenSession);
        Ok(())
    }

    fn attach_buffer(&mut self, len: usize) -> std::result::Result<Vmoid, BlockError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(BlockCall::Attach(len));
        let vmoid = Vmoid(state.next_vmoid);
        state.next_vmoid += 1;
        Ok(vmoid)
    }

    fn detach_buffer(&mut self, vmoid: Vmoid) -> std::result::Result<(), BlockError> {
        self.state.borrow_mut().calls.push(BlockCall::Detach(vmoid));
        Ok(())
    }

    fn transaction(
        &mut self,
        request: &BlockRequest,
        buffer: BlockBuffer<'_>,
    ) -> std::result::Result<(), BlockError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(BlockCall::Transaction(*request));
        if let Some(e) = state.fail_transaction {
            return Err(e);
        }

        let bs = state.block_size as usize;
        let start = request.dev_offset as usize * bs;
        let len = request.length as usize * bs;
        if request.opcode != BlockOpcode::Flush && start + len > state.data.len() {
            return Err(BlockError::InvalidSector);
        }

        match (request.opcode, buffer) {
            (BlockOpcode::Read, BlockBuffer::Read(dst)) => {
                dst[..len].copy_from_slice(&state.data[start..start + len]);
            }
            (BlockOpcode::Write, BlockBuffer::Write(src)) => {
                state.data[start..start + len].copy_from_slice(&src[..len]);
            }
            (BlockOpcode::Trim, BlockBuffer::None) => {
                state.data[start..start + len].fill(0);
            }
            (BlockOpcode::Flush, BlockBuffer::None) => {}
            _ => return Err(BlockError::BadVmoid),
        }
        Ok(())
    }

    fn clone_handle(&self) -> RawHandle {
        self.state.borrow().handle
    }
}

// ---------------------------------------------------------------------------
// Skip-block transport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipBlockCall {
    PartitionInfo,
    Read(ReadWriteOperation),
    Write(ReadWriteOperation),
    WriteBytes(WriteBytesOperation),
}

pub struct SkipBlockState {
    pub info: SkipBlockPartitionInfo,
    pub data: Vec<u8>,
    pub calls: Vec<SkipBlockCall>,
    pub fail: Option<SkipBlockError>,
}

/// Scripted in-memory NAND skip-block transport.
#[derive(Clone)]
pub struct MockSkipBlockTransport {
    pub state: Rc<RefCell<SkipBlockState>>,
}

impl MockSkipBlockTransport {
    pub fn new(block_size_bytes: u64, partition_block_count: u32) -> Self {
        let len = (block_size_bytes * partition_block_count as u64) as usize;
        Self {
            state: Rc::new(RefCell::new(SkipBlockState {
                info: SkipBlockPartitionInfo {
                    block_size_bytes,
                    partition_block_count,
                },
                data: vec![0u8; len],
                calls: Vec::new(),
                fail: None,
            })),
        }
    }

    pub fn calls(&self) -> Vec<SkipBlockCall> {
        self.state.borrow().calls.clone()
    }

    pub fn info_calls(&self) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| matches!(c, SkipBlockCall::PartitionInfo))
            .count()
    }

    pub fn fail_with(&self, error: SkipBlockError) {
        self.state.borrow_mut().fail = Some(error);
    }

    pub fn data(&self) -> Vec<u8> {
        self.state.borrow().data.clone()
    }

    pub fn set_data(&self, offset: usize, bytes: &[u8]) {
        self.state.borrow_mut().data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn range(
        state: &SkipBlockState,
        op: &ReadWriteOperation,
    ) -> std::result::Result<std::ops::Range<usize>, SkipBlockError> {
        let bs = state.info.block_size_bytes as usize;
        let start = op.block as usize * bs;
        let end = start + op.block_count as usize * bs;
        if end > state.data.len() {
            return Err(SkipBlockError::OutOfRange);
        }
        Ok(start..end)
    }
}

impl SkipBlockTransport for MockSkipBlockTransport {
    fn partition_info(&mut self) -> std::result::Result<SkipBlockPartitionInfo, SkipBlockError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(SkipBlockCall::PartitionInfo);
        Ok(state.info)
    }

    fn read(
        &mut self,
        op: &ReadWriteOperation,
        dst: &mut [u8],
    ) -> std::result::Result<(), SkipBlockError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(SkipBlockCall::Read(*op));
        if let Some(e) = state.fail {
            return Err(e);
        }
        let range = Self::range(&state, op)?;
        dst[..range.len()].copy_from_slice(&state.data[range]);
        Ok(())
    }

    fn write(
        &mut self,
        op: &ReadWriteOperation,
        src: &[u8],
    ) -> std::result::Result<(), SkipBlockError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(SkipBlockCall::Write(*op));
        if let Some(e) = state.fail {
            return Err(e);
        }
        let range = Self::range(&state, op)?;
        let len = range.len();
        state.data[range].copy_from_slice(&src[..len]);
        Ok(())
    }

    fn write_bytes(
        &mut self,
        op: &WriteBytesOperation,
        src: &[u8],
    ) -> std::result::Result<(), SkipBlockError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(SkipBlockCall::WriteBytes(*op));
        if let Some(e) = state.fail {
            return Err(e);
        }
        let start = op.offset as usize;
        let end = start + op.size as usize;
        if end > state.data.len() {
            return Err(SkipBlockError::OutOfRange);
        }
        state.data[start..end].copy_from_slice(&src[..op.size as usize]);
        Ok(())
    }

    fn clone_handle(&self) -> RawHandle {
        RawHandle::new(11)
    }
}

// ---------------------------------------------------------------------------
// Sysconfig sync client
// ---------------------------------------------------------------------------

pub struct SysconfigState {
    pub partition_size: usize,
    /// Data visible to readers (committed)
    pub committed: HashMap<SysconfigPartition, Vec<u8>>,
    /// Writes waiting for flush
    pub pending: HashMap<SysconfigPartition, Vec<u8>>,
    pub size_queries: usize,
    pub flushes: usize,
    pub fail_write: Option<SysconfigError>,
    pub fail_flush: Option<SysconfigError>,
}

/// Buffered sysconfig sync client: writes land on flush.
///
/// Thread-safe so it can sit inside a shared context used from several
/// threads. `inside` counts callers currently executing a method and
/// `max_inside` records the highest value seen.
#[derive(Clone)]
pub struct MockSysconfig {
    pub state: Arc<Mutex<SysconfigState>>,
    pub inside: Arc<AtomicUsize>,
    pub max_inside: Arc<AtomicUsize>,
}

impl MockSysconfig {
    pub fn new(partition_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(SysconfigState {
                partition_size,
                committed: HashMap::new(),
                pending: HashMap::new(),
                size_queries: 0,
                flushes: 0,
                fail_write: None,
                fail_flush: None,
            })),
            inside: Arc::new(AtomicUsize::new(0)),
            max_inside: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn committed(&self, partition: SysconfigPartition) -> Option<Vec<u8>> {
        self.state.lock().unwrap().committed.get(&partition).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    pub fn flushes(&self) -> usize {
        self.state.lock().unwrap().flushes
    }

    pub fn size_queries(&self) -> usize {
        self.state.lock().unwrap().size_queries
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_inside.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Guard<'_> {
        let now = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_inside.fetch_max(now, Ordering::SeqCst);
        // Widen the window in which overlapping callers would be seen.
        std::thread::yield_now();
        Guard(&self.inside)
    }
}

struct Guard<'a>(&'a AtomicUsize);

impl Drop for Guard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SysconfigTransport for MockSysconfig {
    fn partition_size(
        &mut self,
        _partition: SysconfigPartition,
    ) -> std::result::Result<usize, SysconfigError> {
        let _guard = self.enter();
        let mut state = self.state.lock().unwrap();
        state.size_queries += 1;
        Ok(state.partition_size)
    }

    fn read_partition(
        &mut self,
        partition: SysconfigPartition,
        dst: &mut [u8],
    ) -> std::result::Result<(), SysconfigError> {
        let _guard = self.enter();
        let state = self.state.lock().unwrap();
        if dst.len() != state.partition_size {
            return Err(SysconfigError::InvalidArgs);
        }
        match state
            .pending
            .get(&partition)
            .or_else(|| state.committed.get(&partition))
        {
            Some(data) => dst.copy_from_slice(data),
            None => dst.fill(0),
        }
        Ok(())
    }

    fn write_partition(
        &mut self,
        partition: SysconfigPartition,
        src: &[u8],
    ) -> std::result::Result<(), SysconfigError> {
        let _guard = self.enter();
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.fail_write {
            return Err(e);
        }
        if src.len() != state.partition_size {
            return Err(SysconfigError::InvalidArgs);
        }
        state.pending.insert(partition, src.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> std::result::Result<(), SysconfigError> {
        let _guard = self.enter();
        let mut state = self.state.lock().unwrap();
        state.flushes += 1;
        if let Some(e) = state.fail_flush {
            return Err(e);
        }
        let pending: Vec<_> = state.pending.drain().collect();
        state.committed.extend(pending);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Partition client mock for the copy client
// ---------------------------------------------------------------------------

pub struct PartitionState {
    pub block_size: Result<usize>,
    pub partition_size: Result<u64>,
    pub data: Vec<u8>,
    pub fail_read: Option<PartitionError>,
    pub fail_write: Option<PartitionError>,
    pub fail_trim: Option<PartitionError>,
    pub fail_flush: Option<PartitionError>,
    pub reads: usize,
    pub writes: usize,
    pub trims: usize,
    pub flushes: usize,
}

/// In-memory [`PartitionClient`] with failure injection.
#[derive(Clone)]
pub struct MockPartition {
    pub state: Rc<RefCell<PartitionState>>,
}

impl MockPartition {
    pub fn new(block_size: usize, partition_size: u64) -> Self {
        Self {
            state: Rc::new(RefCell::new(PartitionState {
                block_size: Ok(block_size),
                partition_size: Ok(partition_size),
                data: Vec::new(),
                fail_read: None,
                fail_write: None,
                fail_trim: None,
                fail_flush: None,
                reads: 0,
                writes: 0,
                trims: 0,
                flushes: 0,
            })),
        }
    }

    pub fn boxed(&self) -> Box<dyn PartitionClient> {
        Box::new(self.clone())
    }

    pub fn with_data(self, data: Vec<u8>) -> Self {
        self.state.borrow_mut().data = data;
        self
    }

    pub fn state(&self) -> std::cell::RefMut<'_, PartitionState> {
        self.state.borrow_mut()
    }

    pub fn data(&self) -> Vec<u8> {
        self.state.borrow().data.clone()
    }
}

impl PartitionClient for MockPartition {
    fn block_size(&mut self) -> Result<usize> {
        self.state.borrow().block_size
    }

    fn partition_size(&mut self) -> Result<u64> {
        self.state.borrow().partition_size
    }

    fn read(&mut self, buffer: &mut [u8], size: usize) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.reads += 1;
        if let Some(e) = state.fail_read {
            return Err(e);
        }
        buffer[..size].copy_from_slice(&state.data[..size]);
        Ok(())
    }

    fn write(&mut self, buffer: &[u8], size: usize) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.writes += 1;
        if let Some(e) = state.fail_write {
            return Err(e);
        }
        state.data = buffer[..size].to_vec();
        Ok(())
    }

    fn trim(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.trims += 1;
        if let Some(e) = state.fail_trim {
            return Err(e);
        }
        state.data.clear();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.flushes += 1;
        match state.fail_flush {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn raw_handle(&self) -> RawHandle {
        RawHandle::new(3)
    }
}

// ---------------------------------------------------------------------------
// BlockIo device
// ---------------------------------------------------------------------------

/// In-memory block device for testing
#[derive(Debug, Clone)]
pub struct MemoryBlockDevice {
    pub data: Vec<u8>,
    pub block_size: usize,
    pub flushes: usize,
}

impl MemoryBlockDevice {
    pub fn new(block_size: usize, block_count: usize) -> Self {
        Self {
            data: vec![0u8; block_size * block_count],
            block_size,
            flushes: 0,
        }
    }
}

impl BlockIo for MemoryBlockDevice {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        BlockSize::new(self.block_size as u32).expect("valid block size")
    }

    fn num_blocks(&mut self) -> std::result::Result<u64, Self::Error> {
        Ok((self.data.len() / self.block_size) as u64)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> std::result::Result<(), Self::Error> {
        let offset = start_lba.0 as usize * self.block_size;
        if offset + dst.len() > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read beyond end of device",
            ));
        }
        dst.copy_from_slice(&self.data[offset..offset + dst.len()]);
        Ok(())
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> std::result::Result<(), Self::Error> {
        let offset = start_lba.0 as usize * self.block_size;
        if offset + src.len() > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "write beyond end of device",
            ));
        }
        self.data[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn flush(&mut self) -> std::result::Result<(), Self::Error> {
        self.flushes += 1;
        Ok(())
    }
}

// Session logger for paving operations
//
// Partition clients log through the `log` facade. When nothing else is
// installed, the flashing tool can install this logger to keep the most
// recent records in memory and dump them once the update session ends.

use alloc::collections::VecDeque;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Mutex;

pub const MAX_LOG_ENTRIES: usize = 64;

static LOG_BUFFER: Mutex<VecDeque<LogEntry>> = Mutex::new(VecDeque::new());
static LOG_DROPPED: AtomicUsize = AtomicUsize::new(0);
static LOGGER: SessionLogger = SessionLogger;

/// One captured log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// `log::Log` sink backed by a fixed-size ring.
pub struct SessionLogger;

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        push(LogEntry {
            level: record.level(),
            target: String::from(record.target()),
            message: format!("{}", record.args()),
        });
    }

    fn flush(&self) {}
}

fn push(entry: LogEntry) {
    let mut buffer = LOG_BUFFER.lock();
    if buffer.len() == MAX_LOG_ENTRIES {
        buffer.pop_front();
        LOG_DROPPED.fetch_add(1, Ordering::SeqCst);
    }
    buffer.push_back(entry);
}

/// Install the session logger at `level`.
///
/// Returns false if another logger was installed first; the max level is
/// updated either way.
pub fn init(level: LevelFilter) -> bool {
    let installed = log::set_logger(&LOGGER).is_ok();
    log::set_max_level(level);
    installed
}

/// Snapshot of the buffered records, oldest first.
pub fn records() -> Vec<LogEntry> {
    LOG_BUFFER.lock().iter().cloned().collect()
}

pub fn log_count() -> usize {
    LOG_BUFFER.lock().len()
}

/// Records evicted because the ring was full.
pub fn dropped_count() -> usize {
    LOG_DROPPED.load(Ordering::SeqCst)
}

pub fn clear() {
    LOG_BUFFER.lock().clear();
    LOG_DROPPED.store(0, Ordering::SeqCst);
}

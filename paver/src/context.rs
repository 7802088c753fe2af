//! Shared partitioner context
//!
//! Several partition clients may sit on top of one connection (for example
//! every sysconfig sub-partition shares a single sync client). The context
//! owns that connection behind a spin lock and runs one unit of work against
//! it at a time.
//!
//! ```ignore
//! let ctx = PartitionerContext::new();
//! ctx.initialize(|| Ok(AstroPartitionerContext::new(sync_client)))?;
//!
//! let size = ctx.call(|astro| astro.client.partition_size(partition))?;
//! ```

use alloc::sync::Arc;
use spin::Mutex;

use crate::error::{PartitionError, Result};

/// Cloneable handle to a connection shared between partition clients.
pub struct PartitionerContext<T> {
    inner: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for PartitionerContext<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for PartitionerContext<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PartitionerContext<T> {
    /// Create an empty context.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a context that already holds `value`.
    pub fn with(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(value))),
        }
    }

    /// Whether a value has been installed.
    pub fn is_initialized(&self) -> bool {
        self.inner.lock().is_some()
    }

    /// Install the value produced by `f` unless one is already present.
    ///
    /// `f` runs under the lock, so concurrent initializers build the value
    /// at most once.
    pub fn initialize<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<T>,
    {
        let mut guard = self.inner.lock();
        if guard.is_some() {
            return Ok(());
        }
        *guard = Some(f()?);
        log::debug!("partitioner context initialized");
        Ok(())
    }

    /// Run `f` with exclusive access to the shared value.
    ///
    /// Returns `NotFound` if the context was never initialized.
    pub fn call<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> Result<R>,
    {
        let mut guard = self.inner.lock();
        match guard.as_mut() {
            Some(value) => f(value),
            None => {
                log::error!("partitioner context used before initialization");
                Err(PartitionError::NotFound)
            }
        }
    }
}

use std::time::Duration;

use log::warn;

use crate::{QueueClosed, RawReading, ReadingStore, TaskQueue};

/// Why a consumer read transferred nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The buffer cannot hold one reading.
    #[error("buffer of {len} bytes is too small for a {}-byte reading", RawReading::SIZE)]
    ShortRead {
        /// Length of the rejected buffer.
        len: usize,
    },
    /// The acquisition could not be queued.
    #[error(transparent)]
    Enqueue(#[from] QueueClosed),
}

/// The read-only consumer interface of the driver. Cheap to clone.
///
/// Reads are asynchronous with respect to acquisition: every read queues a
/// fresh acquisition and immediately returns whatever the store holds, which
/// is usually the result of an earlier acquisition. Call
/// [`TemperatureDevice::wait_idle`] first when the newest value is needed.
#[derive(Debug, Clone)]
pub struct TemperatureDevice {
    store: ReadingStore,
    queue: TaskQueue,
}

impl TemperatureDevice {
    pub(crate) fn new(store: ReadingStore, queue: TaskQueue) -> Self {
        Self { store, queue }
    }

    /// Queues an acquisition and copies the current reading into `buf`.
    ///
    /// # Returns
    /// [`RawReading::SIZE`] bytes in host byte order, or 0 if `buf` is too
    /// short or the acquisition could not be queued.
    pub fn trigger_and_read(&self, buf: &mut [u8]) -> usize {
        self.read_raw(buf).unwrap_or_else(|e| {
            warn!("temperature read rejected: {e}");
            0
        })
    }

    /// Like [`TemperatureDevice::trigger_and_read`], reporting why nothing was
    /// copied.
    ///
    /// # Errors
    /// [`DeviceError::ShortRead`] without queueing anything, or
    /// [`DeviceError::Enqueue`] if the driver is detached.
    pub fn read_raw(&self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        if buf.len() < RawReading::SIZE {
            return Err(DeviceError::ShortRead { len: buf.len() });
        }
        self.queue.schedule(Duration::ZERO)?;
        Ok(self.store.copy_to(buf))
    }

    /// The current reading, without queueing an acquisition.
    pub fn latest(&self) -> RawReading {
        self.store.snapshot()
    }

    /// Blocks until all queued acquisitions, retries included, are done.
    ///
    /// # Errors
    /// [`DeviceError::Enqueue`] if the driver is detached.
    pub fn wait_idle(&self) -> Result<(), DeviceError> {
        Ok(self.queue.flush()?)
    }
}

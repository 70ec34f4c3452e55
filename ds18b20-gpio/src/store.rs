use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use fixed::types::I12F4;

/// The raw temperature register of the sensor, scratchpad bytes 0 and 1.
///
/// No unit conversion is applied; [`RawReading::celsius`] is there for display.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawReading(pub u16);

impl RawReading {
    /// Size of a reading as handed to consumers.
    pub const SIZE: usize = size_of::<u16>();

    /// The reading in host byte order.
    pub const fn to_ne_bytes(self) -> [u8; Self::SIZE] {
        self.0.to_ne_bytes()
    }

    /// Rebuilds a reading from host-order bytes.
    pub const fn from_ne_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self(u16::from_ne_bytes(bytes))
    }

    /// The reading in degrees Celsius, assuming the default 12-bit resolution.
    pub const fn celsius(self) -> I12F4 {
        I12F4::from_bits(self.0 as i16)
    }
}

impl fmt::Display for RawReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// The last successfully read temperature, shared between the acquisition
/// worker and any number of consumers.
///
/// Writers hold the lock for the whole bus read that produces the value and
/// readers hold it for the whole copy, so nobody observes half a reading.
#[derive(Debug, Clone, Default)]
pub struct ReadingStore {
    slot: Arc<Mutex<RawReading>>,
}

impl ReadingStore {
    /// Creates a store holding a zero reading.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of the store.
    pub fn snapshot(&self) -> RawReading {
        *self.lock()
    }

    /// Copies the current reading into the front of `buf` in host byte order
    /// and returns the number of bytes written: [`RawReading::SIZE`], or 0 if
    /// `buf` is too short to hold a whole reading.
    pub fn copy_to(&self, buf: &mut [u8]) -> usize {
        let Some(dst) = buf.get_mut(..RawReading::SIZE) else {
            return 0;
        };
        dst.copy_from_slice(&self.lock().to_ne_bytes());
        RawReading::SIZE
    }

    /// Runs `read` under the lock and stores its result.
    ///
    /// On error the store keeps its previous value.
    pub fn publish_with<E>(
        &self,
        read: impl FnOnce() -> Result<u16, E>,
    ) -> Result<RawReading, E> {
        let mut slot = self.lock();
        let reading = RawReading(read()?);
        *slot = reading;
        Ok(reading)
    }

    fn lock(&self) -> MutexGuard<'_, RawReading> {
        // a plain u16 cannot be left half-written by a panicking holder
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

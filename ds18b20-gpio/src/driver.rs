use std::{fmt::Debug, time::Duration};

use log::{info, warn};
use onewire_core::{BusTimer, OneWire};

use crate::{ReadingStore, TemperatureDevice, Worker, WorkerError};

/// Delay of the first acquisition after [`Ds18b20Driver::attach`].
pub const ATTACH_DELAY: Duration = Duration::from_millis(100);

/// A DS18B20 on its own bus, with an acquisition worker and a consumer
/// interface.
///
/// Attaching moves the bus onto the worker and queues a first acquisition.
/// Detaching stops the worker before the bus is handed back, so the caller
/// can only free the line once nothing uses it any more.
pub struct Ds18b20Driver<B, T> {
    worker: Worker<B, T>,
    device: TemperatureDevice,
}

impl<B, T> Ds18b20Driver<B, T>
where
    B: OneWire + Send + 'static,
    B::BusError: Debug,
    T: BusTimer + Send + 'static,
{
    /// Starts the driver on `bus`.
    ///
    /// `timer` paces the millisecond pauses of the acquisition cycle; the bus
    /// keeps its own for slot timing.
    ///
    /// # Errors
    /// [`WorkerError::Spawn`] if the worker thread cannot be created.
    pub fn attach(bus: B, timer: T) -> Result<Self, WorkerError> {
        let store = ReadingStore::new();
        let worker = Worker::spawn(bus, timer, store.clone())?;
        let queue = worker.queue();
        if let Err(e) = queue.schedule(ATTACH_DELAY) {
            warn!("initial acquisition not queued: {e}");
        }
        info!("DS18B20 driver attached");
        Ok(Self {
            worker,
            device: TemperatureDevice::new(store, queue),
        })
    }

    /// A handle to the consumer interface.
    pub fn device(&self) -> TemperatureDevice {
        self.device.clone()
    }

    /// Drains the worker and gives the bus back.
    ///
    /// Outstanding [`TemperatureDevice`] handles stay valid but every read
    /// through them returns 0 bytes from now on.
    ///
    /// # Errors
    /// [`WorkerError::Panicked`] if the worker died, taking the bus with it.
    pub fn detach(self) -> Result<B, WorkerError> {
        let (bus, _) = self.worker.shutdown()?;
        info!("DS18B20 driver detached");
        Ok(bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RawReading, sim::SimSensor};
    use embedded_hal_mock::eh1::delay::NoopDelay;

    #[test]
    fn first_acquisition_runs_after_attach() {
        let sim = SimSensor::new(0x0123_4567_89ab_cdef, 0x0550).with_busy_polls(3);
        let driver = Ds18b20Driver::attach(sim, NoopDelay::new()).unwrap();
        let device = driver.device();

        device.wait_idle().unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(device.trigger_and_read(&mut buf), 2);
        assert_eq!(RawReading::from_ne_bytes(buf), RawReading(0x0550));
        if cfg!(target_endian = "little") {
            assert_eq!(buf, [0x50, 0x05]);
        }
        device.wait_idle().unwrap();

        let sim = driver.detach().unwrap();
        assert_eq!(sim.resets, 8);
        assert_eq!(sim.commands[..5], [0x33, 0xcc, 0x44, 0xcc, 0xbe]);
        assert_eq!(sim.commands.len(), 10);
    }

    #[test]
    fn reads_fail_after_detach() {
        let driver = Ds18b20Driver::attach(SimSensor::new(1, 0x0550), NoopDelay::new()).unwrap();
        let device = driver.device();
        driver.detach().unwrap();
        assert_eq!(device.trigger_and_read(&mut [0u8; 2]), 0);
    }

    #[test]
    fn absent_sensor_leaves_the_store_alone() {
        let sim = SimSensor::new(1, 0x0550).absent();
        let driver = Ds18b20Driver::attach(sim, NoopDelay::new()).unwrap();
        let device = driver.device();
        device.wait_idle().unwrap();
        assert_eq!(device.latest(), RawReading(0));

        let sim = driver.detach().unwrap();
        assert_eq!(sim.resets, 4);
    }
}

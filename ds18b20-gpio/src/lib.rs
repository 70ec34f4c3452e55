#![deny(missing_docs)]

/*! # DS18B20 over a GPIO line
 *
 * A user-space driver for one DS18B20 on one bit-banged 1-Wire line.
 *
 * [`Ds18b20Driver::attach`] moves the bus onto a single acquisition worker.
 * Each acquisition resets the sensor, reads its ROM code, starts a
 * conversion, polls until it is done and publishes the raw scratchpad
 * temperature to a [`ReadingStore`]. Consumers read through a
 * [`TemperatureDevice`], which queues a new acquisition on every read and
 * returns the latest stored value right away.
 *
 * A reset without presence pulse restarts the acquisition after
 * [`RETRY_DELAY`], at most [`MAX_RESET_ATTEMPTS`] times in total.
 */

mod cycle;
mod device;
mod driver;
#[cfg(test)]
mod sim;
mod store;
mod sysfs;
mod worker;

pub use cycle::{
    AcquisitionTask, Cycle, CycleError, CycleState, MAX_RESET_ATTEMPTS, POLL_INTERVAL_MS,
    POLL_LIMIT, RETRY_DELAY, ROM_SETTLE_MS, TaskOutcome,
};
pub use device::{DeviceError, TemperatureDevice};
pub use driver::{ATTACH_DELAY, Ds18b20Driver};
pub use store::{RawReading, ReadingStore};
pub use sysfs::{SpinDelay, SysfsLine};
pub use worker::{QueueClosed, TaskQueue, Worker, WorkerError};

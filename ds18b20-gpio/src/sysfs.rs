use std::{
    hint, thread,
    time::{Duration, Instant},
};

use embedded_hal::delay::DelayNs;
use linux_embedded_hal::sysfs_gpio::{self, Direction, Pin};
use onewire_core::BusLine;

/// A bus line on a GPIO exported through `/sys/class/gpio`.
///
/// Direction changes are real direction changes: "released" is an input, so
/// the line needs an external pull-up.
#[derive(Debug)]
pub struct SysfsLine {
    pin: Pin,
    number: u64,
}

impl SysfsLine {
    /// Exports GPIO `number` and leaves it released.
    ///
    /// # Errors
    /// Any sysfs error while exporting or configuring the pin.
    pub fn export(number: u64) -> sysfs_gpio::Result<Self> {
        let pin = Pin::new(number);
        pin.export()?;
        pin.set_direction(Direction::In)?;
        Ok(Self { pin, number })
    }

    /// The GPIO number of the line.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Releases the line and unexports it.
    ///
    /// # Errors
    /// Any sysfs error while unexporting.
    pub fn unexport(self) -> sysfs_gpio::Result<()> {
        self.pin.set_direction(Direction::In)?;
        self.pin.unexport()
    }

    /// Unexports GPIO `number` without owning it. A pin that is not exported
    /// is left alone.
    ///
    /// # Errors
    /// Any sysfs error while unexporting.
    pub fn unexport_pin(number: u64) -> sysfs_gpio::Result<()> {
        Pin::new(number).unexport()
    }
}

impl BusLine for SysfsLine {
    type Error = sysfs_gpio::Error;

    fn set_direction_output(&mut self, level: bool) -> Result<(), Self::Error> {
        // High/Low switch to output and set the level in one write
        self.pin
            .set_direction(if level { Direction::High } else { Direction::Low })
    }

    fn set_direction_input(&mut self) -> Result<(), Self::Error> {
        self.pin.set_direction(Direction::In)
    }

    fn read_level(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.get_value()? != 0)
    }
}

/// A delay that spins for sub-millisecond waits and sleeps for the rest.
///
/// Scheduler sleeps overshoot by tens of microseconds, which is a whole
/// 1-Wire slot, so short delays never give up the CPU.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinDelay;

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        let deadline = Instant::now() + Duration::from_nanos(ns.into());
        while Instant::now() < deadline {
            hint::spin_loop();
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms.into()));
    }
}

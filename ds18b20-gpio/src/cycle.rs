use std::{fmt::Debug, time::Duration};

use log::{debug, error, info, trace, warn};
use onewire_core::{BusTimer, Command, OneWire, OneWireError};

use crate::ReadingStore;

/// Reset attempts one acquisition may make before it is abandoned.
pub const MAX_RESET_ATTEMPTS: u8 = 4;
/// Delay before an acquisition whose reset failed is tried again.
pub const RETRY_DELAY: Duration = Duration::from_millis(100);
/// Pause after reading the ROM code.
pub const ROM_SETTLE_MS: u32 = 1;
/// Pause between two conversion polls.
pub const POLL_INTERVAL_MS: u32 = 1;
/// Polls after which a conversion is considered stuck, the 12-bit worst case.
pub const POLL_LIMIT: u16 = 750;

/// Where an acquisition cycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Finished with a published reading, ready for the next trigger.
    Idle,
    /// Waiting for a presence pulse.
    Resetting,
    /// Reading the ROM code of the sensor.
    RomRead,
    /// Resetting and starting a temperature conversion.
    ConversionStart,
    /// Waiting for the sensor to release the line; `polls` read slots came back 0.
    Polling {
        /// Read slots answered with 0 so far.
        polls: u16,
    },
    /// Resetting, reading the scratchpad and publishing the result.
    ScratchpadRead,
    /// Given up; only a new trigger starts over.
    Aborted,
}

impl CycleState {
    /// `true` for [`CycleState::Idle`] and [`CycleState::Aborted`].
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Idle | Self::Aborted)
    }
}

/// Why a cycle stopped before reaching [`CycleState::Idle`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CycleError<E> {
    /// A reset slot got no presence pulse.
    #[error("no presence pulse after reset")]
    NoPresence,
    /// The sensor kept the line low for every poll.
    #[error("conversion still running after {polls} polls")]
    ConversionTimeout {
        /// Polls answered with 0.
        polls: u16,
    },
    /// The GPIO layer failed.
    #[error("bus line error: {0:?}")]
    Bus(E),
}

impl<E> From<OneWireError<E>> for CycleError<E> {
    fn from(value: OneWireError<E>) -> Self {
        match value {
            OneWireError::NoDevicePresent => Self::NoPresence,
            OneWireError::Other(e) => Self::Bus(e),
        }
    }
}

/// One pass over the acquisition pipeline against a borrowed bus.
///
/// Every step that talks to the sensor after the ROM read starts with its own
/// reset, and any reset failure ends the pass.
pub struct Cycle<'a, B, T> {
    bus: &'a mut B,
    timer: &'a mut T,
    store: &'a ReadingStore,
}

impl<'a, B, T> Cycle<'a, B, T>
where
    B: OneWire,
    B::BusError: Debug,
    T: BusTimer,
{
    /// Prepares a cycle; nothing touches the bus until [`Cycle::step`].
    pub fn new(bus: &'a mut B, timer: &'a mut T, store: &'a ReadingStore) -> Self {
        Self { bus, timer, store }
    }

    /// Runs from [`CycleState::Resetting`] until a terminal state or an error.
    pub fn run(&mut self) -> Result<CycleState, CycleError<B::BusError>> {
        let mut state = CycleState::Resetting;
        while !state.is_terminal() {
            state = self.step(state)?;
        }
        Ok(state)
    }

    /// Performs the work of `state` and returns the state that follows it.
    ///
    /// Terminal states map to themselves without touching the bus.
    pub fn step(&mut self, state: CycleState) -> Result<CycleState, CycleError<B::BusError>> {
        let next = match state {
            CycleState::Idle | CycleState::Aborted => state,
            CycleState::Resetting => self.resetting()?,
            CycleState::RomRead => self.rom_read()?,
            CycleState::ConversionStart => self.conversion_start()?,
            CycleState::Polling { polls } => self.polling(polls)?,
            CycleState::ScratchpadRead => self.scratchpad_read()?,
        };
        trace!("{state:?} -> {next:?}");
        Ok(next)
    }

    fn resetting(&mut self) -> Result<CycleState, CycleError<B::BusError>> {
        self.bus.reset()?;
        Ok(CycleState::RomRead)
    }

    fn rom_read(&mut self) -> Result<CycleState, CycleError<B::BusError>> {
        self.bus.write_command(Command::ReadRom)?;
        let rom = self.bus.read_rom()?;
        debug!("ROM {rom:016x}");
        self.timer.delay_ms(ROM_SETTLE_MS);
        Ok(CycleState::ConversionStart)
    }

    fn conversion_start(&mut self) -> Result<CycleState, CycleError<B::BusError>> {
        self.bus.reset()?;
        self.bus.write_command(Command::SkipRom)?;
        self.bus.write_command(Command::ConvertT)?;
        Ok(CycleState::Polling { polls: 0 })
    }

    fn polling(&mut self, polls: u16) -> Result<CycleState, CycleError<B::BusError>> {
        if self.bus.read_bit()? {
            debug!("conversion done after {polls} polls");
            return Ok(CycleState::ScratchpadRead);
        }
        let polls = polls + 1;
        if polls >= POLL_LIMIT {
            return Err(CycleError::ConversionTimeout { polls });
        }
        self.timer.delay_ms(POLL_INTERVAL_MS);
        Ok(CycleState::Polling { polls })
    }

    fn scratchpad_read(&mut self) -> Result<CycleState, CycleError<B::BusError>> {
        self.bus.reset()?;
        self.bus.write_command(Command::SkipRom)?;
        self.bus.write_command(Command::ReadScratchpad)?;
        let bus = &mut *self.bus;
        let reading = self.store.publish_with(|| bus.read_temperature())?;
        info!("raw temperature {reading}");
        // leaves the bus idle; the reading is already out
        if let Err(e) = self.bus.reset() {
            warn!("bus-idle reset after scratchpad read failed: {e:?}");
        }
        Ok(CycleState::Idle)
    }
}

/// A schedulable acquisition: one run of the cycle, carrying its own count of
/// reset attempts.
///
/// Every externally triggered acquisition starts from
/// [`AcquisitionTask::new`] with a count of one; only retries carry it
/// forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionTask {
    attempt: u8,
}

/// What the worker should do after running an [`AcquisitionTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// A reading was published.
    Completed,
    /// A reset failed; run this task after [`RETRY_DELAY`].
    Retry(AcquisitionTask),
    /// Nothing was published and nothing will be retried.
    Aborted,
}

impl Default for AcquisitionTask {
    fn default() -> Self {
        Self::new()
    }
}

impl AcquisitionTask {
    /// A fresh acquisition, on its first attempt.
    pub const fn new() -> Self {
        Self { attempt: 1 }
    }

    /// The attempt this task represents, starting at 1.
    pub const fn attempt(&self) -> u8 {
        self.attempt
    }

    /// Runs the whole pipeline once.
    ///
    /// A failed reset anywhere restarts the pipeline from the first reset, up
    /// to [`MAX_RESET_ATTEMPTS`] attempts in total.
    pub fn run<B, T>(self, bus: &mut B, timer: &mut T, store: &ReadingStore) -> TaskOutcome
    where
        B: OneWire,
        B::BusError: Debug,
        T: BusTimer,
    {
        match Cycle::new(bus, timer, store).run() {
            Ok(CycleState::Aborted) => TaskOutcome::Aborted,
            Ok(_) => {
                if self.attempt > 1 {
                    info!("DS18B20 answered on attempt {}", self.attempt);
                }
                TaskOutcome::Completed
            }
            Err(CycleError::NoPresence) if self.attempt < MAX_RESET_ATTEMPTS => {
                warn!(
                    "DS18B20 not present (attempt {}/{MAX_RESET_ATTEMPTS}), retrying in {} ms",
                    self.attempt,
                    RETRY_DELAY.as_millis()
                );
                TaskOutcome::Retry(Self {
                    attempt: self.attempt + 1,
                })
            }
            Err(CycleError::NoPresence) => {
                error!("DS18B20 not present after {MAX_RESET_ATTEMPTS} attempts, giving up");
                TaskOutcome::Aborted
            }
            Err(e) => {
                error!("acquisition aborted: {e}");
                TaskOutcome::Aborted
            }
        }
    }
}

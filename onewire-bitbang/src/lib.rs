#![no_std]
#![deny(missing_docs)]

/*! # onewire-bitbang
 *
 * A 1-Wire bus master that generates every slot in software on one
 * bidirectional GPIO line.
 *
 * The slot timings below are protocol invariants, not tunables: a wrong delay
 * does not fail loudly, the sensor simply samples a different bit.
 */

pub use onewire_core::{BusLine, BusTimer, OneWire, OneWireError, OneWireResult, Presence};
mod onewire;

/// Low pulse that starts a reset slot.
pub const RESET_LOW_US: u32 = 480;
/// Wait after releasing the line before sampling the presence pulse.
pub const PRESENCE_WAIT_US: u32 = 60;
/// Hold after the presence sample before the next transaction may start.
pub const RESET_RECOVERY_US: u32 = 480;

/// Low pulse of a write-1 slot.
pub const WRITE_1_LOW_US: u32 = 1;
/// Released time of a write-1 slot.
pub const WRITE_1_RELEASE_US: u32 = 61;
/// Low pulse of a write-0 slot.
pub const WRITE_0_LOW_US: u32 = 60;
/// Released time of a write-0 slot.
pub const WRITE_0_RELEASE_US: u32 = 2;

/// Low pulse that opens a read slot.
pub const READ_INIT_LOW_US: u32 = 1;
/// Wait between release and sampling in a read slot.
pub const READ_SAMPLE_US: u32 = 13;
/// Remainder of the read slot after the sample, whatever was read.
pub const READ_RECOVERY_US: u32 = 47;

/// A bit-banged 1-Wire master.
///
/// Takes ownership of the bus line (implementing [`BusLine`]) and a timer
/// implementing [`BusTimer`]. It is the only code changing the line direction
/// for as long as it holds the line; [`BitBang::release`] hands both back.
#[derive(Debug)]
pub struct BitBang<L, T> {
    pub(crate) line: L,
    pub(crate) timer: T,
}

impl<L: BusLine, T: BusTimer> BitBang<L, T> {
    /// Creates a new bus master on `line`.
    pub fn new(line: L, timer: T) -> Self {
        BitBang { line, timer }
    }

    /// Releases the line to input, the idle state of the bus.
    ///
    /// # Errors
    /// This method returns an error if the line cannot be reconfigured.
    pub fn idle(&mut self) -> Result<(), L::Error> {
        self.line.set_direction_input()
    }

    /// Gives the line and the timer back.
    pub fn release(self) -> (L, T) {
        (self.line, self.timer)
    }
}

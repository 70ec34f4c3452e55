#![no_std]
#![deny(missing_docs)]
//! # onewire-core
//! A no-std vocabulary for driving exactly one 1-Wire sensor on one bus line.
//!
//! The crate separates the two platform capabilities a bus master needs, a
//! bidirectional line ([BusLine]) and a microsecond-capable timer ([BusTimer]),
//! from the protocol itself. [OneWire] defines the three timed primitives a
//! master must provide (reset, write a bit, read a bit) and builds byte,
//! command, ROM and temperature transfers on top of them, least-significant
//! bit first.
//!
//! There is no device search and no CRC handling: the bus is assumed to carry
//! a single device addressed with [Command::SkipRom].

mod command;
mod error;
mod line;
mod traits;

pub use command::Command;
pub use error::OneWireError;
pub use line::{BusLine, BusTimer, OpenDrain};
pub use traits::{OneWire, Presence};

/// Error type for 1-Wire operations.
pub type OneWireResult<T, E> = Result<T, OneWireError<E>>;

use crate::{Command, OneWireResult};

/// Proof that a device answered the last reset slot with a presence pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presence;

/// Trait for 1-Wire communication with a single device.
///
/// Implementors provide the three timed primitives. Everything wider than a
/// bit is assembled here, least-significant bit first, as the bus requires.
pub trait OneWire {
    /// The error type returned by the underlying line.
    type BusError;

    /// Issues a reset slot and samples the presence pulse.
    ///
    /// Implementations must include the recovery time after the sample, so
    /// that the next transaction can start as soon as this returns.
    ///
    /// # Errors
    /// [`OneWireError::NoDevicePresent`](crate::OneWireError::NoDevicePresent)
    /// if the line stayed high, or the line error if the pin failed.
    fn reset(&mut self) -> OneWireResult<Presence, Self::BusError>;

    /// Writes a single bit slot.
    ///
    /// # Errors
    /// This method returns an error if the line fails.
    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError>;

    /// Reads a single bit slot.
    /// # Returns
    /// `true` if the line was high at the sample point.
    /// # Errors
    /// This method returns an error if the line fails.
    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError>;

    /// Writes a byte, least-significant bit first.
    ///
    /// # Errors
    /// This method returns an error if the line fails.
    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError> {
        for i in 0..8 {
            self.write_bit((byte >> i) & 0x1 == 0x1)?;
        }
        Ok(())
    }

    /// Writes the opcode of `cmd`.
    ///
    /// # Errors
    /// This method returns an error if the line fails.
    fn write_command(&mut self, cmd: Command) -> OneWireResult<(), Self::BusError> {
        self.write_byte(cmd.opcode())
    }

    /// Reads `count` bits, placing the first bit read at bit 0. A `count`
    /// above 64 reads 64 bits.
    ///
    /// # Errors
    /// This method returns an error if the line fails.
    fn read_bits(&mut self, count: u32) -> OneWireResult<u64, Self::BusError> {
        let mut value = 0u64;
        for i in 0..count.min(u64::BITS) {
            if self.read_bit()? {
                value |= 1 << i;
            }
        }
        Ok(value)
    }

    /// Reads a byte, least-significant bit first.
    ///
    /// # Errors
    /// This method returns an error if the line fails.
    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError> {
        Ok(self.read_bits(u8::BITS)? as u8)
    }

    /// Reads the 64-bit ROM code that follows a [`Command::ReadRom`].
    ///
    /// The CRC byte is returned as part of the value and is not checked.
    ///
    /// # Errors
    /// This method returns an error if the line fails.
    fn read_rom(&mut self) -> OneWireResult<u64, Self::BusError> {
        self.read_bits(u64::BITS)
    }

    /// Reads the raw temperature register, the first two scratchpad bytes
    /// that follow a [`Command::ReadScratchpad`].
    ///
    /// No unit conversion is applied.
    ///
    /// # Errors
    /// This method returns an error if the line fails.
    fn read_temperature(&mut self) -> OneWireResult<u16, Self::BusError> {
        Ok(self.read_bits(u16::BITS)? as u16)
    }
}

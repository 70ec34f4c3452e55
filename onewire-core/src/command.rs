/// Opcodes understood by the sensor.
///
/// A command is consumed by [`OneWire::write_command`](crate::OneWire::write_command)
/// as soon as it is built; nothing keeps it around.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Ask the only device on the bus for its 64-bit ROM code.
    ReadRom = 0x33,
    /// Address every device on the bus without sending a ROM code.
    SkipRom = 0xcc,
    /// Start a temperature conversion. The sensor holds the line low on
    /// every read slot until the conversion is done.
    ConvertT = 0x44,
    /// Read the scratchpad, starting with the two temperature bytes.
    ReadScratchpad = 0xbe,
}

impl Command {
    /// The byte put on the wire for this command.
    #[inline]
    pub const fn opcode(self) -> u8 {
        self as u8
    }
}

impl From<Command> for u8 {
    fn from(value: Command) -> Self {
        value.opcode()
    }
}

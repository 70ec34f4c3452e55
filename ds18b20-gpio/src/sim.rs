//! A scripted DS18B20 living directly on the bit primitives.

use std::{collections::VecDeque, convert::Infallible};

use onewire_core::{Command, OneWire, OneWireError, OneWireResult, Presence};

#[derive(Debug)]
pub(crate) struct SimSensor {
    rom: u64,
    raw: u16,
    presence: VecDeque<bool>,
    busy_polls: u32,
    /// Reset slots seen so far.
    pub(crate) resets: usize,
    /// Complete bytes written by the master.
    pub(crate) commands: Vec<u8>,
    incoming: u8,
    incoming_bits: u8,
    outgoing: VecDeque<bool>,
    converting: Option<u32>,
}

impl SimSensor {
    pub(crate) fn new(rom: u64, raw: u16) -> Self {
        Self {
            rom,
            raw,
            presence: VecDeque::new(),
            busy_polls: 0,
            resets: 0,
            commands: Vec::new(),
            incoming: 0,
            incoming_bits: 0,
            outgoing: VecDeque::new(),
            converting: None,
        }
    }

    /// Answers for the first reset slots; once exhausted the sensor is present.
    pub(crate) fn with_presence(mut self, script: impl IntoIterator<Item = bool>) -> Self {
        self.presence = script.into_iter().collect();
        self
    }

    /// Never present at all.
    pub(crate) fn absent(self) -> Self {
        self.with_presence(std::iter::repeat_n(false, 64))
    }

    /// Number of read slots answered with 0 after a conversion starts.
    pub(crate) fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    fn queue_bits(&mut self, value: u64, count: u32) {
        self.outgoing
            .extend((0..count).map(|i| (value >> i) & 0x1 == 0x1));
    }

    fn command(&mut self, byte: u8) {
        self.commands.push(byte);
        match byte {
            b if b == Command::ReadRom.opcode() => self.queue_bits(self.rom, 64),
            b if b == Command::ConvertT.opcode() => self.converting = Some(self.busy_polls),
            b if b == Command::ReadScratchpad.opcode() => {
                self.queue_bits(self.raw.into(), 16);
                // TH, TL, config: the master stops reading before these
                self.queue_bits(0x7f_46_4b, 24);
            }
            _ => {}
        }
    }
}

impl OneWire for SimSensor {
    type BusError = Infallible;

    fn reset(&mut self) -> OneWireResult<Presence, Infallible> {
        self.resets += 1;
        self.incoming = 0;
        self.incoming_bits = 0;
        self.outgoing.clear();
        self.converting = None;
        if self.presence.pop_front().unwrap_or(true) {
            Ok(Presence)
        } else {
            Err(OneWireError::NoDevicePresent)
        }
    }

    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Infallible> {
        if bit {
            self.incoming |= 1 << self.incoming_bits;
        }
        self.incoming_bits += 1;
        if self.incoming_bits == 8 {
            let byte = self.incoming;
            self.incoming = 0;
            self.incoming_bits = 0;
            self.command(byte);
        }
        Ok(())
    }

    fn read_bit(&mut self) -> OneWireResult<bool, Infallible> {
        if let Some(remaining) = self.converting.as_mut() {
            if *remaining == 0 {
                return Ok(true);
            }
            *remaining -= 1;
            return Ok(false);
        }
        // a released line with nobody talking reads high
        Ok(self.outgoing.pop_front().unwrap_or(true))
    }
}

use crate::{
    BitBang, BusLine, BusTimer, OneWire, OneWireError, OneWireResult, Presence,
    PRESENCE_WAIT_US, READ_INIT_LOW_US, READ_RECOVERY_US, READ_SAMPLE_US, RESET_LOW_US,
    RESET_RECOVERY_US, WRITE_0_LOW_US, WRITE_0_RELEASE_US, WRITE_1_LOW_US, WRITE_1_RELEASE_US,
};

impl<L: BusLine, T: BusTimer> OneWire for BitBang<L, T> {
    type BusError = L::Error;

    fn reset(&mut self) -> OneWireResult<Presence, Self::BusError> {
        self.line.set_direction_output(false)?;
        self.timer.delay_us(RESET_LOW_US);
        self.line.set_direction_input()?;
        self.timer.delay_us(PRESENCE_WAIT_US);
        // the sensor answers by holding the line low
        let present = !self.line.read_level()?;
        self.timer.delay_us(RESET_RECOVERY_US);
        if present {
            Ok(Presence)
        } else {
            Err(OneWireError::NoDevicePresent)
        }
    }

    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError> {
        let (low, release) = if bit {
            (WRITE_1_LOW_US, WRITE_1_RELEASE_US)
        } else {
            (WRITE_0_LOW_US, WRITE_0_RELEASE_US)
        };
        self.line.set_direction_output(false)?;
        self.timer.delay_us(low);
        self.line.set_direction_input()?;
        self.timer.delay_us(release);
        Ok(())
    }

    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError> {
        self.line.set_direction_output(false)?;
        self.timer.delay_us(READ_INIT_LOW_US);
        self.line.set_direction_input()?;
        self.timer.delay_us(READ_SAMPLE_US);
        let bit = self.line.read_level()?;
        self.timer.delay_us(READ_RECOVERY_US);
        Ok(bit)
    }
}

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

/// A single bidirectional digital line.
///
/// Only the bus master changes the direction of the line while a transaction is
/// running. Between two operations the line is either driven to a level or
/// released to high impedance, exactly as the next step expects.
pub trait BusLine {
    /// The error type returned by the platform GPIO layer.
    type Error;

    /// Switches the line to output and drives it to `level`.
    ///
    /// # Errors
    /// This method returns an error if the platform fails to reconfigure the pin.
    fn set_direction_output(&mut self, level: bool) -> Result<(), Self::Error>;

    /// Releases the line to a high-impedance input, letting the pull-up resistor
    /// (or the sensor) decide its level.
    ///
    /// # Errors
    /// This method returns an error if the platform fails to reconfigure the pin.
    fn set_direction_input(&mut self) -> Result<(), Self::Error>;

    /// Samples the line.
    ///
    /// # Returns
    /// `true` if the line is high.
    ///
    /// # Errors
    /// This method returns an error if the pin cannot be read.
    fn read_level(&mut self) -> Result<bool, Self::Error>;
}

/// Blocking delays precise enough for 1-Wire slot timing.
///
/// Bus timing tolerances are a few microseconds, tighter than any scheduler
/// tick, so microsecond delays must not yield. Millisecond delays may.
pub trait BusTimer {
    /// Blocks for `us` microseconds.
    fn delay_us(&mut self, us: u32);

    /// Blocks for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

impl<D: DelayNs + ?Sized> BusTimer for D {
    #[inline]
    fn delay_us(&mut self, us: u32) {
        DelayNs::delay_us(self, us)
    }

    #[inline]
    fn delay_ms(&mut self, ms: u32) {
        DelayNs::delay_ms(self, ms)
    }
}

/// An open-drain pin used as a [`BusLine`].
///
/// Driving low pulls the bus down, and "releasing" writes a high level, which
/// an open-drain output turns into high impedance so the pull-up takes over.
#[derive(Debug)]
pub struct OpenDrain<P>(pub P);

impl<P> OpenDrain<P> {
    /// Gives the wrapped pin back.
    pub fn into_inner(self) -> P {
        self.0
    }
}

impl<P: InputPin + OutputPin> BusLine for OpenDrain<P> {
    type Error = P::Error;

    fn set_direction_output(&mut self, level: bool) -> Result<(), Self::Error> {
        if level {
            self.0.set_high()
        } else {
            self.0.set_low()
        }
    }

    fn set_direction_input(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }

    fn read_level(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};

    #[test]
    fn open_drain_maps_directions_to_levels() {
        let expectations = [
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
            PinTransaction::get(State::Low),
            PinTransaction::set(State::High),
        ];
        let mut line = OpenDrain(PinMock::new(&expectations));

        line.set_direction_output(false).unwrap();
        line.set_direction_input().unwrap();
        assert!(!line.read_level().unwrap());
        line.set_direction_output(true).unwrap();

        line.into_inner().done();
    }
}

use std::{thread, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use ds18b20_gpio::{Ds18b20Driver, RawReading, SpinDelay, SysfsLine};
use onewire_bitbang::{BitBang, OneWire, OneWireError};

/// Read a DS18B20 on a bit-banged 1-Wire GPIO line
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// sysfs GPIO number of the bus line
    #[arg(short, long, default_value_t = 4, global = true)]
    pin: u64,
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Cmd {
    /// Take readings through the consumer interface (default)
    Read {
        /// Number of readings to take, 0 to read forever.
        ///
        /// Interrupting a read that never ends skips the teardown, so the
        /// GPIO stays exported; unexport it by hand afterwards.
        #[arg(short, long, default_value_t = 0)]
        count: u64,
        /// Pause between two readings, in milliseconds
        #[arg(short, long, default_value_t = 1000)]
        interval_ms: u64,
    },
    /// Only check for a presence pulse and exit
    Probe,
}

impl Default for Cmd {
    fn default() -> Self {
        Self::Read {
            count: 0,
            interval_ms: 1000,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();
    let line = SysfsLine::export(args.pin)
        .with_context(|| format!("failed to export GPIO {}", args.pin))?;
    let mut bus = BitBang::new(line, SpinDelay);
    bus.idle().context("failed to release the bus line")?;

    let bus = match args.cmd.unwrap_or_default() {
        Cmd::Probe => {
            probe(&mut bus)?;
            bus
        }
        Cmd::Read { count, interval_ms } => {
            match read(bus, count, Duration::from_millis(interval_ms)) {
                Ok(bus) => bus,
                Err(e) => {
                    // the bus went down with the worker; free the pin by number
                    if let Err(u) = SysfsLine::unexport_pin(args.pin) {
                        log::warn!("failed to unexport GPIO {}: {u}", args.pin);
                    }
                    return Err(e);
                }
            }
        }
    };

    let (line, _) = bus.release();
    line.unexport().context("failed to unexport the bus line")?;
    Ok(())
}

fn probe(bus: &mut BitBang<SysfsLine, SpinDelay>) -> anyhow::Result<()> {
    match bus.reset() {
        Ok(_) => log::info!("DS18B20 present"),
        Err(OneWireError::NoDevicePresent) => log::warn!("no presence pulse"),
        Err(OneWireError::Other(e)) => return Err(e).context("reset slot failed"),
    }
    Ok(())
}

fn read(
    bus: BitBang<SysfsLine, SpinDelay>,
    count: u64,
    interval: Duration,
) -> anyhow::Result<BitBang<SysfsLine, SpinDelay>> {
    let driver = Ds18b20Driver::attach(bus, SpinDelay).context("failed to attach the driver")?;
    let device = driver.device();
    let mut buf = [0u8; RawReading::SIZE];
    let mut taken = 0;
    while count == 0 || taken < count {
        thread::sleep(interval);
        if device.trigger_and_read(&mut buf) == RawReading::SIZE {
            let raw = RawReading::from_ne_bytes(buf);
            log::info!("Raw temperature {raw} ({} °C)", raw.celsius());
        }
        taken += 1;
    }
    driver.detach().context("failed to detach the driver")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_is_the_default_command() {
        let args = Args::try_parse_from(["ds18b20-gpio"]).unwrap();
        assert_eq!(args.pin, 4);
        assert_eq!(args.cmd.unwrap_or_default(), Cmd::default());
    }

    #[test]
    fn read_subcommand_takes_count_and_interval() {
        let args =
            Args::try_parse_from(["ds18b20-gpio", "read", "--count", "3", "-i", "250"]).unwrap();
        assert_eq!(
            args.cmd,
            Some(Cmd::Read {
                count: 3,
                interval_ms: 250
            })
        );
    }

    #[test]
    fn presence_check_accepts_a_global_pin() {
        let args = Args::try_parse_from(["ds18b20-gpio", "probe", "--pin", "17"]).unwrap();
        assert_eq!(args.pin, 17);
        assert_eq!(args.cmd, Some(Cmd::Probe));
    }

    #[test]
    fn presence_check_takes_no_read_options() {
        assert!(Args::try_parse_from(["ds18b20-gpio", "probe", "--count", "3"]).is_err());
        assert!(Args::try_parse_from(["ds18b20-gpio", "--probe"]).is_err());
    }
}

//! Pin and bus access used by the drivers.
//!
//! The drivers never touch hardware directly. Pins are addressed by their
//! BCM number through [`Gpio`]; the port expander goes through [`I2cBus`]
//! (any `embedded-hal` I2C implementation fits via [`HalI2c`]); the
//! microcontroller link goes through [`SerialPort`].

use std::thread;
use std::time::Duration;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::{Write, WriteRead};

use crate::error::BusError;

/// Logic level of a digital line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_low(self) -> bool {
        self == Level::Low
    }
}

impl core::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Internal bias resistor on an input line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pull {
    Up,
    Down,
    Off,
}

/// Digital pins, addressed by BCM number.
pub trait Gpio {
    fn set_direction(&mut self, pin: u8, direction: Direction) -> Result<(), BusError>;
    fn set_pull(&mut self, pin: u8, pull: Pull) -> Result<(), BusError>;
    fn set_level(&mut self, pin: u8, level: Level) -> Result<(), BusError>;
    fn read_level(&mut self, pin: u8) -> Result<Level, BusError>;
}

/// Register access on an I2C device.
pub trait I2cBus {
    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError>;
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError>;
}

/// Adapts a blocking `embedded-hal` I2C master to [`I2cBus`].
pub struct HalI2c<T>(pub T);

impl<T> I2cBus for HalI2c<T>
where
    T: Write + WriteRead,
{
    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        self.0
            .write(address, &[register, value])
            .map_err(|_| BusError::I2c { address, register })
    }

    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        let mut buf = [0u8; 1];
        self.0
            .write_read(address, &[register], &mut buf)
            .map_err(|_| BusError::I2c { address, register })?;
        Ok(buf[0])
    }
}

/// A byte-oriented serial link.
pub trait SerialPort {
    fn write_byte(&mut self, byte: u8) -> Result<(), BusError>;
    /// Push out what was written and throw away received bytes nobody has
    /// read, so the next reply starts on a frame boundary.
    fn flush(&mut self) -> Result<(), BusError>;
    /// Number of received bytes waiting to be read.
    fn available(&mut self) -> Result<usize, BusError>;
    fn read_byte(&mut self) -> Result<u8, BusError>;
}

/// `DelayMs` backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayMs<u32> for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}

//! In-memory buses for the unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use embedded_hal::blocking::delay::DelayMs;

use crate::bus::{Direction, Gpio, I2cBus, Level, Pull, SerialPort};
use crate::error::BusError;

#[derive(Default)]
pub struct GpioState {
    pub directions: HashMap<u8, Direction>,
    pub driven: HashMap<u8, Level>,
    pub pulls: HashMap<u8, Pull>,
    /// Levels of plain input lines; unset lines float high.
    pub inputs: HashMap<u8, Level>,
    pub row_pins: Vec<u8>,
    pub col_pins: Vec<u8>,
    /// Closed switches in the membrane, by (row, col).
    pub closed: HashSet<(usize, usize)>,
    /// Most rows seen driven low at the same time during a read.
    pub max_active_rows: usize,
    pub fail_reads: bool,
}

impl GpioState {
    fn row_active(&self, row: usize) -> bool {
        let pin = self.row_pins[row];
        self.directions.get(&pin) == Some(&Direction::Output)
            && self.driven.get(&pin) == Some(&Level::Low)
    }
}

/// A Raspberry Pi header with an optional membrane wired across it.
#[derive(Clone, Default)]
pub struct FakeGpio(pub Rc<RefCell<GpioState>>);

impl FakeGpio {
    pub fn with_matrix(row_pins: &[u8], col_pins: &[u8]) -> Self {
        let gpio = Self::default();
        {
            let mut s = gpio.0.borrow_mut();
            s.row_pins = row_pins.to_vec();
            s.col_pins = col_pins.to_vec();
        }
        gpio
    }

    pub fn close(&self, row: usize, col: usize) {
        self.0.borrow_mut().closed.insert((row, col));
    }

    pub fn open(&self, row: usize, col: usize) {
        self.0.borrow_mut().closed.remove(&(row, col));
    }

    pub fn set_input(&self, pin: u8, level: Level) {
        self.0.borrow_mut().inputs.insert(pin, level);
    }
}

impl Gpio for FakeGpio {
    fn set_direction(&mut self, pin: u8, direction: Direction) -> Result<(), BusError> {
        self.0.borrow_mut().directions.insert(pin, direction);
        Ok(())
    }

    fn set_pull(&mut self, pin: u8, pull: Pull) -> Result<(), BusError> {
        self.0.borrow_mut().pulls.insert(pin, pull);
        Ok(())
    }

    fn set_level(&mut self, pin: u8, level: Level) -> Result<(), BusError> {
        self.0.borrow_mut().driven.insert(pin, level);
        Ok(())
    }

    fn read_level(&mut self, pin: u8) -> Result<Level, BusError> {
        let mut s = self.0.borrow_mut();
        if s.fail_reads {
            return Err(BusError::Gpio {
                pin,
                reason: "read failed".to_string(),
            });
        }
        let active_rows = (0..s.row_pins.len()).filter(|&r| s.row_active(r)).count();
        s.max_active_rows = s.max_active_rows.max(active_rows);

        if let Some(col) = s.col_pins.iter().position(|&p| p == pin) {
            let pulled_low = s
                .closed
                .iter()
                .any(|&(r, c)| c == col && s.row_active(r));
            return Ok(if pulled_low { Level::Low } else { Level::High });
        }
        Ok(s.inputs.get(&pin).copied().unwrap_or(Level::High))
    }
}

#[derive(Default)]
pub struct I2cState {
    pub regs: HashMap<(u8, u8), u8>,
    pub writes: Vec<(u8, u8, u8)>,
    pub present: bool,
    pub fail_reads: bool,
}

#[derive(Clone, Default)]
pub struct FakeI2c(pub Rc<RefCell<I2cState>>);

impl FakeI2c {
    pub fn with_device(address: u8) -> Self {
        let bus = Self::default();
        let mut s = bus.0.borrow_mut();
        s.present = true;
        s.regs.insert((address, 0x09), 0);
        drop(s);
        bus
    }

    pub fn set(&self, address: u8, register: u8, value: u8) {
        self.0.borrow_mut().regs.insert((address, register), value);
    }
}

impl I2cBus for FakeI2c {
    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        let mut s = self.0.borrow_mut();
        if !s.present {
            return Err(BusError::I2c { address, register });
        }
        s.writes.push((address, register, value));
        s.regs.insert((address, register), value);
        Ok(())
    }

    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        let s = self.0.borrow();
        if !s.present || s.fail_reads {
            return Err(BusError::I2c { address, register });
        }
        Ok(s.regs.get(&(address, register)).copied().unwrap_or(0))
    }
}

#[derive(Default)]
pub struct SerialState {
    pub written: Vec<u8>,
    pub rx: VecDeque<u8>,
    /// Replies queued up, one per request byte received.
    pub replies: VecDeque<Vec<u8>>,
    /// Each `available()` call releases at most this many reply bytes.
    pub trickle: Option<usize>,
    pub pending: VecDeque<u8>,
    pub fail: bool,
}

/// A microcontroller on the other end of a serial line that answers each
/// request byte with the next queued reply.
#[derive(Clone, Default)]
pub struct FakeSerial(pub Rc<RefCell<SerialState>>);

impl FakeSerial {
    pub fn reply(&self, bytes: &[u8]) {
        self.0.borrow_mut().replies.push_back(bytes.to_vec());
    }
}

impl SerialPort for FakeSerial {
    fn write_byte(&mut self, byte: u8) -> Result<(), BusError> {
        let mut s = self.0.borrow_mut();
        if s.fail {
            return Err(BusError::Serial("write failed".to_string()));
        }
        s.written.push(byte);
        if let Some(reply) = s.replies.pop_front() {
            s.pending.extend(reply);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BusError> {
        self.0.borrow_mut().rx.clear();
        Ok(())
    }

    fn available(&mut self) -> Result<usize, BusError> {
        let mut s = self.0.borrow_mut();
        if s.fail {
            return Err(BusError::Serial("port closed".to_string()));
        }
        let n = s.trickle.unwrap_or(usize::MAX).min(s.pending.len());
        for _ in 0..n {
            if let Some(b) = s.pending.pop_front() {
                s.rx.push_back(b);
            }
        }
        Ok(s.rx.len())
    }

    fn read_byte(&mut self) -> Result<u8, BusError> {
        self.0
            .borrow_mut()
            .rx
            .pop_front()
            .ok_or_else(|| BusError::Serial("nothing to read".to_string()))
    }
}

/// Delay that returns immediately but remembers how long it was asked for.
#[derive(Clone, Default)]
pub struct NoDelay(pub Rc<RefCell<u32>>);

impl DelayMs<u32> for NoDelay {
    fn delay_ms(&mut self, ms: u32) {
        *self.0.borrow_mut() += ms;
    }
}

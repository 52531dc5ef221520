//! MCP23008 I2C joystick controller.
//!
//! The joystick's eight lines go straight into the expander's GP0-GP7. All
//! eight pins are inputs with the internal pull-ups on; the host reads GPIO in
//! one transaction per poll and each bit maps to one joystick line.

use hermit_keymap::JoystickButton;
use tracing::debug;

use crate::bus::I2cBus;
use crate::clock::{Clock, SystemClock};
use crate::config::{ExpanderConfig, ExpanderLine};
use crate::debounce::DebounceTimer;
use crate::error::{BusError, Error};
use crate::event::{DeviceId, EventSink, Input, Transition, Translator};
use crate::host::{Driver, UiState};
use crate::state::PressTable;

// MCP23008 registers
const IODIR: u8 = 0x00; // I/O direction, 1 = input
const GPPU: u8 = 0x06; // pull-up enable
const GPIO: u8 = 0x09; // port

pub struct Mcp23008<B: I2cBus, C: Clock = SystemClock> {
    bus: B,
    address: u8,
    lines: Vec<ExpanderLine>,
    state: PressTable<JoystickButton>,
    debounce: DebounceTimer<C>,
    debounce_ms: u64,
    menu_multiplier: u64,
    translator: Translator,
}

impl<B: I2cBus, C: Clock> Mcp23008<B, C> {
    pub fn new(bus: B, config: &ExpanderConfig, clock: C) -> Result<Self, Error> {
        for (i, line) in config.lines.iter().enumerate() {
            if line.mask.count_ones() != 1 {
                return Err(Error::Config(format!(
                    "expander: mask {:#04x} must have exactly one bit set",
                    line.mask
                )));
            }
            if config.lines[..i].iter().any(|l| l.mask == line.mask) {
                return Err(Error::Config(format!(
                    "expander: mask {:#04x} is used twice",
                    line.mask
                )));
            }
        }
        let state = PressTable::new(config.lines.iter().map(|l| l.button))?;

        Ok(Self {
            bus,
            address: config.address,
            lines: config.lines.clone(),
            state,
            debounce: DebounceTimer::new(clock),
            debounce_ms: config.debounce_ms,
            menu_multiplier: config.menu_multiplier,
            translator: Translator::new(DeviceId::Expander),
        })
    }

    /// All pins input, all pull-ups on.
    pub fn configure(&mut self) -> Result<(), BusError> {
        self.bus.write_register(self.address, IODIR, 0xFF)?;
        self.bus.write_register(self.address, GPPU, 0xFF)?;
        Ok(())
    }

    pub fn read_port(&mut self) -> Result<u8, BusError> {
        self.bus.read_register(self.address, GPIO)
    }

    /// Returns the lines that changed since the last accepted scan.
    pub fn scan(&mut self, interval_ms: u64) -> Vec<(JoystickButton, Transition)> {
        if self.debounce.should_discard(interval_ms) {
            return Vec::new();
        }
        let port = match self.read_port() {
            Ok(port) => port,
            Err(err) => {
                debug!(error = %err, "expander read failed");
                return Vec::new();
            }
        };
        let mut changes = Vec::new();
        for line in &self.lines {
            if let Some(transition) = self.state.update(line.button, port & line.mask != 0) {
                changes.push((line.button, transition));
            }
        }
        changes
    }

    pub fn interval_ms(&self, ui: UiState) -> u64 {
        ui.scale(self.debounce_ms, self.menu_multiplier)
    }

    pub fn is_pressed(&self, button: JoystickButton) -> bool {
        self.state.is_pressed(button)
    }
}

impl<B: I2cBus, C: Clock> Driver for Mcp23008<B, C> {
    fn name(&self) -> &'static str {
        "mcp23008 joystick"
    }

    fn init(&mut self) -> Result<(), Error> {
        Ok(self.configure()?)
    }

    fn poll(&mut self, ui: UiState, sink: &mut dyn EventSink) {
        let interval = self.interval_ms(ui);
        for (button, transition) in self.scan(interval) {
            self.translator
                .dispatch(Input::Joystick(button), transition, &mut self.debounce, sink);
        }
    }
}

//! Joystick lines wired directly to GPIO pins.
//!
//! No matrix here: every direction and fire button has its own pin. A line at
//! its active level is a held button; one debounce interval gates the whole
//! scan.

use hermit_keymap::JoystickButton;
use tracing::debug;

use crate::bus::{Direction, Gpio, Level, Pull};
use crate::clock::{Clock, SystemClock};
use crate::config::{check_distinct_pins, JoystickConfig, LineConfig};
use crate::debounce::DebounceTimer;
use crate::error::{BusError, Error};
use crate::event::{DeviceId, EventSink, Input, Transition, Translator};
use crate::host::{Driver, UiState};
use crate::state::PressTable;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LineTransition {
    pub button: JoystickButton,
    pub transition: Transition,
}

pub struct GpioJoystick<G: Gpio, C: Clock = SystemClock> {
    gpio: G,
    lines: Vec<LineConfig>,
    state: PressTable<JoystickButton>,
    debounce: DebounceTimer<C>,
    debounce_ms: u64,
    menu_multiplier: u64,
    translator: Translator,
}

impl<G: Gpio, C: Clock> GpioJoystick<G, C> {
    pub fn new(gpio: G, config: &JoystickConfig, clock: C) -> Result<Self, Error> {
        let pins: Vec<u8> = config.lines.iter().map(|l| l.pin).collect();
        check_distinct_pins("joystick", &pins)?;
        let state = PressTable::new(config.lines.iter().map(|l| l.button))?;

        Ok(Self {
            gpio,
            lines: config.lines.clone(),
            state,
            debounce: DebounceTimer::new(clock),
            debounce_ms: config.debounce_ms,
            menu_multiplier: config.menu_multiplier,
            translator: Translator::new(DeviceId::GpioJoystick),
        })
    }

    pub fn init_gpio(&mut self) -> Result<(), BusError> {
        for line in &self.lines {
            self.gpio.set_direction(line.pin, Direction::Input)?;
            let pull = if line.active_low { Pull::Up } else { Pull::Down };
            self.gpio.set_pull(line.pin, pull)?;
        }
        Ok(())
    }

    /// Read every line. Returns (button, active) in configuration order.
    pub fn sample(&mut self) -> Result<Vec<(JoystickButton, bool)>, BusError> {
        let mut readings = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            let level = self.gpio.read_level(line.pin)?;
            let active = if line.active_low {
                level == Level::Low
            } else {
                level == Level::High
            };
            readings.push((line.button, active));
        }
        Ok(readings)
    }

    pub fn scan(&mut self, interval_ms: u64) -> Vec<LineTransition> {
        if self.debounce.should_discard(interval_ms) {
            return Vec::new();
        }
        let readings = match self.sample() {
            Ok(readings) => readings,
            Err(err) => {
                debug!(error = %err, "joystick read failed");
                return Vec::new();
            }
        };
        readings
            .into_iter()
            .filter_map(|(button, active)| {
                self.state
                    .update(button, active)
                    .map(|transition| LineTransition { button, transition })
            })
            .collect()
    }

    pub fn interval_ms(&self, ui: UiState) -> u64 {
        ui.scale(self.debounce_ms, self.menu_multiplier)
    }

    pub fn is_pressed(&self, button: JoystickButton) -> bool {
        self.state.is_pressed(button)
    }
}

impl<G: Gpio, C: Clock> Driver for GpioJoystick<G, C> {
    fn name(&self) -> &'static str {
        "gpio joystick"
    }

    fn init(&mut self) -> Result<(), Error> {
        Ok(self.init_gpio()?)
    }

    fn poll(&mut self, ui: UiState, sink: &mut dyn EventSink) {
        let interval = self.interval_ms(ui);
        for t in self.scan(interval) {
            self.translator.dispatch(
                Input::Joystick(t.button),
                t.transition,
                &mut self.debounce,
                sink,
            );
        }
    }
}

//! The ZX Zero's emulator-menu button.
//!
//! One pulled-up GPIO line. Pressing it opens the emulator menu (`F1`), or
//! backs out of it (`Escape`) when a menu is already showing. The interval is
//! long so that one press does not open the menu and immediately close it.

use hermit_keymap::InputKey;
use tracing::debug;

use crate::bus::{Direction, Gpio, Pull};
use crate::clock::{Clock, SystemClock};
use crate::config::MenuButtonConfig;
use crate::debounce::DebounceTimer;
use crate::error::Error;
use crate::event::{DeviceId, EventSink, Input, Transition, Translator};
use crate::host::{Driver, UiState};

/// The key the menu button stands for in the given UI state.
pub fn menu_key(ui: UiState) -> InputKey {
    match ui {
        UiState::Emulation => InputKey::F1,
        UiState::Menu => InputKey::Escape,
    }
}

pub struct MenuButton<G: Gpio, C: Clock = SystemClock> {
    gpio: G,
    pin: u8,
    debounce: DebounceTimer<C>,
    debounce_ms: u64,
    /// Key sent with the press still held, so the release matches it.
    held: Option<InputKey>,
    translator: Translator,
}

impl<G: Gpio, C: Clock> MenuButton<G, C> {
    pub fn new(gpio: G, config: &MenuButtonConfig, clock: C) -> Self {
        Self {
            gpio,
            pin: config.pin,
            debounce: DebounceTimer::new(clock),
            debounce_ms: config.debounce_ms,
            held: None,
            translator: Translator::new(DeviceId::MenuButton),
        }
    }

    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }
}

impl<G: Gpio, C: Clock> Driver for MenuButton<G, C> {
    fn name(&self) -> &'static str {
        "menu button"
    }

    fn init(&mut self) -> Result<(), Error> {
        self.gpio.set_direction(self.pin, Direction::Input)?;
        self.gpio.set_pull(self.pin, Pull::Up)?;
        Ok(())
    }

    fn poll(&mut self, ui: UiState, sink: &mut dyn EventSink) {
        if self.debounce.should_discard(self.debounce_ms) {
            return;
        }
        let pressed = match self.gpio.read_level(self.pin) {
            Ok(level) => level.is_low(),
            Err(err) => {
                debug!(error = %err, "menu button read failed");
                return;
            }
        };

        match (pressed, self.held) {
            (true, None) => {
                let key = menu_key(ui);
                self.held = Some(key);
                self.translator
                    .dispatch(Input::Key(key), Transition::Pressed, &mut self.debounce, sink);
            }
            (false, Some(key)) => {
                self.held = None;
                self.translator
                    .dispatch(Input::Key(key), Transition::Released, &mut self.debounce, sink);
            }
            _ => {}
        }
    }
}

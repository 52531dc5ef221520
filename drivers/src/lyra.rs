//! Hermit Retro Lyra handheld: buttons behind an ATmega32u4 on a serial line.
//!
//! Every poll asks the 32u4 for a packet by writing `0xAA`, waits for the five
//! byte reply and decodes it. Each button then goes through the same
//! press/release bookkeeping as a GPIO line, and its configured action
//! decides what the emulator sees.

use embedded_hal::blocking::delay::DelayMs;
use hermit_keymap::{InputKey, JoystickButton};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bus::SerialPort;
use crate::clock::{Clock, SystemClock};
use crate::config::{ButtonBinding, LyraConfig};
use crate::debounce::DebounceTimer;
use crate::error::{BusError, Error};
use crate::event::{DeviceId, EventSink, Input, Transition, Translator};
use crate::host::{Driver, UiState};
use crate::menu::menu_key;
use crate::packet::{self, DecodedButtons, LyraButton, PACKET_LEN, REQUEST};
use crate::state::PressTable;

pub const VOLUME_STEP: u8 = 10;
pub const VOLUME_MAX: u8 = 40;

/// What pressing a Lyra button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonAction {
    /// Open the emulator menu, or back out of it.
    Menu,
    Joystick(JoystickButton),
    Key(InputKey),
    VolumeUp,
    VolumeDown,
}

pub struct LyraController<S: SerialPort, D: DelayMs<u32>, C: Clock = SystemClock> {
    port: S,
    delay: D,
    bindings: Vec<ButtonBinding>,
    state: PressTable<LyraButton>,
    debounce: DebounceTimer<C>,
    debounce_ms: u64,
    menu_multiplier: u64,
    settle_ms: u32,
    timeout_ms: u32,
    step_ms: u32,
    volume: u8,
    battery: Option<u8>,
    menu_held: Option<InputKey>,
    translator: Translator,
}

impl<S: SerialPort, D: DelayMs<u32>, C: Clock> LyraController<S, D, C> {
    /// Buttons without a binding are never reported.
    pub fn new(port: S, delay: D, config: &LyraConfig, clock: C) -> Result<Self, Error> {
        let state = PressTable::new(config.bindings.iter().map(|b| b.button))?;
        if config.volume > VOLUME_MAX {
            return Err(Error::Config(format!(
                "lyra: volume {} is above {VOLUME_MAX}",
                config.volume
            )));
        }

        Ok(Self {
            port,
            delay,
            bindings: config.bindings.clone(),
            state,
            debounce: DebounceTimer::new(clock),
            debounce_ms: config.debounce_ms,
            menu_multiplier: config.menu_multiplier,
            settle_ms: config.settle_ms,
            timeout_ms: config.timeout_ms.max(config.settle_ms),
            step_ms: config.step_ms.max(1),
            volume: config.volume,
            battery: None,
            menu_held: None,
            translator: Translator::new(DeviceId::Lyra),
        })
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Last battery level reported by the controller.
    pub fn battery(&self) -> Option<u8> {
        self.battery
    }

    pub fn is_pressed(&self, button: LyraButton) -> bool {
        self.state.is_pressed(button)
    }

    pub fn interval_ms(&self, ui: UiState) -> u64 {
        ui.scale(self.debounce_ms, self.menu_multiplier)
    }

    /// Request one packet and wait for it.
    ///
    /// Returns `None` if the controller did not answer in time, or answered
    /// with more than one packet's worth of bytes; in the latter case the
    /// link is out of step and everything pending is thrown away.
    pub fn request(&mut self) -> Result<Option<[u8; PACKET_LEN]>, BusError> {
        self.port.write_byte(REQUEST)?;
        self.port.flush()?;
        self.delay.delay_ms(self.settle_ms);

        let mut waited = self.settle_ms;
        loop {
            let available = self.port.available()?;
            if available == PACKET_LEN {
                let mut raw = [0; PACKET_LEN];
                for byte in &mut raw {
                    *byte = self.port.read_byte()?;
                }
                return Ok(Some(raw));
            }
            if available > PACKET_LEN {
                debug!(available, "lyra reply overran, draining");
                for _ in 0..available {
                    self.port.read_byte()?;
                }
                return Ok(None);
            }
            if waited >= self.timeout_ms {
                return Ok(None);
            }
            let step = self.step_ms.min(self.timeout_ms - waited);
            self.delay.delay_ms(step);
            waited += step;
        }
    }

    /// Apply one decoded packet. Only buttons the packet decided on are
    /// touched; a mistagged byte or an exclusive match leaves the rest as they
    /// were.
    pub fn apply(&mut self, decoded: &DecodedButtons, ui: UiState, sink: &mut dyn EventSink) {
        if decoded.battery.is_some() {
            self.battery = decoded.battery;
        }
        for (button, active) in decoded.readings() {
            if let Some(transition) = self.state.update(button, active) {
                self.act(button, transition, ui, sink);
            }
        }
    }

    fn act(
        &mut self,
        button: LyraButton,
        transition: Transition,
        ui: UiState,
        sink: &mut dyn EventSink,
    ) {
        let Some(action) = self
            .bindings
            .iter()
            .find(|b| b.button == button)
            .map(|b| b.action)
        else {
            return;
        };

        match (action, transition) {
            (ButtonAction::Menu, Transition::Pressed) => {
                let key = menu_key(ui);
                self.menu_held = Some(key);
                self.dispatch(Input::Key(key), transition, sink);
            }
            (ButtonAction::Menu, Transition::Released) => {
                if let Some(key) = self.menu_held.take() {
                    self.dispatch(Input::Key(key), transition, sink);
                }
            }
            (ButtonAction::Joystick(b), _) => self.dispatch(Input::Joystick(b), transition, sink),
            (ButtonAction::Key(k), _) => self.dispatch(Input::Key(k), transition, sink),
            (ButtonAction::VolumeUp, Transition::Pressed) => {
                self.volume = (self.volume + VOLUME_STEP).min(VOLUME_MAX);
                info!(volume = self.volume, "volume up");
            }
            (ButtonAction::VolumeDown, Transition::Pressed) => {
                self.volume = self.volume.saturating_sub(VOLUME_STEP);
                info!(volume = self.volume, "volume down");
            }
            (ButtonAction::VolumeUp | ButtonAction::VolumeDown, Transition::Released) => {}
        }
    }

    fn dispatch(&mut self, input: Input, transition: Transition, sink: &mut dyn EventSink) {
        self.translator.dispatch(input, transition, &mut self.debounce, sink);
    }
}

impl<S: SerialPort, D: DelayMs<u32>, C: Clock> Driver for LyraController<S, D, C> {
    fn name(&self) -> &'static str {
        "lyra"
    }

    fn init(&mut self) -> Result<(), Error> {
        // drop anything the 32u4 sent before we were listening
        let stale = self.port.available()?;
        for _ in 0..stale {
            self.port.read_byte()?;
        }
        Ok(())
    }

    fn poll(&mut self, ui: UiState, sink: &mut dyn EventSink) {
        if self.debounce.should_discard(self.interval_ms(ui)) {
            return;
        }
        match self.request() {
            Ok(Some(raw)) => match packet::decode(&raw) {
                Ok(decoded) => self.apply(&decoded, ui, sink),
                Err(err) => debug!(error = %err, "lyra packet dropped"),
            },
            Ok(None) => debug!("no lyra packet"),
            Err(err) => debug!(error = %err, "lyra exchange failed"),
        }
        self.debounce.record_event();
    }
}

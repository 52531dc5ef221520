//! Per-board configuration.
//!
//! Everything here is fixed for a given hardware variant and read once at
//! startup. `Config::default()` describes the Hermit Retro ZX Zero / Lyra
//! boards on a Raspberry Pi header (pins are BCM numbers).

use std::fs;
use std::path::Path;

use hermit_keymap::{InputKey, JoystickButton, COLS, ROWS};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::lyra::ButtonAction;
use crate::packet::LyraButton;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub membrane: MembraneConfig,
    pub joystick: JoystickConfig,
    pub menu_button: MenuButtonConfig,
    pub expander: ExpanderConfig,
    pub lyra: LyraConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembraneConfig {
    pub debounce_ms: u64,
    /// Interval multiplier while the emulator menu is open.
    pub menu_multiplier: u64,
    pub row_pins: [u8; ROWS],
    /// Column pins, in keymap column order.
    pub col_pins: [u8; COLS],
}

impl Default for MembraneConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            menu_multiplier: 5,
            // J8 header pins 33, 31, 29, 32, 26, 22, 18, 16
            row_pins: [13, 6, 5, 12, 7, 25, 24, 23],
            // J8 header pins 36, 38, 40, 35, 37
            col_pins: [16, 20, 21, 19, 26],
        }
    }
}

/// One joystick line wired straight to a GPIO pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineConfig {
    pub button: JoystickButton,
    pub pin: u8,
    /// Pulled up and shorted to ground when pressed.
    #[serde(default = "default_active_low")]
    pub active_low: bool,
}

fn default_active_low() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoystickConfig {
    pub debounce_ms: u64,
    pub menu_multiplier: u64,
    pub lines: Vec<LineConfig>,
}

impl Default for JoystickConfig {
    fn default() -> Self {
        let line = |button, pin| LineConfig {
            button,
            pin,
            active_low: true,
        };
        Self {
            debounce_ms: 50,
            menu_multiplier: 3,
            // J8 header pins 7, 8, 10, 12, 11, 13
            lines: vec![
                line(JoystickButton::Up, 4),
                line(JoystickButton::Down, 14),
                line(JoystickButton::Left, 15),
                line(JoystickButton::Right, 18),
                line(JoystickButton::Fire1, 17),
                line(JoystickButton::Fire2, 27),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuButtonConfig {
    pub pin: u8,
    pub debounce_ms: u64,
}

impl Default for MenuButtonConfig {
    fn default() -> Self {
        Self {
            // J8 header pin 15
            pin: 22,
            debounce_ms: 250,
        }
    }
}

/// One input bit of the port expander's GPIO register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpanderLine {
    pub mask: u8,
    pub button: JoystickButton,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpanderConfig {
    pub address: u8,
    pub debounce_ms: u64,
    pub menu_multiplier: u64,
    pub lines: Vec<ExpanderLine>,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        let line = |mask, button| ExpanderLine { mask, button };
        Self {
            address: 0x20,
            // the controller board shares the menu button's interval
            debounce_ms: 250,
            menu_multiplier: 1,
            lines: vec![
                line(0x01, JoystickButton::Left),
                line(0x02, JoystickButton::Right),
                line(0x04, JoystickButton::Up),
                line(0x08, JoystickButton::Down),
                line(0x10, JoystickButton::Fire3),
                line(0x20, JoystickButton::Fire4),
                line(0x40, JoystickButton::Fire1),
                line(0x80, JoystickButton::Fire2),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonBinding {
    pub button: LyraButton,
    pub action: ButtonAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyraConfig {
    /// Serial device of the controller's microcontroller.
    pub port: String,
    pub baud: u32,
    pub debounce_ms: u64,
    pub menu_multiplier: u64,
    /// Pause after the request byte before looking for a reply.
    pub settle_ms: u32,
    /// Total time to wait for a full packet, counted from the request.
    pub timeout_ms: u32,
    /// Granularity of the wait.
    pub step_ms: u32,
    /// Volume at startup, 0 to 40.
    pub volume: u8,
    pub bindings: Vec<ButtonBinding>,
}

impl Default for LyraConfig {
    fn default() -> Self {
        let bind = |button, action| ButtonBinding { button, action };
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud: 9600,
            debounce_ms: 50,
            menu_multiplier: 5,
            settle_ms: 50,
            timeout_ms: 75,
            step_ms: 5,
            volume: 20,
            bindings: vec![
                bind(LyraButton::TopLeft, ButtonAction::Menu),
                bind(LyraButton::TopRight, ButtonAction::Joystick(JoystickButton::Fire4)),
                bind(LyraButton::LeftUp, ButtonAction::Joystick(JoystickButton::Up)),
                bind(LyraButton::LeftLeft, ButtonAction::Joystick(JoystickButton::Left)),
                bind(LyraButton::LeftRight, ButtonAction::Joystick(JoystickButton::Right)),
                bind(LyraButton::LeftDown, ButtonAction::Joystick(JoystickButton::Down)),
                bind(LyraButton::RightUp, ButtonAction::Key(InputKey::Up)),
                bind(LyraButton::RightLeft, ButtonAction::Key(InputKey::Left)),
                bind(LyraButton::RightRight, ButtonAction::Key(InputKey::Right)),
                bind(LyraButton::RightDown, ButtonAction::Key(InputKey::Down)),
                bind(LyraButton::BottomRight1, ButtonAction::Joystick(JoystickButton::Fire1)),
                bind(LyraButton::BottomRight2, ButtonAction::Joystick(JoystickButton::Fire2)),
                bind(LyraButton::BottomRight3, ButtonAction::Joystick(JoystickButton::Fire3)),
                bind(LyraButton::VolumeUp, ButtonAction::VolumeUp),
                bind(LyraButton::VolumeDown, ButtonAction::VolumeDown),
            ],
        }
    }
}

/// Reject pin tables that wire two functions to the same pin.
pub(crate) fn check_distinct_pins(what: &str, pins: &[u8]) -> Result<(), Error> {
    for (i, pin) in pins.iter().enumerate() {
        if pins[..i].contains(pin) {
            return Err(Error::Config(format!("{what}: pin {pin} is used twice")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_json() {
        let config = Config::default();
        let text = config.to_json().unwrap();
        assert_eq!(Config::from_json(&text).unwrap(), config);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = Config::from_json(r#"{ "menu_button": { "pin": 3 } }"#).unwrap();
        assert_eq!(config.menu_button.pin, 3);
        assert_eq!(config.menu_button.debounce_ms, 250);
        assert_eq!(config.expander.debounce_ms, 250);
        assert_eq!(config.membrane, MembraneConfig::default());
    }

    #[test]
    fn line_polarity_defaults_to_active_low() {
        let config = Config::from_json(
            r#"{ "joystick": { "lines": [ { "button": "Fire1", "pin": 17 } ] } }"#,
        )
        .unwrap();
        assert!(config.joystick.lines[0].active_low);
        assert_eq!(config.joystick.debounce_ms, 50);
    }

    #[test]
    fn bad_json_is_reported() {
        assert!(matches!(Config::from_json("{"), Err(Error::Json(_))));
    }

    #[test]
    fn duplicate_pins_are_rejected() {
        assert!(check_distinct_pins("rows", &[1, 2, 3]).is_ok());
        assert!(matches!(
            check_distinct_pins("rows", &[1, 2, 1]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn default_pins_do_not_overlap() {
        let config = Config::default();
        let mut pins: Vec<u8> = Vec::new();
        pins.extend(config.membrane.row_pins);
        pins.extend(config.membrane.col_pins);
        pins.extend(config.joystick.lines.iter().map(|l| l.pin));
        pins.push(config.menu_button.pin);
        assert!(check_distinct_pins("board", &pins).is_ok());
    }
}

//! Input drivers for the Hermit Retro ZX Spectrum boards.
//!
//! Everything here is polled from the emulator's main loop:
//! - Membrane keyboard matrix scanning (8 rows x 5 columns over GPIO)
//! - Joystick lines wired straight to GPIO, or behind an MCP23008 expander
//! - The ZX Zero menu button
//! - The Lyra handheld's serial controller (5-byte checksummed packets)
//! - Timestamp debouncing, stretched while the emulator menu is open
//!
//! Each driver turns press/release transitions into [`InputEvent`]s for an
//! [`EventSink`]. Pins and buses are reached through the traits in [`bus`].

pub mod bus;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod error;
pub mod event;
pub mod expander;
pub mod host;
pub mod joystick;
pub mod lyra;
pub mod matrix;
pub mod menu;
pub mod packet;
pub mod state;

#[cfg(test)]
mod mock;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use debounce::DebounceTimer;
pub use error::{BusError, Error, PacketError};
pub use event::{DeviceId, EventKind, EventSink, Input, InputEvent, Transition, Translator};
pub use expander::Mcp23008;
pub use host::{Driver, Host, UiState};
pub use joystick::GpioJoystick;
pub use lyra::{ButtonAction, LyraController};
pub use matrix::Membrane;
pub use menu::MenuButton;

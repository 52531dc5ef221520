//! Driver lifecycle: start every registered peripheral, poll the live ones.
//!
//! A driver whose initialization fails is reported and dropped; the emulator
//! carries on without that peripheral. Once running, a driver never fails a
//! poll: bus errors and bad packets just mean no events that cycle.

use tracing::{info, warn};

use crate::error::Error;
use crate::event::EventSink;

/// Whether the emulator is showing its own menu/overlay.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum UiState {
    #[default]
    Emulation,
    Menu,
}

impl UiState {
    /// Stretch a base debounce interval while a menu is open.
    pub fn scale(self, base_ms: u64, menu_multiplier: u64) -> u64 {
        match self {
            UiState::Emulation => base_ms,
            UiState::Menu => base_ms.saturating_mul(menu_multiplier),
        }
    }
}

pub trait Driver {
    fn name(&self) -> &'static str;

    /// Configure pins or open the bus. Called once before the first poll.
    fn init(&mut self) -> Result<(), Error>;

    /// Sample the device and push any resulting events.
    fn poll(&mut self, ui: UiState, sink: &mut dyn EventSink);

    fn shutdown(&mut self) {}
}

#[derive(Default)]
pub struct Host {
    registered: Vec<Box<dyn Driver>>,
    running: Vec<Box<dyn Driver>>,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, driver: Box<dyn Driver>) {
        self.registered.push(driver);
    }

    /// Initialize everything registered so far. Returns the drivers that
    /// failed, which are not polled.
    pub fn start(&mut self) -> Vec<(&'static str, Error)> {
        let mut failed = Vec::new();
        for mut driver in self.registered.drain(..) {
            match driver.init() {
                Ok(()) => {
                    info!(driver = driver.name(), "started");
                    self.running.push(driver);
                }
                Err(err) => {
                    warn!(driver = driver.name(), error = %err, "disabled");
                    failed.push((driver.name(), err));
                }
            }
        }
        failed
    }

    pub fn poll(&mut self, ui: UiState, sink: &mut dyn EventSink) {
        for driver in &mut self.running {
            driver.poll(ui, sink);
        }
    }

    pub fn running(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.running.iter().map(|d| d.name())
    }

    pub fn shutdown(&mut self) {
        for mut driver in self.running.drain(..) {
            driver.shutdown();
            info!(driver = driver.name(), "stopped");
        }
    }
}

//! Membrane keyboard scanning.
//!
//! The ZX Spectrum membrane is an 8×5 matrix. Column lines are inputs with
//! pull-ups; row lines idle as inputs (floating) and are switched to outputs
//! driven low one at a time. A column that reads low while its row is driven
//! means the key at that crossing is closed. Only one row is ever driven, so
//! (row, col) names exactly one key.
//!
//! Caps shift and symbol shift are sampled first, each with only its own row
//! driven, and skipped in the main sweep.

use hermit_keymap::{is_modifier_cell, lookup, InputKey, COLS, MODIFIER_CELLS, ROWS};
use tracing::debug;

use crate::bus::{Direction, Gpio, Level, Pull};
use crate::clock::{Clock, SystemClock};
use crate::config::{check_distinct_pins, MembraneConfig};
use crate::debounce::DebounceTimer;
use crate::error::{BusError, Error};
use crate::event::{DeviceId, EventSink, Input, Transition, Translator};
use crate::host::{Driver, UiState};

/// Pressed flags for the whole matrix, `[row][col]`, true = pressed.
pub type MatrixState = [[bool; COLS]; ROWS];

/// A key that changed state during a scan.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeyTransition {
    pub row: usize,
    pub col: usize,
    pub key: InputKey,
    pub transition: Transition,
}

pub struct Membrane<G: Gpio, C: Clock = SystemClock> {
    gpio: G,
    row_pins: [u8; ROWS],
    col_pins: [u8; COLS],
    pressed: MatrixState,
    debounce: DebounceTimer<C>,
    debounce_ms: u64,
    menu_multiplier: u64,
    translator: Translator,
}

impl<G: Gpio, C: Clock> Membrane<G, C> {
    pub fn new(gpio: G, config: &MembraneConfig, clock: C) -> Result<Self, Error> {
        let mut pins = config.row_pins.to_vec();
        pins.extend_from_slice(&config.col_pins);
        check_distinct_pins("membrane", &pins)?;

        Ok(Self {
            gpio,
            row_pins: config.row_pins,
            col_pins: config.col_pins,
            pressed: [[false; COLS]; ROWS],
            debounce: DebounceTimer::new(clock),
            debounce_ms: config.debounce_ms,
            menu_multiplier: config.menu_multiplier,
            translator: Translator::new(DeviceId::Membrane),
        })
    }

    /// Put every line in its idle state and forget any held keys.
    pub fn init_gpio(&mut self) -> Result<(), BusError> {
        for pin in self.row_pins {
            self.gpio.set_direction(pin, Direction::Input)?;
        }
        for pin in self.col_pins {
            self.gpio.set_direction(pin, Direction::Input)?;
            self.gpio.set_pull(pin, Pull::Up)?;
        }
        self.pressed = [[false; COLS]; ROWS];
        Ok(())
    }

    fn drive_row(&mut self, row: usize) -> Result<(), BusError> {
        let pin = self.row_pins[row];
        self.gpio.set_direction(pin, Direction::Output)?;
        self.gpio.set_level(pin, Level::Low)
    }

    fn release_row(&mut self, row: usize) -> Result<(), BusError> {
        self.gpio.set_direction(self.row_pins[row], Direction::Input)
    }

    /// Read all column lines. Returns 5 flags, true = pulled low.
    fn read_cols(&mut self) -> Result<[bool; COLS], BusError> {
        let mut cols = [false; COLS];
        for (col, &pin) in self.col_pins.iter().enumerate() {
            cols[col] = self.gpio.read_level(pin)?.is_low();
        }
        Ok(cols)
    }

    /// Drive one row, run `read`, and let the row go again even if `read`
    /// failed.
    fn with_row<T>(
        &mut self,
        row: usize,
        read: impl FnOnce(&mut Self) -> Result<T, BusError>,
    ) -> Result<T, BusError> {
        self.drive_row(row)?;
        let result = read(self);
        let released = self.release_row(row);
        let value = result?;
        released?;
        Ok(value)
    }

    /// Sample the whole membrane without touching the press table.
    pub fn sample(&mut self) -> Result<MatrixState, BusError> {
        let mut state = [[false; COLS]; ROWS];

        for (row, col) in MODIFIER_CELLS {
            let pin = self.col_pins[col];
            state[row][col] = self.with_row(row, |m| Ok(m.gpio.read_level(pin)?.is_low()))?;
        }

        for row in 0..ROWS {
            let cols = self.with_row(row, |m| m.read_cols())?;
            for col in 0..COLS {
                if is_modifier_cell(row, col) {
                    continue;
                }
                state[row][col] = cols[col];
            }
        }

        Ok(state)
    }

    /// Commit a sample to the press table, modifiers first, and report what
    /// changed.
    fn apply(&mut self, state: &MatrixState) -> Vec<KeyTransition> {
        let mut transitions = Vec::new();
        let sweep = (0..ROWS)
            .flat_map(|row| (0..COLS).map(move |col| (row, col)))
            .filter(|&(row, col)| !is_modifier_cell(row, col));

        for (row, col) in MODIFIER_CELLS.into_iter().chain(sweep) {
            let now = state[row][col];
            if now == self.pressed[row][col] {
                continue;
            }
            self.pressed[row][col] = now;
            transitions.push(KeyTransition {
                row,
                col,
                key: lookup(row, col),
                transition: if now {
                    Transition::Pressed
                } else {
                    Transition::Released
                },
            });
        }
        transitions
    }

    /// One scan cycle gated by `interval_ms`. A debounced cycle or a failed
    /// read produces no transitions and leaves the press table as it was.
    pub fn scan(&mut self, interval_ms: u64) -> Vec<KeyTransition> {
        if self.debounce.should_discard(interval_ms) {
            return Vec::new();
        }
        match self.sample() {
            Ok(state) => self.apply(&state),
            Err(err) => {
                debug!(error = %err, "membrane scan failed");
                Vec::new()
            }
        }
    }

    pub fn interval_ms(&self, ui: UiState) -> u64 {
        ui.scale(self.debounce_ms, self.menu_multiplier)
    }

    pub fn is_pressed(&self, row: usize, col: usize) -> bool {
        self.pressed[row][col]
    }

    pub fn pressed_keys(&self) -> Vec<InputKey> {
        let mut keys = Vec::new();
        for row in 0..ROWS {
            for col in 0..COLS {
                if self.pressed[row][col] {
                    keys.push(lookup(row, col));
                }
            }
        }
        keys
    }
}

impl<G: Gpio, C: Clock> Driver for Membrane<G, C> {
    fn name(&self) -> &'static str {
        "gpio membrane"
    }

    fn init(&mut self) -> Result<(), Error> {
        Ok(self.init_gpio()?)
    }

    fn poll(&mut self, ui: UiState, sink: &mut dyn EventSink) {
        let interval = self.interval_ms(ui);
        for t in self.scan(interval) {
            self.translator
                .dispatch(Input::Key(t.key), t.transition, &mut self.debounce, sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::{EventKind, InputEvent};
    use crate::mock::FakeGpio;

    fn membrane() -> (Membrane<FakeGpio, ManualClock>, FakeGpio, ManualClock) {
        let config = MembraneConfig::default();
        let gpio = FakeGpio::with_matrix(&config.row_pins, &config.col_pins);
        let clock = ManualClock::new(0);
        let mut m = Membrane::new(gpio.clone(), &config, clock.clone()).unwrap();
        m.init_gpio().unwrap();
        clock.advance(1_000);
        (m, gpio, clock)
    }

    #[test]
    fn init_pulls_columns_up_and_floats_rows() {
        let (_m, gpio, _) = membrane();
        let s = gpio.0.borrow();
        let config = MembraneConfig::default();
        for pin in config.col_pins {
            assert_eq!(s.pulls.get(&pin), Some(&Pull::Up));
            assert_eq!(s.directions.get(&pin), Some(&Direction::Input));
        }
        for pin in config.row_pins {
            assert_eq!(s.directions.get(&pin), Some(&Direction::Input));
        }
    }

    #[test]
    fn single_key_press_and_release() {
        let (mut m, gpio, clock) = membrane();
        gpio.close(2, 4); // A

        let t = m.scan(50);
        assert_eq!(
            t,
            vec![KeyTransition {
                row: 2,
                col: 4,
                key: InputKey::A,
                transition: Transition::Pressed,
            }]
        );
        assert!(m.is_pressed(2, 4));

        clock.advance(100);
        gpio.open(2, 4);
        let t = m.scan(50);
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].transition, Transition::Released);
        assert!(!m.is_pressed(2, 4));
    }

    #[test]
    fn rescanning_without_change_is_silent() {
        let (mut m, gpio, clock) = membrane();
        gpio.close(0, 0);
        gpio.close(6, 4);
        assert_eq!(m.scan(50).len(), 2);
        for _ in 0..3 {
            clock.advance(100);
            assert!(m.scan(50).is_empty());
        }
        assert_eq!(m.pressed_keys(), vec![InputKey::N5, InputKey::Enter]);
    }

    #[test]
    fn modifiers_are_reported_first() {
        let (mut m, gpio, _) = membrane();
        gpio.close(0, 4); // 1
        gpio.close(7, 3); // symbol shift
        gpio.close(5, 4); // caps shift

        let keys: Vec<InputKey> = m.scan(50).into_iter().map(|t| t.key).collect();
        assert_eq!(
            keys,
            vec![InputKey::CapsShift, InputKey::SymbolShift, InputKey::N1]
        );
    }

    #[test]
    fn only_one_row_is_driven_at_a_time() {
        let (mut m, gpio, _) = membrane();
        gpio.close(1, 1);
        gpio.close(3, 1);
        m.scan(50);
        assert_eq!(gpio.0.borrow().max_active_rows, 1);
        // every row is floating again afterwards
        let s = gpio.0.borrow();
        for pin in MembraneConfig::default().row_pins {
            assert_eq!(s.directions.get(&pin), Some(&Direction::Input));
        }
    }

    #[test]
    fn debounced_scan_does_nothing() {
        let (mut m, gpio, clock) = membrane();
        m.debounce.record_event();
        gpio.close(4, 0);
        clock.advance(10);
        assert!(m.scan(50).is_empty());
        assert!(!m.is_pressed(4, 0));
        clock.advance(40);
        assert_eq!(m.scan(50).len(), 1);
    }

    #[test]
    fn failed_read_leaves_state_alone() {
        let (mut m, gpio, clock) = membrane();
        gpio.close(1, 0);
        assert_eq!(m.scan(50).len(), 1);

        clock.advance(100);
        gpio.open(1, 0);
        gpio.0.borrow_mut().fail_reads = true;
        assert!(m.scan(50).is_empty());
        assert!(m.is_pressed(1, 0));

        gpio.0.borrow_mut().fail_reads = false;
        assert_eq!(m.scan(50)[0].transition, Transition::Released);
    }

    #[test]
    fn poll_dispatches_key_events_and_stamps_debounce() {
        let (mut m, gpio, clock) = membrane();
        gpio.close(5, 4);
        let mut events: Vec<InputEvent> = Vec::new();

        m.poll(UiState::Emulation, &mut events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::KeyPress);
        assert_eq!(events[0].input, Input::Key(InputKey::CapsShift));
        assert_eq!(events[0].device, DeviceId::Membrane);

        // within the interval: nothing, even though the key was let go
        gpio.open(5, 4);
        clock.advance(49);
        m.poll(UiState::Emulation, &mut events);
        assert_eq!(events.len(), 1);

        clock.advance(1);
        m.poll(UiState::Emulation, &mut events);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, EventKind::KeyRelease);
    }

    #[test]
    fn menu_stretches_the_interval() {
        let (mut m, gpio, clock) = membrane();
        let mut events = Vec::new();
        m.debounce.record_event();
        gpio.close(7, 4);

        clock.advance(200);
        m.poll(UiState::Menu, &mut events);
        assert!(events.is_empty());

        clock.advance(50);
        m.poll(UiState::Menu, &mut events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].input, Input::Key(InputKey::Space));
    }

    #[test]
    fn overlapping_pins_are_rejected() {
        let mut config = MembraneConfig::default();
        config.col_pins[0] = config.row_pins[3];
        let result = Membrane::new(FakeGpio::default(), &config, ManualClock::new(0));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

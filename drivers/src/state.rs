//! Press/release bookkeeping keyed by logical line.

use std::fmt::Debug;

use crate::error::Error;
use crate::event::Transition;

/// Remembers which lines are currently held so that only changes produce
/// events. A line is pressed iff it was last seen active and no release has
/// been issued since.
#[derive(Debug, Clone)]
pub struct PressTable<K> {
    entries: Vec<(K, bool)>,
}

impl<K: Copy + Eq + Debug> PressTable<K> {
    /// Build a table with every line released. Listing a line twice is a
    /// configuration error.
    pub fn new(keys: impl IntoIterator<Item = K>) -> Result<Self, Error> {
        let mut entries: Vec<(K, bool)> = Vec::new();
        for key in keys {
            if entries.iter().any(|(k, _)| *k == key) {
                return Err(Error::Config(format!("{key:?} is listed more than once")));
            }
            entries.push((key, false));
        }
        Ok(Self { entries })
    }

    /// Record the latest reading of a line. Returns the transition, if any.
    /// Lines the table was not built with are ignored.
    pub fn update(&mut self, key: K, active: bool) -> Option<Transition> {
        let (_, pressed) = self.entries.iter_mut().find(|(k, _)| *k == key)?;
        match (*pressed, active) {
            (false, true) => {
                *pressed = true;
                Some(Transition::Pressed)
            }
            (true, false) => {
                *pressed = false;
                Some(Transition::Released)
            }
            _ => None,
        }
    }

    pub fn is_pressed(&self, key: K) -> bool {
        self.entries.iter().any(|(k, p)| *k == key && *p)
    }

    pub fn contains(&self, key: K) -> bool {
        self.entries.iter().any(|(k, _)| *k == key)
    }

    /// Lines currently held, in table order.
    pub fn pressed(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.iter().filter(|(_, p)| *p).map(|(k, _)| *k)
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermit_keymap::JoystickButton;

    #[test]
    fn only_changes_are_reported() {
        let mut table = PressTable::new([JoystickButton::Up, JoystickButton::Fire1]).unwrap();
        assert_eq!(table.update(JoystickButton::Up, false), None);
        assert_eq!(table.update(JoystickButton::Up, true), Some(Transition::Pressed));
        assert_eq!(table.update(JoystickButton::Up, true), None);
        assert!(table.is_pressed(JoystickButton::Up));
        assert_eq!(table.update(JoystickButton::Up, false), Some(Transition::Released));
        assert_eq!(table.update(JoystickButton::Up, false), None);
        assert!(!table.is_pressed(JoystickButton::Up));
    }

    #[test]
    fn duplicate_lines_are_rejected() {
        let err = PressTable::new([JoystickButton::Fire1, JoystickButton::Fire1]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unknown_lines_are_ignored() {
        let mut table = PressTable::new([JoystickButton::Up]).unwrap();
        assert_eq!(table.update(JoystickButton::Down, true), None);
        assert!(!table.contains(JoystickButton::Down));
        assert_eq!(table.pressed().count(), 0);
    }
}

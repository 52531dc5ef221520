//! Timestamp debounce shared by every driver poll.
//!
//! Instead of counting consistent scans per key, each driver remembers when it
//! last accepted an event and refuses to poll again until a minimum interval
//! has passed. The interval is chosen by the caller: drivers stretch it while
//! the emulator menu is open so that one press does not walk straight through
//! several menu levels.

use crate::clock::{Clock, SystemClock};

pub struct DebounceTimer<C: Clock = SystemClock> {
    clock: C,
    /// Time of the last accepted event, in the clock's milliseconds.
    last_event_ms: u64,
}

impl DebounceTimer<SystemClock> {
    pub fn system() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> DebounceTimer<C> {
    /// Create a timer whose last event is "now", so the first poll after
    /// startup is held off for one interval.
    pub fn new(clock: C) -> Self {
        let last_event_ms = clock.now_ms();
        Self {
            clock,
            last_event_ms,
        }
    }

    /// Remember the current time as the last accepted event.
    pub fn record_event(&mut self) {
        self.last_event_ms = self.clock.now_ms();
    }

    /// True if less than `interval_ms` has elapsed since the last accepted
    /// event, in which case the caller should drop whatever it was about to do.
    pub fn should_discard(&self, interval_ms: u64) -> bool {
        self.elapsed_ms() < interval_ms
    }

    /// Milliseconds since the last accepted event.
    pub fn elapsed_ms(&self) -> u64 {
        self.clock.now_ms().saturating_sub(self.last_event_ms)
    }

    pub fn last_event_ms(&self) -> u64 {
        self.last_event_ms
    }
}

//! Abstract input events and the translator that hands them to the emulator.

use hermit_keymap::{InputKey, JoystickButton};

use crate::clock::Clock;
use crate::debounce::DebounceTimer;

/// A change of state on one key or line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Pressed,
    Released,
}

/// What was pressed: a keyboard key or a joystick line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Key(InputKey),
    Joystick(JoystickButton),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    KeyPress,
    KeyRelease,
    JoystickPress,
    JoystickRelease,
}

/// Which peripheral an event came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceId {
    Membrane,
    GpioJoystick,
    MenuButton,
    Expander,
    Lyra,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: EventKind,
    pub input: Input,
    pub device: DeviceId,
}

impl InputEvent {
    pub fn new(input: Input, transition: Transition, device: DeviceId) -> Self {
        let kind = match (input, transition) {
            (Input::Key(_), Transition::Pressed) => EventKind::KeyPress,
            (Input::Key(_), Transition::Released) => EventKind::KeyRelease,
            (Input::Joystick(_), Transition::Pressed) => EventKind::JoystickPress,
            (Input::Joystick(_), Transition::Released) => EventKind::JoystickRelease,
        };
        Self {
            kind,
            input,
            device,
        }
    }

    pub fn is_press(&self) -> bool {
        matches!(self.kind, EventKind::KeyPress | EventKind::JoystickPress)
    }
}

/// The emulator's input queue.
pub trait EventSink {
    fn input_event(&mut self, event: InputEvent);
}

impl EventSink for Vec<InputEvent> {
    fn input_event(&mut self, event: InputEvent) {
        self.push(event);
    }
}

/// Turns transitions into events for one device.
#[derive(Debug, Clone, Copy)]
pub struct Translator {
    device: DeviceId,
}

impl Translator {
    pub fn new(device: DeviceId) -> Self {
        Self { device }
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn translate(&self, input: Input, transition: Transition) -> InputEvent {
        InputEvent::new(input, transition, self.device)
    }

    /// Send one transition to the sink and stamp the debounce timer.
    ///
    /// Presses are stamped before dispatch: the sink may open or close a menu
    /// and re-enter polling synchronously, and that nested poll must already
    /// see this press as the latest event or it will fire it again. Releases
    /// are stamped after dispatch.
    pub fn dispatch<C: Clock>(
        &self,
        input: Input,
        transition: Transition,
        debounce: &mut DebounceTimer<C>,
        sink: &mut dyn EventSink,
    ) {
        let event = self.translate(input, transition);
        match transition {
            Transition::Pressed => {
                debounce.record_event();
                sink.input_event(event);
            }
            Transition::Released => {
                sink.input_event(event);
                debounce.record_event();
            }
        }
    }
}

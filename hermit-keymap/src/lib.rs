//! Shared key and joystick definitions for the Hermit Retro input drivers.
//!
//! This crate is `no_std`-compatible so the keymap can be shared between the
//! drivers and the host tooling without dragging in anything else.
//!
//! The ZX Spectrum membrane is an 8×5 matrix. The drivers drive one of the
//! eight row lines low and sample the five column lines; the table below maps
//! each (row, column) crossing to the key it bridges.

#![no_std]

/// Number of row lines on the membrane.
pub const ROWS: usize = 8;
/// Number of column lines on the membrane.
pub const COLS: usize = 5;

/// Matrix cell of the caps shift key.
pub const CAPS_SHIFT: (usize, usize) = (5, 4);
/// Matrix cell of the symbol shift key.
pub const SYMBOL_SHIFT: (usize, usize) = (7, 3);

/// The two modifier cells, scanned on their own before the main sweep.
pub const MODIFIER_CELLS: [(usize, usize); 2] = [CAPS_SHIFT, SYMBOL_SHIFT];

/// Logical keys understood by the emulator's input layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputKey {
    // Letters
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,

    // Numbers
    N0,
    N1,
    N2,
    N3,
    N4,
    N5,
    N6,
    N7,
    N8,
    N9,

    Enter,
    Space,

    // Spectrum modifiers
    CapsShift,
    SymbolShift,

    // Emulator control
    Escape,
    F1,

    // Cursor keys
    Up,
    Down,
    Left,
    Right,
}

impl InputKey {
    /// Check if this key is one of the two Spectrum shift keys.
    pub fn is_modifier(self) -> bool {
        matches!(self, InputKey::CapsShift | InputKey::SymbolShift)
    }

    /// Display name for use in layout visualizations and logs.
    pub fn display_name(self) -> &'static str {
        match self {
            InputKey::A => "A",
            InputKey::B => "B",
            InputKey::C => "C",
            InputKey::D => "D",
            InputKey::E => "E",
            InputKey::F => "F",
            InputKey::G => "G",
            InputKey::H => "H",
            InputKey::I => "I",
            InputKey::J => "J",
            InputKey::K => "K",
            InputKey::L => "L",
            InputKey::M => "M",
            InputKey::N => "N",
            InputKey::O => "O",
            InputKey::P => "P",
            InputKey::Q => "Q",
            InputKey::R => "R",
            InputKey::S => "S",
            InputKey::T => "T",
            InputKey::U => "U",
            InputKey::V => "V",
            InputKey::W => "W",
            InputKey::X => "X",
            InputKey::Y => "Y",
            InputKey::Z => "Z",
            InputKey::N0 => "0",
            InputKey::N1 => "1",
            InputKey::N2 => "2",
            InputKey::N3 => "3",
            InputKey::N4 => "4",
            InputKey::N5 => "5",
            InputKey::N6 => "6",
            InputKey::N7 => "7",
            InputKey::N8 => "8",
            InputKey::N9 => "9",
            InputKey::Enter => "ENTER",
            InputKey::Space => "SPACE",
            InputKey::CapsShift => "CAPS SHIFT",
            InputKey::SymbolShift => "SYMBOL SHIFT",
            InputKey::Escape => "ESC",
            InputKey::F1 => "F1",
            InputKey::Up => "\u{2191}",
            InputKey::Down => "\u{2193}",
            InputKey::Left => "\u{2190}",
            InputKey::Right => "\u{2192}",
        }
    }
}

/// Joystick lines: four directions and up to fifteen fire buttons.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JoystickButton {
    Up,
    Down,
    Left,
    Right,
    Fire1,
    Fire2,
    Fire3,
    Fire4,
    Fire5,
    Fire6,
    Fire7,
    Fire8,
    Fire9,
    Fire10,
    Fire11,
    Fire12,
    Fire13,
    Fire14,
    Fire15,
}

impl JoystickButton {
    /// Every joystick line, directions first.
    pub const ALL: [JoystickButton; 19] = [
        JoystickButton::Up,
        JoystickButton::Down,
        JoystickButton::Left,
        JoystickButton::Right,
        JoystickButton::Fire1,
        JoystickButton::Fire2,
        JoystickButton::Fire3,
        JoystickButton::Fire4,
        JoystickButton::Fire5,
        JoystickButton::Fire6,
        JoystickButton::Fire7,
        JoystickButton::Fire8,
        JoystickButton::Fire9,
        JoystickButton::Fire10,
        JoystickButton::Fire11,
        JoystickButton::Fire12,
        JoystickButton::Fire13,
        JoystickButton::Fire14,
        JoystickButton::Fire15,
    ];

    pub fn is_direction(self) -> bool {
        matches!(
            self,
            JoystickButton::Up | JoystickButton::Down | JoystickButton::Left | JoystickButton::Right
        )
    }
}

/// Shorthand aliases for readability.
const CS: InputKey = InputKey::CapsShift;
const SS: InputKey = InputKey::SymbolShift;
const ENT: InputKey = InputKey::Enter;
const SPC: InputKey = InputKey::Space;

/// Membrane keymap, indexed `[row][col]`.
///
/// Columns run in the order the column pins are wired, which is the reverse
/// of the printed key order on the number and letter rows.
#[rustfmt::skip]
pub const KEYMAP: [[InputKey; COLS]; ROWS] = [
    // Row 0: 5 4 3 2 1
    [InputKey::N5, InputKey::N4, InputKey::N3, InputKey::N2, InputKey::N1],
    // Row 1: T R E W Q
    [InputKey::T, InputKey::R, InputKey::E, InputKey::W, InputKey::Q],
    // Row 2: G F D S A
    [InputKey::G, InputKey::F, InputKey::D, InputKey::S, InputKey::A],
    // Row 3: 6 7 8 9 0
    [InputKey::N6, InputKey::N7, InputKey::N8, InputKey::N9, InputKey::N0],
    // Row 4: Y U I O P
    [InputKey::Y, InputKey::U, InputKey::I, InputKey::O, InputKey::P],
    // Row 5: V C X Z CapsShift
    [InputKey::V, InputKey::C, InputKey::X, InputKey::Z, CS],
    // Row 6: H J K L Enter
    [InputKey::H, InputKey::J, InputKey::K, InputKey::L, ENT],
    // Row 7: B N M SymbolShift Space
    [InputKey::B, InputKey::N, InputKey::M, SS, SPC],
];

/// Look up the key at a matrix position.
pub fn lookup(row: usize, col: usize) -> InputKey {
    KEYMAP[row][col]
}

/// Whether a matrix position is one of the separately scanned modifier cells.
pub fn is_modifier_cell(row: usize, col: usize) -> bool {
    MODIFIER_CELLS.contains(&(row, col))
}

/// Find the matrix position of a key, if it is on the membrane.
pub fn position(key: InputKey) -> Option<(usize, usize)> {
    for (row, keys) in KEYMAP.iter().enumerate() {
        for (col, &k) in keys.iter().enumerate() {
            if k == key {
                return Some((row, col));
            }
        }
    }
    None
}

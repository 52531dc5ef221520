//! The 5-byte packet the Lyra's 32u4 sends back for every `0xAA` request.
//!
//! ```text
//! b0 = 00 | battery (6 bits)
//! b1 = 01 | VOLUME_UP<<2 | VOLUME_DOWN<<1 | BOTTOM_RIGHT_3
//! b2 = 10 | TOP_LEFT<<5 | LEFT_UP<<4 | LEFT_LEFT<<3 | LEFT_RIGHT<<2 | LEFT_DOWN<<1 | TOP_RIGHT
//! b3 = 11 | RIGHT_UP<<5 | RIGHT_LEFT<<4 | RIGHT_RIGHT<<3 | RIGHT_DOWN<<2 | BOTTOM_RIGHT_1<<1 | BOTTOM_RIGHT_2
//! b4 = (b0 + b1 + b2 + b3) ^ 0xFF
//! ```
//!
//! The checksum gates the whole frame. The type tag gates each byte on its own:
//! a byte with the wrong tag contributes nothing, but the others still count.

use crate::error::PacketError;

pub const PACKET_LEN: usize = 5;
pub const REQUEST: u8 = 0xAA;

pub const TYPE_MASK: u8 = 0b1100_0000;
pub const B0_TYPE: u8 = 0x00;
pub const B1_TYPE: u8 = 0x40;
pub const B2_TYPE: u8 = 0x80;
pub const B3_TYPE: u8 = 0xC0;
pub const BATTERY_MASK: u8 = !TYPE_MASK;

pub const VOLUME_UP_MASK: u8 = 0x04;
pub const VOLUME_DOWN_MASK: u8 = 0x02;
pub const BOTTOM_RIGHT_3_MASK: u8 = 0x01;

pub const TOP_LEFT_MASK: u8 = 0x20;
pub const LEFT_UP_MASK: u8 = 0x10;
pub const LEFT_LEFT_MASK: u8 = 0x08;
pub const LEFT_RIGHT_MASK: u8 = 0x04;
pub const LEFT_DOWN_MASK: u8 = 0x02;
pub const TOP_RIGHT_MASK: u8 = 0x01;

pub const RIGHT_UP_MASK: u8 = 0x20;
pub const RIGHT_LEFT_MASK: u8 = 0x10;
pub const RIGHT_RIGHT_MASK: u8 = 0x08;
pub const RIGHT_DOWN_MASK: u8 = 0x04;
pub const BOTTOM_RIGHT_1_MASK: u8 = 0x02;
pub const BOTTOM_RIGHT_2_MASK: u8 = 0x01;

/// A physical button on the Lyra handheld.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LyraButton {
    TopLeft,
    LeftUp,
    LeftLeft,
    LeftRight,
    LeftDown,
    TopRight,
    RightUp,
    RightLeft,
    RightRight,
    RightDown,
    BottomRight1,
    BottomRight2,
    BottomRight3,
    VolumeUp,
    VolumeDown,
}

impl LyraButton {
    pub const ALL: [LyraButton; 15] = [
        LyraButton::TopLeft,
        LyraButton::LeftUp,
        LyraButton::LeftLeft,
        LyraButton::LeftRight,
        LyraButton::LeftDown,
        LyraButton::TopRight,
        LyraButton::RightUp,
        LyraButton::RightLeft,
        LyraButton::RightRight,
        LyraButton::RightDown,
        LyraButton::BottomRight1,
        LyraButton::BottomRight2,
        LyraButton::BottomRight3,
        LyraButton::VolumeUp,
        LyraButton::VolumeDown,
    ];

    /// The packet byte this button is carried in.
    pub fn field(self) -> Field {
        match self {
            LyraButton::VolumeUp | LyraButton::VolumeDown | LyraButton::BottomRight3 => {
                Field::Extra
            }
            LyraButton::TopLeft
            | LyraButton::LeftUp
            | LyraButton::LeftLeft
            | LyraButton::LeftRight
            | LyraButton::LeftDown
            | LyraButton::TopRight => Field::Left,
            _ => Field::Right,
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// The three type-tagged button bytes, b1 to b3.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    Extra,
    Left,
    Right,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Extra, Field::Left, Field::Right];

    pub fn tag(self) -> u8 {
        self.layout().tag
    }

    fn index(self) -> usize {
        self as usize
    }

    fn layout(self) -> &'static Layout {
        &LAYOUTS[self.index()]
    }
}

struct Layout {
    tag: u8,
    /// Checked in order; the first set bit wins and ends the byte.
    exclusive: &'static [(u8, LyraButton)],
    /// All honoured together.
    mixable: &'static [(u8, LyraButton)],
}

const LAYOUTS: [Layout; 3] = [
    Layout {
        tag: B1_TYPE,
        exclusive: &[
            (VOLUME_UP_MASK, LyraButton::VolumeUp),
            (VOLUME_DOWN_MASK, LyraButton::VolumeDown),
            (BOTTOM_RIGHT_3_MASK, LyraButton::BottomRight3),
        ],
        mixable: &[],
    },
    Layout {
        tag: B2_TYPE,
        exclusive: &[
            (TOP_LEFT_MASK, LyraButton::TopLeft),
            (TOP_RIGHT_MASK, LyraButton::TopRight),
        ],
        mixable: &[
            (LEFT_UP_MASK, LyraButton::LeftUp),
            (LEFT_LEFT_MASK, LyraButton::LeftLeft),
            (LEFT_RIGHT_MASK, LyraButton::LeftRight),
            (LEFT_DOWN_MASK, LyraButton::LeftDown),
        ],
    },
    Layout {
        tag: B3_TYPE,
        exclusive: &[
            (BOTTOM_RIGHT_1_MASK, LyraButton::BottomRight1),
            (BOTTOM_RIGHT_2_MASK, LyraButton::BottomRight2),
        ],
        mixable: &[
            (RIGHT_UP_MASK, LyraButton::RightUp),
            (RIGHT_LEFT_MASK, LyraButton::RightLeft),
            (RIGHT_RIGHT_MASK, LyraButton::RightRight),
            (RIGHT_DOWN_MASK, LyraButton::RightDown),
        ],
    },
];

/// A set of Lyra buttons.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ButtonSet(u16);

impl ButtonSet {
    pub fn insert(&mut self, button: LyraButton) {
        self.0 |= button.bit();
    }

    pub fn contains(self, button: LyraButton) -> bool {
        self.0 & button.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = LyraButton> {
        LyraButton::ALL.into_iter().filter(move |b| self.contains(*b))
    }
}

impl FromIterator<LyraButton> for ButtonSet {
    fn from_iter<I: IntoIterator<Item = LyraButton>>(iter: I) -> Self {
        let mut set = ButtonSet::default();
        for button in iter {
            set.insert(button);
        }
        set
    }
}

/// A checksummed packet, broken out into buttons.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedButtons {
    /// 6-bit battery level, if b0 carried its tag.
    pub battery: Option<u8>,
    pub pressed: ButtonSet,
    decided: ButtonSet,
    valid: [bool; 3],
}

impl DecodedButtons {
    /// Whether `field`'s byte carried the right tag. Buttons of an invalid
    /// field say nothing about whether they are held.
    pub fn is_valid(&self, field: Field) -> bool {
        self.valid[field.index()]
    }

    /// Buttons this packet has an opinion about, with whether each is
    /// pressed. An exclusive match leaves the buttons after it in its byte
    /// undecided, like an invalid field.
    pub fn readings(&self) -> impl Iterator<Item = (LyraButton, bool)> + '_ {
        self.decided.iter().map(|b| (b, self.pressed.contains(b)))
    }

    /// Whether this packet decided `button` either way.
    pub fn is_decided(&self, button: LyraButton) -> bool {
        self.decided.contains(button)
    }
}

pub fn checksum(b0: u8, b1: u8, b2: u8, b3: u8) -> u8 {
    b0.wrapping_add(b1).wrapping_add(b2).wrapping_add(b3) ^ 0xFF
}

/// Build a full frame around four payload bytes.
pub fn frame(b0: u8, b1: u8, b2: u8, b3: u8) -> [u8; PACKET_LEN] {
    [b0, b1, b2, b3, checksum(b0, b1, b2, b3)]
}

pub fn decode(raw: &[u8]) -> Result<DecodedButtons, PacketError> {
    let &[b0, b1, b2, b3, b4] = raw else {
        return Err(PacketError::Frame { len: raw.len() });
    };
    let expected = checksum(b0, b1, b2, b3);
    if expected != b4 {
        return Err(PacketError::Checksum {
            expected,
            actual: b4,
        });
    }

    let mut decoded = DecodedButtons {
        battery: (b0 & TYPE_MASK == B0_TYPE).then_some(b0 & BATTERY_MASK),
        ..DecodedButtons::default()
    };
    for (field, byte) in Field::ALL.into_iter().zip([b1, b2, b3]) {
        if let Some((pressed, decided)) = decode_byte(field, byte) {
            decoded.valid[field.index()] = true;
            decoded.pressed.0 |= pressed.0;
            decoded.decided.0 |= decided.0;
        }
    }
    Ok(decoded)
}

/// Returns the pressed buttons and every button the byte decided on.
fn decode_byte(field: Field, byte: u8) -> Option<(ButtonSet, ButtonSet)> {
    let layout = field.layout();
    if byte & TYPE_MASK != layout.tag {
        return None;
    }
    let mut pressed = ButtonSet::default();
    let mut decided = ButtonSet::default();
    for &(mask, button) in layout.exclusive {
        decided.insert(button);
        if byte & mask != 0 {
            pressed.insert(button);
            return Some((pressed, decided));
        }
    }
    for &(mask, button) in layout.mixable {
        decided.insert(button);
        if byte & mask != 0 {
            pressed.insert(button);
        }
    }
    Some((pressed, decided))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pressed(raw: &[u8]) -> Vec<LyraButton> {
        decode(raw).unwrap().pressed.iter().collect()
    }

    #[test]
    fn volume_down_frame() {
        let raw = [0x00, 0x42, 0x80, 0xC0, 0x7D];
        assert_eq!(checksum(0x00, 0x42, 0x80, 0xC0), 0x7D);
        let decoded = decode(&raw).unwrap();
        assert_eq!(
            decoded.pressed.iter().collect::<Vec<_>>(),
            vec![LyraButton::VolumeDown]
        );
        assert_eq!(decoded.battery, Some(0));
        assert!(Field::ALL.into_iter().all(|f| decoded.is_valid(f)));
    }

    #[test]
    fn checksum_gates_the_frame() {
        let good = frame(0x21, 0x44, 0x94, 0xC2);
        assert!(decode(&good).is_ok());

        for byte in 0..4 {
            for bit in 0..8 {
                let mut bad = good;
                bad[byte] ^= 1 << bit;
                assert!(
                    matches!(decode(&bad), Err(PacketError::Checksum { .. })),
                    "flip byte {byte} bit {bit}"
                );
            }
        }
    }

    #[test]
    fn wrong_length_is_a_frame_error() {
        assert_eq!(decode(&[0x00; 4]), Err(PacketError::Frame { len: 4 }));
        assert_eq!(decode(&[0x00; 6]), Err(PacketError::Frame { len: 6 }));
        assert_eq!(decode(&[]), Err(PacketError::Frame { len: 0 }));
    }

    #[test]
    fn top_left_beats_top_right() {
        let raw = frame(0, B1_TYPE, B2_TYPE | TOP_LEFT_MASK | TOP_RIGHT_MASK, B3_TYPE);
        assert_eq!(pressed(&raw), vec![LyraButton::TopLeft]);
    }

    #[test]
    fn exclusive_button_ends_its_byte() {
        // the d-pad bits are ignored while top-right is held
        let raw = frame(0, B1_TYPE, B2_TYPE | TOP_RIGHT_MASK | LEFT_UP_MASK, B3_TYPE);
        assert_eq!(pressed(&raw), vec![LyraButton::TopRight]);

        // but the next byte is still decoded
        let raw = frame(
            0,
            B1_TYPE,
            B2_TYPE | TOP_RIGHT_MASK,
            B3_TYPE | BOTTOM_RIGHT_1_MASK | BOTTOM_RIGHT_2_MASK,
        );
        assert_eq!(pressed(&raw), vec![LyraButton::TopRight, LyraButton::BottomRight1]);
    }

    #[test]
    fn buttons_after_an_exclusive_match_are_undecided() {
        let raw = frame(0, B1_TYPE, B2_TYPE | TOP_RIGHT_MASK | LEFT_UP_MASK, B3_TYPE);
        let decoded = decode(&raw).unwrap();
        // top-left was checked first and is known to be up
        assert!(decoded.is_decided(LyraButton::TopLeft));
        assert!(decoded.is_decided(LyraButton::TopRight));
        assert!(!decoded.is_decided(LyraButton::LeftUp));
        assert!(!decoded.is_decided(LyraButton::LeftDown));
        let left: Vec<_> = decoded
            .readings()
            .filter(|(b, _)| b.field() == Field::Left)
            .collect();
        assert_eq!(left, vec![(LyraButton::TopLeft, false), (LyraButton::TopRight, true)]);
        assert_eq!(decoded.readings().count(), 3 + 2 + 6);
    }

    #[test]
    fn volume_up_has_priority() {
        let b1 = B1_TYPE | VOLUME_UP_MASK | VOLUME_DOWN_MASK | BOTTOM_RIGHT_3_MASK;
        let raw = frame(0, b1, B2_TYPE, B3_TYPE);
        assert_eq!(pressed(&raw), vec![LyraButton::VolumeUp]);
    }

    #[test]
    fn diagonals_mix() {
        let b2 = B2_TYPE | LEFT_UP_MASK | LEFT_RIGHT_MASK;
        let b3 = B3_TYPE | RIGHT_DOWN_MASK | RIGHT_LEFT_MASK;
        let raw = frame(0, B1_TYPE, b2, b3);
        assert_eq!(
            pressed(&raw),
            vec![
                LyraButton::LeftUp,
                LyraButton::LeftRight,
                LyraButton::RightLeft,
                LyraButton::RightDown,
            ]
        );
    }

    #[test]
    fn mistagged_byte_is_ignored_alone() {
        // b2 carries b3's tag
        let raw = frame(
            0,
            B1_TYPE | BOTTOM_RIGHT_3_MASK,
            B3_TYPE | 0x3F,
            B3_TYPE | RIGHT_UP_MASK,
        );
        let decoded = decode(&raw).unwrap();
        assert!(decoded.is_valid(Field::Extra));
        assert!(!decoded.is_valid(Field::Left));
        assert!(decoded.is_valid(Field::Right));
        assert_eq!(
            decoded.pressed.iter().collect::<Vec<_>>(),
            vec![LyraButton::RightUp, LyraButton::BottomRight3]
        );
        assert!(decoded.readings().all(|(b, _)| b.field() != Field::Left));
        assert_eq!(decoded.readings().count(), 3 + 6);
    }

    #[test]
    fn battery_needs_its_tag() {
        assert_eq!(decode(&frame(0x2A, B1_TYPE, B2_TYPE, B3_TYPE)).unwrap().battery, Some(0x2A));
        assert_eq!(decode(&frame(0x6A, B1_TYPE, B2_TYPE, B3_TYPE)).unwrap().battery, None);
    }

    #[test]
    fn every_button_has_one_field() {
        let per_field: Vec<usize> = Field::ALL
            .into_iter()
            .map(|f| LyraButton::ALL.iter().filter(|b| b.field() == f).count())
            .collect();
        assert_eq!(per_field, vec![3, 6, 6]);
    }
}

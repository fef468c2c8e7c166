use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{Error, Result};
use crate::memory::layout::controller;

/// Console controller buttons, with their bit in the `BUTTONS` word.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Button {
    A,
    B,
    Z,
    Start,
    DUp,
    DDown,
    DLeft,
    DRight,
    L,
    R,
    CUp,
    CDown,
    CLeft,
    CRight,
}

impl Button {
    /// Bit in the low half of the `BUTTONS` word, as laid out by the
    /// Mupen64Plus input plugin interface.
    pub fn mask(self) -> u16 {
        match self {
            Button::DRight => 0x0001,
            Button::DLeft => 0x0002,
            Button::DDown => 0x0004,
            Button::DUp => 0x0008,
            Button::Start => 0x0010,
            Button::Z => 0x0020,
            Button::B => 0x0040,
            Button::A => 0x0080,
            Button::CRight => 0x0100,
            Button::CLeft => 0x0200,
            Button::CDown => 0x0400,
            Button::CUp => 0x0800,
            Button::R => 0x1000,
            Button::L => 0x2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Axis {
    X,
    Y,
}

/// Logical player slot, 0 to 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PlayerIndex(u8);

impl PlayerIndex {
    pub fn new(index: usize) -> Result<Self> {
        if index < controller::MAX_PLAYERS {
            Ok(Self(index as u8))
        } else {
            Err(Error::InvalidPlayerIndex(index))
        }
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = PlayerIndex> {
        (0..controller::MAX_PLAYERS as u8).map(PlayerIndex)
    }
}

impl fmt::Display for PlayerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0 + 1)
    }
}

/// Buttons held and stick position of one controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerState {
    buttons: u16,
    pub stick_x: i8,
    pub stick_y: i8,
}

impl ControllerState {
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::neutral()
    }

    pub fn press(&mut self, button: Button) {
        self.buttons |= button.mask();
    }

    pub fn release(&mut self, button: Button) {
        self.buttons &= !button.mask();
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons & button.mask() != 0
    }

    pub fn pressed(&self) -> impl Iterator<Item = Button> + '_ {
        Button::iter().filter(|&button| self.is_pressed(button))
    }

    pub fn set_stick(&mut self, x: i8, y: i8) {
        self.stick_x = x;
        self.stick_y = y;
    }

    /// The plugin `BUTTONS` word: button bits 0-13, stick X in bits 16-23,
    /// stick Y in bits 24-31.
    pub fn encode(&self) -> u32 {
        self.buttons as u32 | (self.stick_x as u8 as u32) << 16 | (self.stick_y as u8 as u32) << 24
    }

    /// [`encode`](Self::encode) in the little-endian byte order the
    /// emulator keeps it in.
    pub fn to_bytes(&self) -> [u8; controller::STATE_SIZE] {
        self.encode().to_le_bytes()
    }
}

/// Map a signed stick byte onto `[-1.0, 1.0]`.
pub fn normalize_axis(value: i8) -> f32 {
    (value as f32 / controller::AXIS_MAX as f32).clamp(-1.0, 1.0)
}

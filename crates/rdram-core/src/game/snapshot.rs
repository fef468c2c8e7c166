use serde::Serialize;

use crate::profile::Field;

/// A decoded field value, host byte order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    F32(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Point-in-time view of the running game.
///
/// A field is `None` when its address is unset or could not be read; the
/// latter are listed in `unreadable`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameStateSnapshot {
    pub player_x: Option<f32>,
    pub player_y: Option<f32>,
    pub player_z: Option<f32>,
    pub health: Option<u16>,
    pub score: Option<u32>,
    pub lives: Option<u8>,
    pub coins: Option<u16>,
    pub stars: Option<u16>,
    pub game_state: Option<u8>,
    pub unreadable: Vec<Field>,
}

impl GameStateSnapshot {
    pub(crate) fn apply(&mut self, field: Field, value: FieldValue) {
        match (field, value) {
            (Field::PlayerX, FieldValue::F32(v)) => self.player_x = Some(v),
            (Field::PlayerY, FieldValue::F32(v)) => self.player_y = Some(v),
            (Field::PlayerZ, FieldValue::F32(v)) => self.player_z = Some(v),
            (Field::Health, FieldValue::U16(v)) => self.health = Some(v),
            (Field::Score, FieldValue::U32(v)) => self.score = Some(v),
            (Field::Lives, FieldValue::U8(v)) => self.lives = Some(v),
            (Field::Coins, FieldValue::U16(v)) => self.coins = Some(v),
            (Field::Stars, FieldValue::U16(v)) => self.stars = Some(v),
            (Field::GameState, FieldValue::U8(v)) => self.game_state = Some(v),
            _ => {}
        }
    }

    /// All three coordinates, if all three were read.
    pub fn position(&self) -> Option<Position> {
        Some(Position {
            x: self.player_x?,
            y: self.player_y?,
            z: self.player_z?,
        })
    }

    pub fn is_out_of_lives(&self) -> bool {
        self.lives == Some(0)
    }

    pub fn is_out_of_health(&self) -> bool {
        self.health == Some(0)
    }

    /// Lives or health at zero. Use the two narrower checks to tell them apart.
    pub fn is_game_over(&self) -> bool {
        self.is_out_of_lives() || self.is_out_of_health()
    }

    /// Game-state flag configured and non-zero.
    pub fn is_paused(&self) -> bool {
        self.game_state.is_some_and(|state| state != 0)
    }
}

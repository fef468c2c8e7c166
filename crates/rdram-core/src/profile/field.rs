use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A semantic game value that a title profile can map to a console address.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    PlayerX,
    PlayerY,
    PlayerZ,
    Health,
    Score,
    Lives,
    Coins,
    /// Collectible count (stars, in Super Mario 64)
    Stars,
    GameState,
}

/// How the bytes behind a field are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    U8,
    U16,
    U32,
    F32,
}

impl FieldWidth {
    pub fn size(self) -> usize {
        match self {
            FieldWidth::U8 => 1,
            FieldWidth::U16 => 2,
            FieldWidth::U32 | FieldWidth::F32 => 4,
        }
    }
}

impl Field {
    pub fn width(self) -> FieldWidth {
        match self {
            Field::PlayerX | Field::PlayerY | Field::PlayerZ => FieldWidth::F32,
            Field::Health | Field::Coins | Field::Stars => FieldWidth::U16,
            Field::Score => FieldWidth::U32,
            Field::Lives | Field::GameState => FieldWidth::U8,
        }
    }
}

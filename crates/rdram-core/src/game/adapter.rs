//! Title-specific decoding on top of the raw field values.

use crate::game::FieldValue;
use crate::profile::{Field, TitleId};

pub trait TitleAdapter: Send + Sync {
    /// Turn a raw field value into its in-game meaning.
    fn decode(&self, field: Field, raw: FieldValue) -> FieldValue;
}

/// Super Mario 64 stores health as a 16-bit word whose high byte is the
/// number of power-meter wedges.
pub struct Sm64Adapter;

impl Sm64Adapter {
    pub const MAX_WEDGES: u16 = 8;
}

impl TitleAdapter for Sm64Adapter {
    fn decode(&self, field: Field, raw: FieldValue) -> FieldValue {
        match (field, raw) {
            (Field::Health, FieldValue::U16(raw)) => {
                FieldValue::U16((raw >> 8).min(Self::MAX_WEDGES))
            }
            _ => raw,
        }
    }
}

/// Adapter registered for `title`, if any.
pub fn adapter_for(title: &TitleId) -> Option<Box<dyn TitleAdapter>> {
    match title.as_str() {
        TitleId::SM64_US => Some(Box::new(Sm64Adapter)),
        _ => None,
    }
}

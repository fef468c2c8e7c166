use std::collections::BTreeMap;

use strum::IntoEnumIterator;
use tracing::debug;

use super::{Field, TitleId};
use crate::error::{Error, Result};

/// Where a field's address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSource {
    Builtin,
    User,
    Unset,
}

/// Field → console address for one title.
///
/// Built-in and user entries are kept apart. A user entry always wins and
/// stays until [`clear_override`](Self::clear_override). Address `0` means
/// the field is not supported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressTable {
    title: Option<TitleId>,
    builtin: BTreeMap<Field, u32>,
    user: BTreeMap<Field, u32>,
}

impl AddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin(title: TitleId, builtin: BTreeMap<Field, u32>) -> Self {
        Self {
            title: Some(title),
            builtin,
            user: BTreeMap::new(),
        }
    }

    pub fn title(&self) -> Option<&TitleId> {
        self.title.as_ref()
    }

    /// Effective address, `0` when unset.
    pub fn get(&self, field: Field) -> u32 {
        self.user
            .get(&field)
            .or_else(|| self.builtin.get(&field))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_configured(&self, field: Field) -> bool {
        self.get(field) != 0
    }

    pub fn source(&self, field: Field) -> AddressSource {
        if self.user.contains_key(&field) {
            AddressSource::User
        } else if self.builtin.get(&field).is_some_and(|&address| address != 0) {
            AddressSource::Builtin
        } else {
            AddressSource::Unset
        }
    }

    pub fn set_address(&mut self, field: Field, address: u32) {
        debug!("Override {} = 0x{:08X}", field, address);
        self.user.insert(field, address);
    }

    /// Drop the user entry for `field`, falling back to the built-in value.
    pub fn clear_override(&mut self, field: Field) {
        self.user.remove(&field);
    }

    /// Every field in declaration order with its address and origin.
    pub fn entries(&self) -> Vec<(Field, u32, AddressSource)> {
        Field::iter()
            .map(|field| (field, self.get(field), self.source(field)))
            .collect()
    }

    /// Every field, including unset ones, by name.
    pub fn export_addresses(&self) -> BTreeMap<String, u32> {
        Field::iter()
            .map(|field| (field.to_string(), self.get(field)))
            .collect()
    }

    /// Restore an exported map as user entries.
    ///
    /// All names are validated before anything changes. Fields missing from
    /// `addresses` keep their current value.
    pub fn import_addresses(&mut self, addresses: &BTreeMap<String, u32>) -> Result<()> {
        let parsed = addresses
            .iter()
            .map(|(name, &address)| {
                let field = name
                    .parse::<Field>()
                    .map_err(|_| Error::UnknownField(name.clone()))?;
                Ok((field, address))
            })
            .collect::<Result<Vec<_>>>()?;

        self.user.extend(parsed);
        Ok(())
    }
}

//! Title registry: which address set belongs to which game.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AddressTable, Field};
use crate::error::{Error, Result};

/// Stable identifier of a registered title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleId(String);

impl TitleId {
    pub const SM64_US: &'static str = "sm64-us";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A title as written in configuration: addresses keyed by field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub addresses: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleProfile {
    pub id: TitleId,
    pub name: String,
    /// Lowercase fragments matched against a free-text title
    pub aliases: Vec<String>,
    pub addresses: BTreeMap<Field, u32>,
}

impl TitleProfile {
    pub fn matches(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        title == self.id.as_str() || self.aliases.iter().any(|alias| title.contains(alias))
    }

    pub fn table(&self) -> AddressTable {
        AddressTable::with_builtin(self.id.clone(), self.addresses.clone())
    }
}

impl TryFrom<TitleDefinition> for TitleProfile {
    type Error = Error;

    fn try_from(definition: TitleDefinition) -> Result<Self> {
        let addresses = definition
            .addresses
            .iter()
            .map(|(name, &address)| {
                let field = name
                    .parse::<Field>()
                    .map_err(|_| Error::UnknownField(name.clone()))?;
                Ok((field, address))
            })
            .collect::<Result<_>>()?;

        // A blank alias would match every title.
        let aliases: Vec<String> = definition
            .aliases
            .iter()
            .chain([&definition.name])
            .map(|alias| alias.trim().to_lowercase())
            .filter(|alias| !alias.is_empty())
            .collect();

        Ok(Self {
            id: TitleId::new(definition.id),
            name: definition.name,
            aliases,
            addresses,
        })
    }
}

/// Built-in titles followed by user-defined ones. Lookup is first match.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    titles: Vec<TitleProfile>,
}

impl ProfileRegistry {
    pub fn builtin() -> Self {
        Self {
            titles: vec![super_mario_64_us()],
        }
    }

    /// Built-ins plus `definitions`, which are matched after the built-ins.
    pub fn with_definitions(definitions: &[TitleDefinition]) -> Result<Self> {
        let mut registry = Self::builtin();
        for definition in definitions {
            registry
                .titles
                .push(TitleProfile::try_from(definition.clone())?);
        }
        Ok(registry)
    }

    pub fn titles(&self) -> &[TitleProfile] {
        &self.titles
    }

    pub fn get(&self, id: &str) -> Option<&TitleProfile> {
        self.titles.iter().find(|title| title.id.as_str() == id)
    }

    /// Case-insensitive substring lookup of a free-text title.
    pub fn resolve(&self, title: &str) -> Option<&TitleProfile> {
        self.titles.iter().find(|profile| profile.matches(title))
    }

    /// Address table for `title`; an empty table if nothing matches.
    pub fn table_for(&self, title: &str) -> AddressTable {
        match self.resolve(title) {
            Some(profile) => {
                debug!("Title '{}' resolved to {}", title, profile.id);
                profile.table()
            }
            None => {
                debug!("No profile for title '{}', starting empty", title);
                AddressTable::new()
            }
        }
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Super Mario 64 (NTSC-U), fields of `gMarioStates[0]` at 0x8033B170.
fn super_mario_64_us() -> TitleProfile {
    TitleProfile {
        id: TitleId::new(TitleId::SM64_US),
        name: "Super Mario 64 (USA)".to_string(),
        aliases: vec!["super mario 64".to_string(), "sm64".to_string()],
        addresses: BTreeMap::from([
            (Field::PlayerX, 0x8033_B1AC),
            (Field::PlayerY, 0x8033_B1B0),
            (Field::PlayerZ, 0x8033_B1B4),
            (Field::Coins, 0x8033_B218),
            (Field::Stars, 0x8033_B21A),
            (Field::Lives, 0x8033_B21D),
            (Field::Health, 0x8033_B21E),
        ]),
    }
}

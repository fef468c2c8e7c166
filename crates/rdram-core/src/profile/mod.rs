//! Per-title address tables
//!
//! A title profile maps semantic fields to console addresses. Profiles come
//! from the built-in registry or from configuration; user overrides sit on
//! top and can be exported to, and restored from, a JSON file.

mod field;
mod registry;
mod table;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

pub use field::{Field, FieldWidth};
pub use registry::{ProfileRegistry, TitleDefinition, TitleId, TitleProfile};
pub use table::{AddressSource, AddressTable};

/// On-disk form of an exported address table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileFile {
    /// Title the addresses were tuned for
    pub title: String,
    pub addresses: BTreeMap<String, u32>,
}

impl ProfileFile {
    pub fn from_table(title: impl Into<String>, table: &AddressTable) -> Self {
        Self {
            title: title.into(),
            addresses: table.export_addresses(),
        }
    }
}

pub fn save_profile<P: AsRef<Path>>(path: P, profile: &ProfileFile) -> Result<()> {
    let content = serde_json::to_string_pretty(profile)?;
    fs::write(&path, content)?;
    info!("Saved profile to {}", path.as_ref().display());
    Ok(())
}

pub fn load_profile<P: AsRef<Path>>(path: P) -> Result<ProfileFile> {
    let content = fs::read_to_string(path)?;
    let profile = serde_json::from_str(&content)?;
    Ok(profile)
}

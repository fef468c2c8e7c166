//! Profile command implementation.
//!
//! Shows, exports and imports per-title address tables. None of these need a
//! running emulator.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use rdram_core::{AddressSource, AddressTable, BridgeConfig, ProfileFile, load_profile, save_profile};

use super::hex_utils::format_console_address;

fn title_or_configured<'a>(config: &'a BridgeConfig, title: Option<&'a str>) -> Result<&'a str> {
    title
        .or(config.title.as_deref())
        .context("No title given and none configured")
}

/// Table for `title` with the configured profile file applied.
fn effective_table(config: &BridgeConfig, title: &str) -> Result<AddressTable> {
    let mut table = config.registry()?.table_for(title);
    if let Some(path) = &config.profile {
        let profile = load_profile(path)
            .with_context(|| format!("Failed to load profile {}", path.display()))?;
        table.import_addresses(&profile.addresses)?;
    }
    Ok(table)
}

/// Print every field of the title's table
pub fn show(config: &BridgeConfig, title: Option<&str>) -> Result<()> {
    let title = title_or_configured(config, title)?;
    let table = effective_table(config, title)?;
    print_table(title, &table);
    Ok(())
}

/// Write the title's effective table to `path`
pub fn export(config: &BridgeConfig, title: Option<&str>, path: &Path) -> Result<()> {
    let title = title_or_configured(config, title)?;
    let table = effective_table(config, title)?;
    save_profile(path, &ProfileFile::from_table(title, &table))?;
    println!("Exported '{}' to {}", title, path.display());
    Ok(())
}

/// Load `path`, check it against its title's table, and show the result
pub fn import(config: &BridgeConfig, path: &Path) -> Result<()> {
    let profile =
        load_profile(path).with_context(|| format!("Failed to load profile {}", path.display()))?;
    let mut table = config.registry()?.table_for(&profile.title);
    table.import_addresses(&profile.addresses)?;

    print_table(&profile.title, &table);
    println!();
    println!(
        "Profile is valid. Set `profile = \"{}\"` in the config to apply it.",
        path.display()
    );
    Ok(())
}

fn print_table(title: &str, table: &AddressTable) {
    let id = table
        .title()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "no built-in profile".to_string());
    println!("{} ({})", title.bold(), id);

    for (field, address, source) in table.entries() {
        let address = format_console_address(address);
        let line = format!("  {:<12} {:<12}", field.to_string(), address);
        match source {
            AddressSource::User => println!("{} {}", line, "user".cyan()),
            AddressSource::Builtin => println!("{} built-in", line),
            AddressSource::Unset => println!("{}", line.dimmed()),
        }
    }
}

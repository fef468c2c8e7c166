//! Regions command implementation.

use anyhow::Result;
use owo_colors::OwoColorize;
use rdram_core::{BridgeConfig, ReadMemory};

use super::attach;

/// List the target's memory regions
pub fn run(config: &BridgeConfig, pid: Option<u32>, writable_only: bool, min_size: u64) -> Result<()> {
    let memory = attach(config, pid)?;

    let mut count = 0usize;
    for region in memory.regions()? {
        if (writable_only && !region.is_writable()) || region.size < min_size {
            continue;
        }
        if config.discovery.min_size <= region.size && region.size <= config.discovery.max_size {
            println!("{}", region.green());
        } else {
            println!("{}", region);
        }
        count += 1;
    }

    println!();
    println!("{} regions ({})", count, memory.status());
    Ok(())
}

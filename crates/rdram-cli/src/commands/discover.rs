//! Discover command implementation.

use anyhow::{Result, bail};
use owo_colors::OwoColorize;
use rdram_core::{BridgeConfig, DiscoveryConfig, DiscoveryMethod, RamDiscovery, wait_for_ram};

use super::{attach, install_shutdown};

/// Locate the console RAM, optionally waiting for a game to boot
pub async fn run(
    config: &BridgeConfig,
    pid: Option<u32>,
    method: Option<DiscoveryMethod>,
    wait: bool,
) -> Result<()> {
    let memory = attach(config, pid)?;
    let discovery = DiscoveryConfig {
        method: method.unwrap_or(config.discovery.method),
        ..config.discovery.clone()
    };

    let ram = if wait {
        let shutdown = install_shutdown()?;
        println!("Waiting for console RAM... (Press Ctrl+C to quit)");
        match wait_for_ram(memory.as_ref(), &discovery, &shutdown).await? {
            Some(ram) => ram,
            None => {
                println!("Cancelled");
                return Ok(());
            }
        }
    } else {
        match RamDiscovery::new(memory.as_ref(), discovery.clone()).locate(discovery.method) {
            Ok(ram) => ram,
            Err(e) => bail!("{}", e.status_message()),
        }
    };

    println!("{} {}", "Console RAM:".green().bold(), ram);
    println!("  base:   0x{:X}", ram.base);
    println!("  size:   0x{:X}", ram.size);
    println!("  method: {}", discovery.method);
    Ok(())
}

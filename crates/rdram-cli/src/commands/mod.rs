//! CLI command implementations.
//!
//! This module contains the implementation of each CLI command, plus the
//! attachment and shutdown plumbing they share.

pub mod discover;
pub mod hex_utils;
pub mod hexdump;
pub mod input;
pub mod profile;
pub mod regions;
pub mod snapshot;

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use rdram_core::{BridgeConfig, GameMonitor, ProcessMemory, ShutdownSignal, find_process_id, load_profile};
use tracing::{debug, info};

/// Attach to `pid`, or to the configured process.
pub fn attach(config: &BridgeConfig, pid: Option<u32>) -> Result<Arc<ProcessMemory>> {
    let pid = match pid.or(config.process.pid) {
        Some(pid) => pid,
        None => find_process_id(&config.process.name)
            .map_err(|e| anyhow!(e.status_message()))
            .with_context(|| format!("No running process matches '{}'", config.process.name))?,
    };

    let memory = Arc::new(ProcessMemory::new());
    memory
        .connect(pid)
        .map_err(|e| anyhow!(e.status_message()))
        .with_context(|| format!("Failed to attach to process {}", pid))?;
    Ok(memory)
}

/// Game monitor for the configured (or given) title, with the configured
/// profile file applied.
pub fn build_monitor(
    config: &BridgeConfig,
    memory: Arc<ProcessMemory>,
    title: Option<&str>,
) -> Result<GameMonitor> {
    let mut monitor = GameMonitor::new(memory, config.registry()?, config.discovery.clone());
    if let Some(title) = title.or(config.title.as_deref()) {
        monitor.configure_for_title(title);
    }
    if let Some(path) = &config.profile {
        let profile = load_profile(path)
            .with_context(|| format!("Failed to load profile {}", path.display()))?;
        monitor.table_mut().import_addresses(&profile.addresses)?;
        debug!("Applied profile {}", path.display());
    }
    Ok(monitor)
}

/// Shutdown signal triggered by Ctrl+C.
pub fn install_shutdown() -> Result<Arc<ShutdownSignal>> {
    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;
    Ok(shutdown)
}

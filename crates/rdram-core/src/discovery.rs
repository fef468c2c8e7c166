//! Locating the console RAM inside the emulator's address space.
//!
//! Two strategies are available. The heuristic one looks for a writable,
//! RAM-sized region that holds data. The signature one looks for the
//! exception-vector stub the console's boot code copies to the base of RAM.
//! Both return the first match in region order.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::memory::layout::{rdram, scan, timing};
use crate::memory::{MemoryRegion, RamRegion, ReadMemory};
use crate::shutdown::ShutdownSignal;
use crate::signature::{format_pattern, parse_pattern};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum DiscoveryMethod {
    Heuristic,
    Signature,
    /// Signature first, heuristic if no signature is found
    #[default]
    SignatureThenHeuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub method: DiscoveryMethod,
    /// Smallest region accepted as console RAM
    pub min_size: u64,
    /// Largest region accepted as console RAM
    pub max_size: u64,
    /// Bytes read from a candidate's start when checking it holds data
    pub probe_len: usize,
    /// Boot signature, hex bytes with `??` wildcards
    pub signature: String,
    /// Distance from the start of RAM to the signature
    pub signature_offset: u64,
    pub poll_interval_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            method: DiscoveryMethod::default(),
            min_size: rdram::BASE_SIZE,
            max_size: rdram::EXPANDED_SIZE + rdram::SIZE_SLACK,
            probe_len: scan::PROBE_LEN,
            signature: format_pattern(&rdram::BOOT_SIGNATURE.map(Some)),
            signature_offset: 0,
            poll_interval_ms: timing::DISCOVERY_POLL_INTERVAL_MS,
        }
    }
}

impl DiscoveryConfig {
    fn accepts_size(&self, size: u64) -> bool {
        (self.min_size..=self.max_size).contains(&size)
    }
}

pub struct RamDiscovery<'a, R: ReadMemory + ?Sized> {
    reader: &'a R,
    config: DiscoveryConfig,
}

impl<'a, R: ReadMemory + ?Sized> RamDiscovery<'a, R> {
    pub fn new(reader: &'a R, config: DiscoveryConfig) -> Self {
        Self { reader, config }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn locate(&self, method: DiscoveryMethod) -> Result<RamRegion> {
        self.locate_until(method, &ShutdownSignal::new())
    }

    /// Run `method`, checking `cancel` between regions and search windows.
    pub fn locate_until(
        &self,
        method: DiscoveryMethod,
        cancel: &ShutdownSignal,
    ) -> Result<RamRegion> {
        let ram = match method {
            DiscoveryMethod::Heuristic => self.heuristic(cancel),
            DiscoveryMethod::Signature => self.signature(cancel),
            DiscoveryMethod::SignatureThenHeuristic => match self.signature(cancel) {
                Err(Error::RegionNotFound(reason)) => {
                    debug!("{}; trying heuristic", reason);
                    self.heuristic(cancel)
                }
                other => other,
            },
        }?;
        info!("Console RAM located at {} ({})", ram, method);
        Ok(ram)
    }

    /// First writable region in the size band whose prefix is not all zero.
    pub fn heuristic(&self, cancel: &ShutdownSignal) -> Result<RamRegion> {
        for region in self.reader.regions()? {
            if cancel.is_shutdown() {
                return Err(Error::Cancelled);
            }
            if !region.is_readable()
                || !region.is_writable()
                || !self.config.accepts_size(region.size)
            {
                continue;
            }

            if self.holds_data(&region)? {
                return Ok(RamRegion::from(&region));
            }
        }

        Err(Error::RegionNotFound(format!(
            "no writable region of {:#x}-{:#x} bytes with data",
            self.config.min_size, self.config.max_size
        )))
    }

    fn holds_data(&self, region: &MemoryRegion) -> Result<bool> {
        let probe_len = (self.config.probe_len as u64).min(region.size) as usize;
        match self.reader.read_bytes(region.base, probe_len) {
            Ok(prefix) => {
                let has_data = prefix.iter().any(|&b| b != 0);
                if !has_data {
                    debug!("Skipping all-zero candidate {}", region);
                }
                Ok(has_data)
            }
            Err(e) if e.is_terminal() => Err(e),
            Err(e) => {
                debug!("Skipping unreadable candidate {}: {}", region, e);
                Ok(false)
            }
        }
    }

    /// RAM starts `signature_offset` bytes before the first signature match.
    pub fn signature(&self, cancel: &ShutdownSignal) -> Result<RamRegion> {
        let signature = parse_pattern(&self.config.signature)?;

        for region in self.reader.regions()? {
            if cancel.is_shutdown() {
                return Err(Error::Cancelled);
            }
            if !region.is_readable() || region.size < self.config.min_size {
                continue;
            }

            let found = match self.reader.search_signature(&region, &signature, cancel) {
                Ok(found) => found,
                Err(e) if e.is_terminal() || matches!(e, Error::Cancelled) => return Err(e),
                Err(e) => {
                    debug!("Signature scan of {} failed: {}", region, e);
                    continue;
                }
            };
            let Some(address) = found else {
                continue;
            };

            let Some(base) = address
                .checked_sub(self.config.signature_offset)
                .filter(|&base| base >= region.base)
            else {
                debug!(
                    "Signature at 0x{:X} is too close to the start of {}",
                    address, region
                );
                continue;
            };
            let size = (region.end() - base).min(self.config.max_size);
            if size < self.config.min_size {
                debug!("Signature at 0x{:X} leaves only {:#x} bytes", address, size);
                continue;
            }
            return Ok(RamRegion::new(base, size));
        }

        Err(Error::RegionNotFound(format!(
            "boot signature {} not found",
            self.config.signature
        )))
    }
}

/// Retry discovery every `poll_interval_ms` until RAM appears.
///
/// Returns `Ok(None)` if `shutdown` fires first. Attachment-level errors end
/// the wait immediately.
pub async fn wait_for_ram<R: ReadMemory + ?Sized>(
    reader: &R,
    config: &DiscoveryConfig,
    shutdown: &ShutdownSignal,
) -> Result<Option<RamRegion>> {
    let discovery = RamDiscovery::new(reader, config.clone());
    let interval = Duration::from_millis(config.poll_interval_ms);

    loop {
        match discovery.locate_until(config.method, shutdown) {
            Ok(ram) => return Ok(Some(ram)),
            Err(Error::Cancelled) => return Ok(None),
            Err(Error::RegionNotFound(reason)) => {
                debug!("Console RAM not found yet: {}", reason);
            }
            Err(e) => return Err(e),
        }

        if shutdown.wait(interval).await {
            return Ok(None);
        }
    }
}

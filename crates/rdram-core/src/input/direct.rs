//! Writing controller state straight into the emulator's input block.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::input::{ControllerState, PlayerIndex};
use crate::memory::layout::controller;
use crate::memory::{ProcessMemory, ReadMemory, WriteMemory};
use crate::shutdown::ShutdownSignal;
use crate::signature::parse_pattern;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectInputConfig {
    /// Use the direct path when the controller block can be found
    pub enabled: bool,
    /// Host address of player 1's `BUTTONS` word
    pub controller_address: Option<u64>,
    /// Signature locating the block when no address is given
    pub signature: Option<String>,
    /// Distance from the signature match to player 1's word
    pub signature_offset: i64,
    /// Distance between consecutive players' words
    pub stride: u64,
}

impl Default for DirectInputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            controller_address: None,
            signature: None,
            signature_offset: 0,
            stride: controller::DEFAULT_STRIDE,
        }
    }
}

impl DirectInputConfig {
    /// Player slots must not overlap.
    pub fn check_stride(&self) -> Result<()> {
        if self.stride < controller::STATE_SIZE as u64 {
            return Err(Error::Config(format!(
                "input.stride must be at least {} bytes, got {}",
                controller::STATE_SIZE,
                self.stride
            )));
        }
        Ok(())
    }
}

/// Location of the per-player `BUTTONS` words in the host process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerBlock {
    pub base: u64,
    pub stride: u64,
}

impl ControllerBlock {
    pub fn slot_address(&self, player: PlayerIndex) -> u64 {
        self.base + player.get() as u64 * self.stride
    }

    /// Resolve the block from a configured address or by signature search
    /// over writable regions.
    pub fn resolve<R: ReadMemory + ?Sized>(reader: &R, config: &DirectInputConfig) -> Result<Self> {
        config.check_stride()?;
        if let Some(base) = config.controller_address {
            return Ok(Self {
                base,
                stride: config.stride,
            });
        }

        let Some(signature) = &config.signature else {
            return Err(Error::RegionNotFound(
                "no controller address or signature configured".to_string(),
            ));
        };
        let pattern = parse_pattern(signature)?;
        let never = ShutdownSignal::new();

        for region in reader.regions()? {
            if !region.is_readable() || !region.is_writable() {
                continue;
            }
            let Some(found) = reader.search_signature(&region, &pattern, &never)? else {
                continue;
            };
            let Some(base) = found.checked_add_signed(config.signature_offset) else {
                debug!("Controller signature offset overflows at 0x{:X}", found);
                continue;
            };
            info!("Controller block found at 0x{:X}", base);
            return Ok(Self {
                base,
                stride: config.stride,
            });
        }

        Err(Error::RegionNotFound(format!(
            "controller signature {} not found",
            signature
        )))
    }
}

/// Direct delivery: one little-endian `BUTTONS` word per player.
pub struct DirectPad {
    memory: Arc<ProcessMemory>,
    block: ControllerBlock,
}

impl DirectPad {
    pub fn new(memory: Arc<ProcessMemory>, block: ControllerBlock) -> Self {
        Self { memory, block }
    }

    pub fn block(&self) -> ControllerBlock {
        self.block
    }

    pub fn write(&self, player: PlayerIndex, state: &ControllerState) -> Result<()> {
        self.memory
            .write_bytes(self.block.slot_address(player), &state.to_bytes())
    }
}

//! # rdram-core
//!
//! Core library for bridging to a running Nintendo 64 emulator.
//!
//! This crate provides:
//! - Process attachment and big-endian reads/writes of foreign memory
//! - Discovery of the console RAM inside the emulator's address space
//! - Per-title address tables (built-in, configured, user-tuned)
//! - Typed game-state snapshots
//! - Synthetic controller input, via a virtual controller or direct writes

pub mod config;
pub mod discovery;
pub mod error;
pub mod game;
pub mod input;
pub mod memory;
pub mod profile;
pub mod shutdown;
pub mod signature;

pub use config::{BridgeConfig, ProcessConfig};
pub use discovery::{DiscoveryConfig, DiscoveryMethod, RamDiscovery, wait_for_ram};
pub use error::{Error, Result};
pub use game::{FieldValue, GameMonitor, GameStateSnapshot, Position, TitleAdapter};
pub use input::{
    Axis, Button, ChannelRegistry, ControllerBlock, ControllerState, DirectInputConfig,
    InputEvent, InputInjector, InputPath, PlayerIndex, VirtualControllerRegistry,
};
pub use memory::{
    MemoryRegion, ProcessMemory, Protection, RamRegion, ReadMemory, WriteMemory, find_process_id,
};
pub use profile::{
    AddressSource, AddressTable, Field, ProfileFile, ProfileRegistry, TitleDefinition, TitleId,
    load_profile, save_profile,
};
pub use shutdown::ShutdownSignal;

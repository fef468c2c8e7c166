//! Synthetic controller input
//!
//! Input reaches the emulator either through a host-side virtual controller
//! registry or by writing each player's `BUTTONS` word into the emulator's
//! memory. [`InputInjector`] keeps the authoritative per-player state and
//! picks the path.

mod controller;
mod direct;
mod injector;
mod virtual_pad;

pub use controller::{Axis, Button, ControllerState, PlayerIndex, normalize_axis};
pub use direct::{ControllerBlock, DirectInputConfig, DirectPad};
pub use injector::{InputInjector, InputPath};
pub use virtual_pad::{ChannelRegistry, InputEvent, VirtualControllerRegistry};

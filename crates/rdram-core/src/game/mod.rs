mod adapter;
mod monitor;
mod snapshot;

pub use adapter::{Sm64Adapter, TitleAdapter, adapter_for};
pub use monitor::GameMonitor;
pub use snapshot::{FieldValue, GameStateSnapshot, Position};

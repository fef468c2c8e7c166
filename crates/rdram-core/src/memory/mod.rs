pub mod layout;
mod access;
mod process;
mod reader;
mod region;

#[cfg(test)]
pub mod mock;

pub use access::ProcessMemory;
pub use process::{ProcessHandle, find_process_id};
pub use reader::{MemoryBackend, ReadMemory, RegionWalk, Regions, WriteMemory};
pub use region::{MemoryRegion, Protection, RamRegion};

#[cfg(test)]
pub use mock::{MockMemory, MockMemoryBuilder};

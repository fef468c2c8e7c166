//! In-memory stand-in for an attached process.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::memory::{MemoryBackend, MemoryRegion, Protection, RegionWalk};

enum MockEntry {
    Mapped { region: MemoryRegion, data: Vec<u8> },
    Undescribable,
}

/// Shared switch that simulates the target process exiting.
#[derive(Clone)]
pub struct MockLiveness(Arc<AtomicBool>);

impl MockLiveness {
    pub fn kill(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct MockMemory {
    pid: u32,
    entries: Mutex<Vec<MockEntry>>,
    alive: Arc<AtomicBool>,
    writes: AtomicUsize,
    tear_after: Option<usize>,
}

impl MockMemory {
    pub fn liveness(&self) -> MockLiveness {
        MockLiveness(Arc::clone(&self.alive))
    }

    fn with_region<T>(
        &self,
        address: u64,
        op: impl FnOnce(&MemoryRegion, &mut Vec<u8>) -> io::Result<T>,
    ) -> io::Result<T> {
        let mut entries = self.entries.lock().unwrap();
        for entry in entries.iter_mut() {
            if let MockEntry::Mapped { region, data } = entry
                && region.contains(address)
            {
                return op(region, data);
            }
        }
        Err(io::Error::other(format!("address 0x{:X} is unmapped", address)))
    }
}

impl MemoryBackend for MockMemory {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn read_into(&self, address: u64, buffer: &mut [u8]) -> io::Result<usize> {
        self.with_region(address, |region, data| {
            if !region.is_readable() {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            let start = (address - region.base) as usize;
            let len = buffer.len().min(data.len() - start);
            buffer[..len].copy_from_slice(&data[start..start + len]);
            Ok(len)
        })
    }

    fn write_from(&self, address: u64, bytes: &[u8]) -> io::Result<usize> {
        let call = self.writes.fetch_add(1, Ordering::SeqCst);
        let torn = self.tear_after == Some(call);
        self.with_region(address, |region, data| {
            if !region.is_writable() {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            let start = (address - region.base) as usize;
            let mut len = bytes.len().min(data.len() - start);
            if torn {
                len /= 2;
            }
            data[start..start + len].copy_from_slice(&bytes[..len]);
            Ok(len)
        })
    }

    fn regions(&self) -> io::Result<RegionWalk> {
        let entries = self.entries.lock().unwrap();
        let walk: Vec<io::Result<MemoryRegion>> = entries
            .iter()
            .map(|entry| match entry {
                MockEntry::Mapped { region, .. } => Ok(region.clone()),
                MockEntry::Undescribable => Err(io::Error::other("region query refused")),
            })
            .collect();
        Ok(Box::new(walk.into_iter()))
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Builder for [`MockMemory`]; regions are reported in insertion order.
pub struct MockMemoryBuilder {
    pid: u32,
    entries: Vec<MockEntry>,
    tear_after: Option<usize>,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self {
            pid: 4242,
            entries: Vec::new(),
            tear_after: None,
        }
    }

    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    /// Add a zero-filled region.
    pub fn region(mut self, base: u64, size: u64, protection: Protection) -> Self {
        self.entries.push(MockEntry::Mapped {
            region: MemoryRegion::new(base, size, protection),
            data: vec![0; size as usize],
        });
        self
    }

    pub fn writable(self, base: u64, size: u64) -> Self {
        self.region(base, size, Protection::READ_WRITE)
    }

    /// Add a map entry the OS refuses to describe.
    pub fn undescribable(mut self) -> Self {
        self.entries.push(MockEntry::Undescribable);
        self
    }

    /// Copy `bytes` into whichever region holds `address`.
    pub fn fill(mut self, address: u64, bytes: &[u8]) -> Self {
        let (region, data) = self
            .entries
            .iter_mut()
            .find_map(|entry| match entry {
                MockEntry::Mapped { region, data } if region.contains(address) => {
                    Some((region, data))
                }
                _ => None,
            })
            .expect("fill target must be inside a mock region");
        let start = (address - region.base) as usize;
        data[start..start + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// Tear the write call after `successful` complete ones: only half of
    /// its bytes land. Later calls behave normally.
    pub fn tear_write_after(mut self, successful: usize) -> Self {
        self.tear_after = Some(successful);
        self
    }

    pub fn build(self) -> MockMemory {
        MockMemory {
            pid: self.pid,
            entries: Mutex::new(self.entries),
            alive: Arc::new(AtomicBool::new(true)),
            writes: AtomicUsize::new(0),
            tear_after: self.tear_after,
        }
    }
}

impl Default for MockMemoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

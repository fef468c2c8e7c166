//! Address-space regions of the target process and the located console RAM.

use std::fmt;

use crate::error::{Error, Result};
use crate::memory::layout::rdram;

/// Page protection of one mapped region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Protection {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl Protection {
    pub const READ_WRITE: Protection = Protection {
        read: true,
        write: true,
        execute: false,
    };

    pub const READ_ONLY: Protection = Protection {
        read: true,
        write: false,
        execute: false,
    };

    /// Parse the `rwxp` column of a `/proc/<pid>/maps` line.
    pub fn from_perms(perms: &str) -> Self {
        let mut chars = perms.chars();
        Self {
            read: chars.next() == Some('r'),
            write: chars.next() == Some('w'),
            execute: chars.next() == Some('x'),
        }
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.read { 'r' } else { '-' },
            if self.write { 'w' } else { '-' },
            if self.execute { 'x' } else { '-' }
        )
    }
}

/// One region of the target process's virtual memory map.
///
/// Only meaningful for the attachment it was enumerated under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    pub base: u64,
    pub size: u64,
    pub protection: Protection,
    /// Backing file or pseudo-path, when the platform reports one
    pub path: Option<String>,
}

impl MemoryRegion {
    pub fn new(base: u64, size: u64, protection: Protection) -> Self {
        Self {
            base,
            size,
            protection,
            path: None,
        }
    }

    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.size)
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.base && address < self.end()
    }

    pub fn is_readable(&self) -> bool {
        self.protection.read
    }

    pub fn is_writable(&self) -> bool {
        self.protection.write
    }

    /// Parse one line of `/proc/<pid>/maps`:
    /// `START-END perms offset dev inode [path]`
    pub fn from_maps_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let range = parts.next()?;
        let perms = parts.next()?;
        let (start, end) = range.split_once('-')?;
        let start = u64::from_str_radix(start, 16).ok()?;
        let end = u64::from_str_radix(end, 16).ok()?;
        if end <= start {
            return None;
        }

        // offset, dev, inode
        let path = parts.nth(3).map(str::to_string);

        Some(Self {
            base: start,
            size: end - start,
            protection: Protection::from_perms(perms),
            path,
        })
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:012X}-0x{:012X} {} {:>8} KiB",
            self.base,
            self.end(),
            self.protection,
            self.size / 1024
        )?;
        if let Some(path) = &self.path {
            write!(f, " {}", path)?;
        }
        Ok(())
    }
}

/// The console RAM as located inside the host process.
///
/// This is the only place console addresses are turned into host addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamRegion {
    pub base: u64,
    pub size: u64,
}

impl RamRegion {
    pub fn new(base: u64, size: u64) -> Self {
        Self { base, size }
    }

    /// Translate a console address (KSEG0, KSEG1 or physical) into a host
    /// address, checking that `len` bytes fit inside the RAM.
    pub fn host_address(&self, console_address: u32, len: usize) -> Result<u64> {
        let offset = (console_address & rdram::PHYSICAL_MASK) as u64;
        let out_of_range = Error::AddressOutOfRange {
            address: console_address,
            ram_size: self.size,
        };
        match offset.checked_add(len as u64) {
            Some(end) if end <= self.size => Ok(self.base + offset),
            _ => Err(out_of_range),
        }
    }
}

impl From<&MemoryRegion> for RamRegion {
    fn from(region: &MemoryRegion) -> Self {
        Self::new(region.base, region.size)
    }
}

impl fmt::Display for RamRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:X} ({} MiB)",
            self.base,
            self.size as f64 / (1024.0 * 1024.0)
        )
    }
}

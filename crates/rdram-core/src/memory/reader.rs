use std::io;

use memchr::memmem;
use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::MemoryRegion;
use crate::memory::layout::scan;
use crate::shutdown::ShutdownSignal;
use crate::signature::exact_bytes;

/// Lazily produced region list; entries the OS refuses to describe are `Err`.
pub type RegionWalk = Box<dyn Iterator<Item = io::Result<MemoryRegion>> + Send>;

/// Lazily produced list of describable regions.
pub type Regions = Box<dyn Iterator<Item = MemoryRegion> + Send>;

/// Raw access to one attached process.
///
/// Implemented by the OS handle and by the in-memory mock. Implementations
/// report how many bytes were actually transferred; all completeness and
/// attachment policy lives in [`ProcessMemory`](crate::memory::ProcessMemory).
pub trait MemoryBackend: Send + Sync {
    fn pid(&self) -> u32;

    /// Copy from `address` into `buffer`, returning the number of bytes read.
    fn read_into(&self, address: u64, buffer: &mut [u8]) -> io::Result<usize>;

    /// Copy `data` to `address`, returning the number of bytes written.
    fn write_from(&self, address: u64, data: &[u8]) -> io::Result<usize>;

    /// Walk the virtual memory map from the start.
    fn regions(&self) -> io::Result<RegionWalk>;

    /// Whether the target process still exists.
    fn is_alive(&self) -> bool;
}

/// Typed, big-endian reads from the emulated console's point of view.
pub trait ReadMemory {
    /// Read exactly `size` bytes, or fail. Never returns a short buffer.
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    /// Enumerate the target's memory regions, skipping undescribable ones.
    fn regions(&self) -> Result<Regions>;

    fn read_array<const N: usize>(&self, address: u64) -> Result<[u8; N]> {
        let bytes = self.read_bytes(address, N)?;
        bytes.try_into().map_err(|bytes: Vec<u8>| Error::ReadFailed {
            address,
            size: N,
            message: format!("expected {} bytes, got {}", N, bytes.len()),
        })
    }

    fn read_u8(&self, address: u64) -> Result<u8> {
        Ok(self.read_array::<1>(address)?[0])
    }

    /// Big-endian 16-bit read
    fn read_u16(&self, address: u64) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array(address)?))
    }

    /// Big-endian 32-bit read
    fn read_u32(&self, address: u64) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array(address)?))
    }

    /// Big-endian IEEE-754 single read
    fn read_f32(&self, address: u64) -> Result<f32> {
        Ok(f32::from_be_bytes(self.read_array(address)?))
    }

    /// Absolute address of the first occurrence of `pattern` inside
    /// `region`, ascending. Subtract `region.base` for the offset.
    fn search_pattern(&self, region: &MemoryRegion, pattern: &[u8]) -> Result<Option<u64>> {
        self.search_pattern_until(region, pattern, &ShutdownSignal::new())
    }

    /// Cancellable form of [`search_pattern`](Self::search_pattern).
    fn search_pattern_until(
        &self,
        region: &MemoryRegion,
        pattern: &[u8],
        cancel: &ShutdownSignal,
    ) -> Result<Option<u64>> {
        let finder = memmem::Finder::new(pattern);
        scan_windows(self, region, pattern.len(), cancel, |window| {
            finder.find(window)
        })
    }

    /// Absolute address of the first occurrence of a wildcard signature
    /// (`None` matches any byte).
    fn search_signature(
        &self,
        region: &MemoryRegion,
        signature: &[Option<u8>],
        cancel: &ShutdownSignal,
    ) -> Result<Option<u64>> {
        if let Some(bytes) = exact_bytes(signature) {
            return self.search_pattern_until(region, &bytes, cancel);
        }
        scan_windows(self, region, signature.len(), cancel, |window| {
            find_signature(window, signature)
        })
    }
}

/// Typed, big-endian writes. Each call is all-or-nothing.
pub trait WriteMemory: ReadMemory {
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()>;

    fn write_u8(&self, address: u64, value: u8) -> Result<()> {
        self.write_bytes(address, &[value])
    }

    fn write_u16(&self, address: u64, value: u16) -> Result<()> {
        self.write_bytes(address, &value.to_be_bytes())
    }

    fn write_u32(&self, address: u64, value: u32) -> Result<()> {
        self.write_bytes(address, &value.to_be_bytes())
    }

    fn write_f32(&self, address: u64, value: f32) -> Result<()> {
        self.write_bytes(address, &value.to_be_bytes())
    }
}

/// Walk `region` in [`scan::SEARCH_CHUNK`] windows that overlap by
/// `needle_len - 1` bytes, so a match straddling two windows is still seen.
/// Unreadable windows are skipped; attachment-level errors abort.
fn scan_windows<R, F>(
    reader: &R,
    region: &MemoryRegion,
    needle_len: usize,
    cancel: &ShutdownSignal,
    mut find: F,
) -> Result<Option<u64>>
where
    R: ReadMemory + ?Sized,
    F: FnMut(&[u8]) -> Option<usize>,
{
    if needle_len == 0 {
        return Err(Error::InvalidPattern("pattern is empty".to_string()));
    }
    let needle_len = needle_len as u64;
    if region.size < needle_len {
        return Ok(None);
    }

    let overlap = needle_len - 1;
    let mut offset = 0u64;
    while offset + needle_len <= region.size {
        if cancel.is_shutdown() {
            return Err(Error::Cancelled);
        }

        let len = (scan::SEARCH_CHUNK + overlap).min(region.size - offset);
        let address = region.base + offset;
        match reader.read_bytes(address, len as usize) {
            Ok(window) => {
                if let Some(pos) = find(&window) {
                    return Ok(Some(address + pos as u64));
                }
            }
            Err(e) if e.is_terminal() => return Err(e),
            Err(e) => debug!("Skipping unreadable window at 0x{:X}: {}", address, e),
        }

        offset += scan::SEARCH_CHUNK;
    }

    Ok(None)
}

fn find_signature(haystack: &[u8], signature: &[Option<u8>]) -> Option<usize> {
    haystack.windows(signature.len()).position(|window| {
        window
            .iter()
            .zip(signature)
            .all(|(byte, expected)| expected.is_none_or(|e| e == *byte))
    })
}

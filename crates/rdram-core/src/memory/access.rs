//! The shared attachment to one emulator process.
//!
//! `ProcessMemory` owns the OS handle exclusively. Facades and injectors share
//! it behind an `Arc`; a disconnect by any of them detaches it for all.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::memory::{MemoryBackend, ProcessHandle, ReadMemory, Regions, WriteMemory};

pub struct ProcessMemory {
    backend: RwLock<Option<Box<dyn MemoryBackend>>>,
    /// Bumped on every attach, under the backend write lock
    generation: AtomicU64,
    status: Mutex<String>,
}

impl ProcessMemory {
    pub fn new() -> Self {
        Self {
            backend: RwLock::new(None),
            generation: AtomicU64::new(0),
            status: Mutex::new("Not connected".to_string()),
        }
    }

    /// Attach to `pid`.
    ///
    /// A refused privilege surfaces as [`Error::PermissionDenied`]; callers
    /// must report it rather than retry. Any previous attachment is released
    /// first, and on failure the instance stays disconnected.
    pub fn connect(&self, pid: u32) -> Result<()> {
        self.disconnect();
        match ProcessHandle::open(pid) {
            Ok(handle) => {
                self.connect_backend(Box::new(handle));
                Ok(())
            }
            Err(e) => {
                warn!("Failed to attach to process {}: {}", pid, e);
                self.set_status(e.status_message());
                Err(e)
            }
        }
    }

    /// Attach an already-open backend.
    pub fn connect_backend(&self, backend: Box<dyn MemoryBackend>) {
        let pid = backend.pid();
        {
            let mut slot = self.backend.write().unwrap_or_else(|e| e.into_inner());
            *slot = Some(backend);
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        info!("Attached to process {}", pid);
        self.set_status(format!("Connected to process {}", pid));
    }

    /// Release the handle. Safe to call when not connected.
    pub fn disconnect(&self) {
        let previous = self
            .backend
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(backend) = previous {
            info!("Detached from process {}", backend.pid());
            self.set_status("Disconnected".to_string());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.guard().is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.guard().as_ref().map(|backend| backend.pid())
    }

    /// Identifies the current attachment. Reattaching, even to the same
    /// pid, yields a new value.
    pub fn attachment(&self) -> Option<u64> {
        let guard = self.guard();
        guard
            .is_some()
            .then(|| self.generation.load(Ordering::SeqCst))
    }

    /// Human-readable description of the attachment state.
    pub fn status(&self) -> String {
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_status(&self, status: String) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }

    fn guard(&self) -> RwLockReadGuard<'_, Option<Box<dyn MemoryBackend>>> {
        self.backend.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `op` against the attached backend. A failure from a process that
    /// has since exited tears the attachment down and becomes
    /// [`Error::ProcessUnavailable`].
    fn with_backend<T>(&self, op: impl FnOnce(&dyn MemoryBackend) -> Result<T>) -> Result<T> {
        let exited = {
            let guard = self.guard();
            let backend = guard.as_deref().ok_or(Error::NotConnected)?;
            match op(backend) {
                Ok(value) => return Ok(value),
                Err(e) if backend.is_alive() => return Err(e),
                Err(_) => backend.pid(),
            }
        };

        warn!("Process {} exited, detaching", exited);
        self.disconnect();
        self.set_status(format!("Process {} exited", exited));
        Err(Error::ProcessUnavailable(format!(
            "process {} exited",
            exited
        )))
    }
}

impl Default for ProcessMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadMemory for ProcessMemory {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        if size == 0 {
            // Still refuse on a stale handle.
            return self.with_backend(|_| Ok(Vec::new()));
        }

        self.with_backend(|backend| {
            let mut buffer = vec![0u8; size];
            let read = backend
                .read_into(address, &mut buffer)
                .map_err(|e| Error::ReadFailed {
                    address,
                    size,
                    message: e.to_string(),
                })?;
            if read != size {
                return Err(Error::ReadFailed {
                    address,
                    size,
                    message: format!("short read ({} of {} bytes)", read, size),
                });
            }
            Ok(buffer)
        })
    }

    fn regions(&self) -> Result<Regions> {
        let walk = self.with_backend(|backend| Ok(backend.regions()?))?;
        Ok(Box::new(walk.filter_map(|entry| match entry {
            Ok(region) => Some(region),
            Err(e) => {
                debug!("Skipping undescribable region: {}", e);
                None
            }
        })))
    }
}

impl WriteMemory for ProcessMemory {
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return self.with_backend(|_| Ok(()));
        }

        // Capture the original bytes so a failed write can be undone. If the
        // range is not fully readable nothing is written at all.
        let original = self.read_bytes(address, data.len())?;

        self.with_backend(|backend| {
            let failure = match backend.write_from(address, data) {
                Ok(written) if written == data.len() => return Ok(()),
                Ok(written) => format!("short write ({} of {} bytes)", written, data.len()),
                Err(e) => e.to_string(),
            };

            if let Err(e) = backend.write_from(address, &original) {
                warn!(
                    "Failed to restore {} bytes at 0x{:X} after a failed write: {}",
                    original.len(),
                    address,
                    e
                );
            }
            Err(Error::WriteFailed {
                address,
                size: data.len(),
                message: failure,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mock::MockMemoryBuilder;
    use crate::memory::{MemoryRegion, Protection};
    use crate::shutdown::ShutdownSignal;
    use std::sync::Arc;

    fn connected(builder: MockMemoryBuilder) -> ProcessMemory {
        let memory = ProcessMemory::new();
        memory.connect_backend(Box::new(builder.build()));
        memory
    }

    #[test]
    fn test_write_read_round_trip_big_endian() {
        let memory = connected(MockMemoryBuilder::new().writable(0x1000, 0x100));

        memory.write_u32(0x1010, 0xDEADBEEF).unwrap();
        assert_eq!(memory.read_u32(0x1010).unwrap(), 0xDEADBEEF);
        assert_eq!(
            memory.read_bytes(0x1010, 4).unwrap(),
            vec![0xDE, 0xAD, 0xBE, 0xEF]
        );

        memory.write_u16(0x1020, 0x1234).unwrap();
        assert_eq!(memory.read_u16(0x1020).unwrap(), 0x1234);
        assert_eq!(memory.read_u8(0x1020).unwrap(), 0x12);

        memory.write_f32(0x1030, -1.5).unwrap();
        assert_eq!(memory.read_f32(0x1030).unwrap(), -1.5);
    }

    #[test]
    fn test_attachment_changes_on_reattach() {
        let memory = ProcessMemory::new();
        assert_eq!(memory.attachment(), None);

        memory.connect_backend(Box::new(MockMemoryBuilder::new().build()));
        let first = memory.attachment().unwrap();
        memory.disconnect();
        assert_eq!(memory.attachment(), None);

        memory.connect_backend(Box::new(MockMemoryBuilder::new().build()));
        assert_eq!(memory.pid(), Some(4242));
        assert_ne!(memory.attachment().unwrap(), first);
    }

    #[test]
    fn test_round_trip_many_values() {
        let memory = connected(MockMemoryBuilder::new().writable(0x4000, 0x40));
        for (i, value) in [0u32, 1, 0x7FFF_FFFF, 0x8000_0000, u32::MAX, 0x0102_0304]
            .into_iter()
            .enumerate()
        {
            let address = 0x4000 + (i as u64) * 4;
            memory.write_u32(address, value).unwrap();
            assert_eq!(memory.read_u32(address).unwrap(), value);
        }
    }

    #[test]
    fn test_read_bytes_is_exact_or_error() {
        let memory = connected(MockMemoryBuilder::new().writable(0x1000, 0x100));

        for size in [1usize, 4, 0x80, 0x100] {
            assert_eq!(memory.read_bytes(0x1000, size).unwrap().len(), size);
        }
        // Runs off the end of the mapping: the mock copies what it can.
        assert!(matches!(
            memory.read_bytes(0x10F0, 0x20),
            Err(Error::ReadFailed { .. })
        ));
        assert!(memory.read_bytes(0x9000, 4).is_err());
    }

    #[test]
    fn test_decoders_fail_instead_of_returning_zero() {
        let memory = connected(MockMemoryBuilder::new().writable(0x1000, 0x10));
        assert!(memory.read_u32(0x2000).is_err());
        assert!(memory.read_f32(0x2000).is_err());
        assert_eq!(memory.read_u32(0x1000).unwrap(), 0);
    }

    #[test]
    fn test_disconnect_then_access_fails() {
        let memory = connected(MockMemoryBuilder::new().writable(0x1000, 0x100));
        assert!(memory.is_connected());

        memory.disconnect();
        assert!(!memory.is_connected());
        assert!(matches!(memory.read_u32(0x1000), Err(Error::NotConnected)));
        assert!(matches!(
            memory.write_u32(0x1000, 1),
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            memory.read_bytes(0x1000, 0),
            Err(Error::NotConnected)
        ));
        assert!(memory.regions().is_err());

        // Idempotent
        memory.disconnect();
        assert!(!memory.is_connected());
    }

    #[test]
    fn test_connect_nonexistent_process() {
        let memory = ProcessMemory::new();
        let result = memory.connect(0x7FFF_FFF0);
        assert!(result.is_err());
        assert!(!memory.is_connected());
        assert!(!memory.status().is_empty());
    }

    #[test]
    fn test_failed_write_is_not_partially_applied() {
        let memory = connected(
            MockMemoryBuilder::new()
                .writable(0x1000, 0x10)
                .tear_write_after(1),
        );
        memory.write_u32(0x1000, 0x11223344).unwrap();

        let err = memory.write_u32(0x1000, 0xAABBCCDD).unwrap_err();
        assert!(matches!(err, Error::WriteFailed { .. }));
        assert_eq!(memory.read_u32(0x1000).unwrap(), 0x11223344);
    }

    #[test]
    fn test_write_to_read_only_region_leaves_memory_untouched() {
        let memory = connected(
            MockMemoryBuilder::new()
                .region(0x1000, 0x10, Protection::READ_ONLY)
                .fill(0x1000, &[1, 2, 3, 4]),
        );
        assert!(memory.write_u32(0x1000, 0).is_err());
        assert_eq!(memory.read_bytes(0x1000, 4).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_write_spanning_unmapped_range_writes_nothing() {
        let memory = connected(MockMemoryBuilder::new().writable(0x1000, 0x10));
        assert!(memory.write_u32(0x100E, 0xFFFFFFFF).is_err());
        assert_eq!(memory.read_u16(0x100E).unwrap(), 0);
    }

    #[test]
    fn test_regions_skip_undescribable_entries() {
        let memory = connected(
            MockMemoryBuilder::new()
                .writable(0x1000, 0x100)
                .undescribable()
                .writable(0x8000, 0x100),
        );
        let regions: Vec<MemoryRegion> = memory.regions().unwrap().collect();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].base, 0x1000);
        assert_eq!(regions[1].base, 0x8000);

        // Restartable
        assert_eq!(memory.regions().unwrap().count(), 2);
    }

    #[test]
    fn test_exited_process_tears_down_attachment() {
        let mock = MockMemoryBuilder::new().writable(0x1000, 0x100).build();
        let liveness = mock.liveness();
        let memory = ProcessMemory::new();
        memory.connect_backend(Box::new(mock));

        liveness.kill();
        assert!(matches!(
            memory.read_u32(0x9999_0000),
            Err(Error::ProcessUnavailable(_))
        ));
        assert!(!memory.is_connected());
        assert!(memory.status().contains("exited"));
    }

    #[test]
    fn test_search_pattern_across_chunk_boundary() {
        let pattern = [0xCA, 0xFE, 0xBA, 0xBE];
        let memory = connected(
            MockMemoryBuilder::new()
                .writable(0x10000, 0x3000)
                .fill(0x10000 + 0x1000 - 2, &pattern),
        );
        let region = MemoryRegion::new(0x10000, 0x3000, Protection::READ_WRITE);
        assert_eq!(
            memory.search_pattern(&region, &pattern).unwrap(),
            Some(0x10000 + 0x1000 - 2)
        );
    }

    #[test]
    fn test_search_pattern_returns_first_match() {
        let memory = connected(
            MockMemoryBuilder::new()
                .writable(0x10000, 0x3000)
                .fill(0x12500, &[0xAA, 0xBB])
                .fill(0x10800, &[0xAA, 0xBB]),
        );
        let region = MemoryRegion::new(0x10000, 0x3000, Protection::READ_WRITE);
        assert_eq!(
            memory.search_pattern(&region, &[0xAA, 0xBB]).unwrap(),
            Some(0x10800)
        );
        assert_eq!(memory.search_pattern(&region, &[0xAB, 0xCD]).unwrap(), None);
        assert!(memory.search_pattern(&region, &[]).is_err());
    }

    #[test]
    fn test_search_pattern_cancelled() {
        let memory = connected(MockMemoryBuilder::new().writable(0x10000, 0x3000));
        let region = MemoryRegion::new(0x10000, 0x3000, Protection::READ_WRITE);
        let cancel = ShutdownSignal::new();
        cancel.trigger();
        assert!(matches!(
            memory.search_pattern_until(&region, &[1, 2], &cancel),
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn test_search_signature_with_wildcards() {
        let memory = connected(
            MockMemoryBuilder::new()
                .writable(0x10000, 0x2000)
                .fill(0x11234, &[0x3C, 0x1A, 0x80, 0x32]),
        );
        let region = MemoryRegion::new(0x10000, 0x2000, Protection::READ_WRITE);
        let found = memory
            .search_signature(
                &region,
                &[Some(0x3C), Some(0x1A), None, Some(0x32)],
                &ShutdownSignal::new(),
            )
            .unwrap();
        assert_eq!(found, Some(0x11234));
    }

    #[test]
    fn test_concurrent_reads_and_writes_never_error() {
        let memory = Arc::new(connected(MockMemoryBuilder::new().writable(0x1000, 0x100)));
        let writer = {
            let memory = Arc::clone(&memory);
            std::thread::spawn(move || {
                for i in 0..500u32 {
                    memory.write_u32(0x1000, i).unwrap();
                }
            })
        };

        for _ in 0..500 {
            // Any value is acceptable; the read itself must succeed.
            let value = memory.read_u32(0x1000).unwrap();
            assert!(value < 500);
        }
        writer.join().unwrap();
    }
}

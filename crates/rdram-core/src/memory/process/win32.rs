use std::ffi::c_void;
use std::io;
use std::mem::size_of;
use std::sync::Arc;

use tracing::debug;
use windows::Win32::Foundation::{CloseHandle, ERROR_ACCESS_DENIED, FALSE, HANDLE};
use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
    TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Memory::{
    MEM_COMMIT, MEMORY_BASIC_INFORMATION, PAGE_EXECUTE, PAGE_EXECUTE_READ,
    PAGE_EXECUTE_READWRITE, PAGE_EXECUTE_WRITECOPY, PAGE_GUARD, PAGE_READONLY, PAGE_READWRITE,
    PAGE_WRITECOPY, VirtualQueryEx,
};
use windows::Win32::System::Threading::{
    GetExitCodeProcess, OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION,
    PROCESS_VM_READ, PROCESS_VM_WRITE,
};

use super::name_matches;
use crate::error::{Error, Result};
use crate::memory::{MemoryBackend, MemoryRegion, Protection, RegionWalk};

/// Exit code reported for a process that is still running
const STILL_ACTIVE: u32 = 259;

struct OwnedHandle(HANDLE);

// SAFETY: Win32 process and snapshot handles are usable from any thread.
unsafe impl Send for OwnedHandle {}
unsafe impl Sync for OwnedHandle {}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        // SAFETY: the handle was returned by the OS and is closed exactly once.
        let _ = unsafe { CloseHandle(self.0) };
    }
}

pub struct ProcessHandle {
    pid: u32,
    handle: Arc<OwnedHandle>,
}

impl ProcessHandle {
    pub fn open(pid: u32) -> Result<Self> {
        // SAFETY: OpenProcess has no memory-safety preconditions.
        let handle = unsafe {
            OpenProcess(
                PROCESS_QUERY_INFORMATION | PROCESS_VM_OPERATION | PROCESS_VM_READ | PROCESS_VM_WRITE,
                FALSE,
                pid,
            )
        }
        .map_err(|e| {
            if e.code() == ERROR_ACCESS_DENIED.to_hresult() {
                Error::PermissionDenied {
                    pid,
                    message: e.message(),
                }
            } else {
                Error::ProcessUnavailable(format!("cannot open process {}: {}", pid, e.message()))
            }
        })?;

        debug!("Opened process {}", pid);
        Ok(Self {
            pid,
            handle: Arc::new(OwnedHandle(handle)),
        })
    }
}

impl MemoryBackend for ProcessHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn read_into(&self, address: u64, buffer: &mut [u8]) -> io::Result<usize> {
        let mut read = 0usize;
        // SAFETY: the buffer pointer and length describe a live mutable slice.
        let result = unsafe {
            ReadProcessMemory(
                self.handle.0,
                address as *const c_void,
                buffer.as_mut_ptr().cast(),
                buffer.len(),
                Some(&mut read),
            )
        };
        match result {
            Ok(()) => Ok(read),
            // ERROR_PARTIAL_COPY still reports how much arrived.
            Err(_) if read > 0 => Ok(read),
            Err(e) => Err(io::Error::other(e.message())),
        }
    }

    fn write_from(&self, address: u64, data: &[u8]) -> io::Result<usize> {
        let mut written = 0usize;
        // SAFETY: the data pointer and length describe a live slice.
        let result = unsafe {
            WriteProcessMemory(
                self.handle.0,
                address as *const c_void,
                data.as_ptr().cast(),
                data.len(),
                Some(&mut written),
            )
        };
        match result {
            Ok(()) => Ok(written),
            Err(_) if written > 0 => Ok(written),
            Err(e) => Err(io::Error::other(e.message())),
        }
    }

    fn regions(&self) -> io::Result<RegionWalk> {
        Ok(Box::new(RegionWalker {
            handle: Arc::clone(&self.handle),
            next: 0,
            done: false,
        }))
    }

    fn is_alive(&self) -> bool {
        let mut code = 0u32;
        // SAFETY: `code` outlives the call.
        unsafe { GetExitCodeProcess(self.handle.0, &mut code) }.is_ok() && code == STILL_ACTIVE
    }
}

/// Lazy `VirtualQueryEx` walk over committed memory.
struct RegionWalker {
    handle: Arc<OwnedHandle>,
    next: u64,
    done: bool,
}

impl Iterator for RegionWalker {
    type Item = io::Result<MemoryRegion>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let mut info = MEMORY_BASIC_INFORMATION::default();
            // SAFETY: `info` is a properly sized out-parameter.
            let filled = unsafe {
                VirtualQueryEx(
                    self.handle.0,
                    Some(self.next as *const c_void),
                    &mut info,
                    size_of::<MEMORY_BASIC_INFORMATION>(),
                )
            };
            if filled == 0 {
                // End of the user address space.
                self.done = true;
                return None;
            }

            let base = info.BaseAddress as u64;
            let size = info.RegionSize as u64;
            match base.checked_add(size) {
                Some(end) if size > 0 && end > self.next => self.next = end,
                _ => self.done = true,
            }

            if info.State != MEM_COMMIT {
                continue;
            }
            return Some(Ok(MemoryRegion::new(
                base,
                size,
                protection_of(info.Protect.0),
            )));
        }
        None
    }
}

fn protection_of(protect: u32) -> Protection {
    if protect & PAGE_GUARD.0 != 0 {
        return Protection::default();
    }
    let base = protect & 0xFF;
    let is = |flags: &[u32]| flags.contains(&base);
    Protection {
        read: is(&[
            PAGE_READONLY.0,
            PAGE_READWRITE.0,
            PAGE_WRITECOPY.0,
            PAGE_EXECUTE_READ.0,
            PAGE_EXECUTE_READWRITE.0,
            PAGE_EXECUTE_WRITECOPY.0,
        ]),
        write: is(&[
            PAGE_READWRITE.0,
            PAGE_WRITECOPY.0,
            PAGE_EXECUTE_READWRITE.0,
            PAGE_EXECUTE_WRITECOPY.0,
        ]),
        execute: is(&[
            PAGE_EXECUTE.0,
            PAGE_EXECUTE_READ.0,
            PAGE_EXECUTE_READWRITE.0,
            PAGE_EXECUTE_WRITECOPY.0,
        ]),
    }
}

/// Find the first process whose executable name contains `name` (case-insensitive).
pub fn find_process_id(name: &str) -> Result<u32> {
    // SAFETY: CreateToolhelp32Snapshot has no memory-safety preconditions.
    let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
        .map(OwnedHandle)
        .map_err(|e| Error::ProcessUnavailable(e.message()))?;

    let mut entry = PROCESSENTRY32W {
        dwSize: size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };
    // SAFETY: `entry.dwSize` is initialized as the API requires.
    let mut found = unsafe { Process32FirstW(snapshot.0, &mut entry) }.is_ok();
    while found {
        let len = entry
            .szExeFile
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(entry.szExeFile.len());
        let exe = String::from_utf16_lossy(&entry.szExeFile[..len]);
        if name_matches(&exe, name) {
            return Ok(entry.th32ProcessID);
        }
        // SAFETY: as above.
        found = unsafe { Process32NextW(snapshot.0, &mut entry) }.is_ok();
    }

    Err(Error::ProcessUnavailable(format!(
        "no process matching '{}'",
        name
    )))
}

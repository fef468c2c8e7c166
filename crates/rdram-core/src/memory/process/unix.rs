use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::fs::FileExt;

#[cfg(not(target_os = "linux"))]
use process_memory::{CopyAddress, PutAddress, TryIntoProcessHandle};
use sysinfo::System;
use tracing::debug;

use super::name_matches;
use crate::error::{Error, Result};
use crate::memory::{MemoryBackend, MemoryRegion, RegionWalk};

pub struct ProcessHandle {
    pid: u32,
    /// `/proc/<pid>/mem`, opened for reading and writing
    #[cfg(target_os = "linux")]
    mem: File,
    #[cfg(not(target_os = "linux"))]
    handle: process_memory::ProcessHandle,
}

impl ProcessHandle {
    /// Open `pid` for reading and writing.
    ///
    /// On Linux, opening `/proc/<pid>/mem` needs the same ptrace access the
    /// transfers do, so a refused privilege shows up here.
    #[cfg(target_os = "linux")]
    pub fn open(pid: u32) -> Result<Self> {
        if !proc_path(pid, "").exists() {
            return Err(Error::ProcessUnavailable(format!(
                "no process with pid {}",
                pid
            )));
        }

        let mem = OpenOptions::new()
            .read(true)
            .write(true)
            .open(proc_path(pid, "mem"))
            .map_err(|e| classify(pid, e))?;

        debug!("Opened process {}", pid);
        Ok(Self { pid, mem })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn open(pid: u32) -> Result<Self> {
        let handle = (pid as process_memory::Pid)
            .try_into_process_handle()
            .map_err(|e| classify(pid, e))?;

        debug!("Opened process {}", pid);
        Ok(Self { pid, handle })
    }
}

fn proc_path(pid: u32, entry: &str) -> PathBuf {
    PathBuf::from(format!("/proc/{}", pid)).join(entry)
}

fn classify(pid: u32, e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::PermissionDenied => Error::PermissionDenied {
            pid,
            message: e.to_string(),
        },
        io::ErrorKind::NotFound => {
            Error::ProcessUnavailable(format!("no process with pid {}", pid))
        }
        _ => Error::ProcessUnavailable(format!("cannot open process {}: {}", pid, e)),
    }
}

/// Repeat a positioned transfer until `len` bytes moved or the target stops
/// accepting them. Returns the count that actually moved.
#[cfg(target_os = "linux")]
fn transfer(len: usize, mut step: impl FnMut(usize) -> io::Result<usize>) -> io::Result<usize> {
    let mut done = 0;
    while done < len {
        match step(done) {
            Ok(0) => break,
            Ok(n) => done += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            // Faulted partway: report what arrived.
            Err(_) if done > 0 => break,
            Err(e) => return Err(e),
        }
    }
    Ok(done)
}

impl MemoryBackend for ProcessHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    #[cfg(target_os = "linux")]
    fn read_into(&self, address: u64, buffer: &mut [u8]) -> io::Result<usize> {
        let len = buffer.len();
        transfer(len, |done| {
            self.mem.read_at(&mut buffer[done..], address + done as u64)
        })
    }

    #[cfg(target_os = "linux")]
    fn write_from(&self, address: u64, data: &[u8]) -> io::Result<usize> {
        transfer(data.len(), |done| {
            self.mem.write_at(&data[done..], address + done as u64)
        })
    }

    // The Mach transfers behind `process-memory` fail as a whole, so success
    // means every byte moved.
    #[cfg(not(target_os = "linux"))]
    fn read_into(&self, address: u64, buffer: &mut [u8]) -> io::Result<usize> {
        self.handle.copy_address(address as usize, buffer)?;
        Ok(buffer.len())
    }

    #[cfg(not(target_os = "linux"))]
    fn write_from(&self, address: u64, data: &[u8]) -> io::Result<usize> {
        self.handle.put_address(address as usize, data)?;
        Ok(data.len())
    }

    fn regions(&self) -> io::Result<RegionWalk> {
        if !cfg!(target_os = "linux") {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "region enumeration is only implemented for Linux and Windows",
            ));
        }

        let maps = BufReader::new(File::open(proc_path(self.pid, "maps"))?);
        Ok(Box::new(maps.lines().map(|line| {
            let line = line?;
            MemoryRegion::from_maps_line(&line).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unparseable map entry: {}", line),
                )
            })
        })))
    }

    fn is_alive(&self) -> bool {
        if cfg!(target_os = "linux") {
            proc_path(self.pid, "").exists()
        } else {
            true
        }
    }
}

/// Find the lowest pid whose executable name contains `name` (case-insensitive).
pub fn find_process_id(name: &str) -> Result<u32> {
    let mut system = System::new();
    system.refresh_processes();

    system
        .processes()
        .values()
        .filter(|process| name_matches(process.name(), name))
        .map(|process| process.pid().as_u32())
        .min()
        .ok_or_else(|| Error::ProcessUnavailable(format!("no process matching '{}'", name)))
}

//! OS attachment to the emulator process.
//!
//! `ProcessHandle` is the platform capability behind
//! [`ProcessMemory`](crate::memory::ProcessMemory): Win32 process handles on
//! Windows, `/proc/<pid>/mem` plus `/proc/<pid>/maps` on Linux, and
//! `process-memory` on other unix targets.

#[cfg(not(target_os = "windows"))]
mod unix;
#[cfg(target_os = "windows")]
mod win32;

#[cfg(not(target_os = "windows"))]
pub use unix::{ProcessHandle, find_process_id};
#[cfg(target_os = "windows")]
pub use win32::{ProcessHandle, find_process_id};

/// Case-insensitive substring match of an executable name.
fn name_matches(candidate: &str, wanted: &str) -> bool {
    candidate
        .to_ascii_lowercase()
        .contains(&wanted.to_ascii_lowercase())
}

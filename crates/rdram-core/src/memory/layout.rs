//! Memory layout constants for the emulated console and the host-side scans
//!
//! This module centralizes every size, mask and timing constant used when
//! reading the emulator process. Constants are organized by concern.

/// Console RAM (RDRAM) geometry
pub mod rdram {
    /// Stock console RAM size (4 MiB)
    pub const BASE_SIZE: u64 = 0x40_0000;

    /// RAM size with the Expansion Pak installed (8 MiB)
    pub const EXPANDED_SIZE: u64 = 0x80_0000;

    /// Host allocators round the RAM buffer up; accept this much extra
    pub const SIZE_SLACK: u64 = 0x10_0000;

    /// Strips the KSEG0/KSEG1 segment bits from a console virtual address
    pub const PHYSICAL_MASK: u32 = 0x1FFF_FFFF;

    /// `lui k0, 0x8000`: first word of the exception-vector stub libultra
    /// copies to the base of RAM during boot
    pub const BOOT_SIGNATURE: [u8; 4] = [0x3C, 0x1A, 0x80, 0x00];
}

/// Region scanning parameters
pub mod scan {
    /// Window size for chunked pattern search (4 KiB)
    pub const SEARCH_CHUNK: u64 = 0x1000;

    /// Prefix length read when probing a candidate region for non-zero content
    pub const PROBE_LEN: usize = 0x1000;
}

/// Controller state layout inside the emulator process
pub mod controller {
    /// Number of logical players the emulator exposes
    pub const MAX_PLAYERS: usize = 4;

    /// Size of one encoded `BUTTONS` word
    pub const STATE_SIZE: usize = 4;

    /// Default distance between consecutive player slots
    pub const DEFAULT_STRIDE: u64 = 4;

    /// Full analog deflection
    pub const AXIS_MAX: i8 = 127;
}

/// Timing constants for polling and input animation
pub mod timing {
    /// Interval between RAM discovery attempts while waiting for a game (ms)
    pub const DISCOVERY_POLL_INTERVAL_MS: u64 = 1000;

    /// Interval between snapshots in watch mode (ms)
    pub const SNAPSHOT_POLL_INTERVAL_MS: u64 = 100;

    /// Default number of steps for smoothed stick motion
    pub const STICK_SMOOTHING_STEPS: u32 = 8;

    /// How long a tap holds its button (ms)
    pub const TAP_DURATION_MS: u64 = 50;
}

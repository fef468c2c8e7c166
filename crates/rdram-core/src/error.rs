use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Permission denied attaching to process {pid}: {message}")]
    PermissionDenied { pid: u32, message: String },

    #[error("Process unavailable: {0}")]
    ProcessUnavailable(String),

    #[error("Not connected to a process")]
    NotConnected,

    #[error("Failed to read {size} bytes at {address:#x}: {message}")]
    ReadFailed {
        address: u64,
        size: usize,
        message: String,
    },

    #[error("Failed to write {size} bytes at {address:#x}: {message}")]
    WriteFailed {
        address: u64,
        size: usize,
        message: String,
    },

    #[error("Console RAM not located: {0}")]
    RegionNotFound(String),

    #[error("Console address {address:#010x} is outside the located RAM ({ram_size:#x} bytes)")]
    AddressOutOfRange { address: u32, ram_size: u64 },

    #[error("Invalid player index {0} (expected 0-3)")]
    InvalidPlayerIndex(usize),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Attachment-level failures end the session and must not be retried automatically.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::PermissionDenied { .. } | Error::ProcessUnavailable(_) | Error::NotConnected
        )
    }

    /// Per-address failures that callers treat as "field unsupported".
    pub fn is_field_level(&self) -> bool {
        matches!(
            self,
            Error::ReadFailed { .. } | Error::WriteFailed { .. } | Error::AddressOutOfRange { .. }
        )
    }

    /// Human-readable status line without OS error codes.
    pub fn status_message(&self) -> String {
        match self {
            Error::PermissionDenied { pid, .. } => format!(
                "Permission denied for process {}. Grant debug access (run elevated, or relax ptrace scope) and reconnect.",
                pid
            ),
            Error::ProcessUnavailable(_) => "Emulator process is not running".to_string(),
            Error::NotConnected => "Not connected".to_string(),
            Error::RegionNotFound(_) => {
                "Console RAM not found. Is a game running in this emulator?".to_string()
            }
            Error::Cancelled => "Cancelled".to_string(),
            other => other.to_string(),
        }
    }

    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.is_not_found());

        let other_io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err2 = Error::Io(other_io_err);
        assert!(!err2.is_not_found());
    }

    #[test]
    fn test_terminal_classification() {
        assert!(
            Error::PermissionDenied {
                pid: 1,
                message: "EPERM".to_string()
            }
            .is_terminal()
        );
        assert!(Error::ProcessUnavailable("gone".to_string()).is_terminal());
        assert!(!Error::RegionNotFound("none".to_string()).is_terminal());
        assert!(
            !Error::ReadFailed {
                address: 0,
                size: 4,
                message: String::new()
            }
            .is_terminal()
        );
        assert!(
            Error::AddressOutOfRange {
                address: 0x8080_0000,
                ram_size: 0x40_0000
            }
            .is_field_level()
        );
        assert!(!Error::NotConnected.is_field_level());
    }

    #[test]
    fn test_status_message_hides_os_details() {
        let err = Error::PermissionDenied {
            pid: 42,
            message: "os error 1".to_string(),
        };
        let status = err.status_message();
        assert!(status.contains("42"));
        assert!(!status.contains("os error"));
    }
}

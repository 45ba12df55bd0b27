//! Error type shared by the logger and its storage backends

use crate::storage::{DeviceFault, FileName};
use std::io;
use thiserror::Error;

/// Errors returned by the logger and its storage backends
#[derive(Error, Debug)]
pub enum LogError {
    /// The log file could not be opened or created
    #[error("Failed to open file {name}")]
    Open {
        /// File that was being opened
        name: FileName,
        /// Device error state at the time of failure
        fault: Option<DeviceFault>,
        /// Error reported by the device
        #[source]
        source: io::Error,
    },

    /// The log file could not be closed
    #[error("Failed to close file {name}")]
    Close {
        /// File that was being closed
        name: FileName,
        /// Device error state at the time of failure
        fault: Option<DeviceFault>,
        /// Error reported by the device
        #[source]
        source: io::Error,
    },

    /// Fewer bytes reached the file than were buffered
    #[error("Failed to write {which} buffer to log file: wrote {written} of {expected} bytes")]
    ShortWrite {
        /// Buffer being drained ("primary", "ready" or "stream")
        which: &'static str,
        /// Bytes accepted by the storage
        written: usize,
        /// Bytes that were buffered
        expected: usize,
        /// Device error state at the time of failure
        fault: Option<DeviceFault>,
        /// Writer error, if the short count came from one
        #[source]
        source: Option<io::Error>,
    },

    /// The storage flush after a write failed
    #[error("Failed to sync log file")]
    Sync {
        /// Device error state at the time of failure
        fault: Option<DeviceFault>,
        /// Error reported by the device
        #[source]
        source: io::Error,
    },

    /// An earlier write or sync failed; the file takes no more writes
    #[error("Log file refuses writes after an earlier {failed} failure")]
    Latched {
        /// Step that failed: "write" or "sync"
        failed: &'static str,
    },

    /// The log file could not be cut to length on open
    #[error("Failed to truncate file {name}")]
    Truncate {
        /// File that was being truncated
        name: FileName,
        /// Error reported by the device
        #[source]
        source: io::Error,
    },

    /// The open log file could not be renamed
    #[error("Failed to rename log file to {name}")]
    Rename {
        /// Requested new name
        name: FileName,
        /// Error reported by the device
        #[source]
        source: io::Error,
    },

    /// A file operation was requested in buffer-only mode
    #[error("No storage device attached")]
    NotAttached,

    /// A file operation was requested with no open log file
    #[error("No log file open")]
    NotOpen,

    /// A file name does not fit the 8.3 convention
    #[error("Invalid file name {name:?}: expected 1-12 ASCII characters (8.3)")]
    InvalidFileName {
        /// The rejected name
        name: String,
    },
}

impl LogError {
    /// Returns true if durability of the log can no longer be guaranteed
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LogError::Open { .. }
                | LogError::Close { .. }
                | LogError::ShortWrite { .. }
                | LogError::Sync { .. }
                | LogError::Latched { .. }
        )
    }

    /// Device error state captured when the error occurred
    pub fn device_fault(&self) -> Option<&DeviceFault> {
        match self {
            LogError::Open { fault, .. }
            | LogError::Close { fault, .. }
            | LogError::ShortWrite { fault, .. }
            | LogError::Sync { fault, .. } => fault.as_ref(),
            _ => None,
        }
    }

    /// Operator hint for faults that need manual intervention
    pub fn remediation(&self) -> Option<&'static str> {
        self.device_fault()
            .filter(|fault| fault.power_cycle)
            .map(|_| "Try power cycling the SD card.")
    }
}

/// Result alias for logger operations
pub type Result<T> = std::result::Result<T, LogError>;

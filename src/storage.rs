use crate::error::{LogError, Result};
use std::fmt;
use std::io;

/// log2 of the device sector size (512 bytes)
pub const SECTOR_SHIFT: u32 = 9;

/// Longest 8.3 file name: 8 + '.' + 3
pub const FILE_NAME_MAX: usize = 12;

/// Short (8.3 style) file name stored inline
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileName {
    bytes: [u8; FILE_NAME_MAX],
    len: u8,
}

impl FileName {
    /// Validate and copy a file name
    ///
    /// # Returns
    /// * `Err(LogError::InvalidFileName)` if the name is empty, longer than
    ///   `FILE_NAME_MAX`, non-ASCII, or contains NUL or a path separator
    pub fn new(name: &str) -> Result<Self> {
        let raw = name.as_bytes();
        let valid = !raw.is_empty()
            && raw.len() <= FILE_NAME_MAX
            && raw
                .iter()
                .all(|&b| b.is_ascii_graphic() && b != b'/' && b != b'\\');
        if !valid {
            return Err(LogError::InvalidFileName {
                name: name.to_string(),
            });
        }

        let mut bytes = [0u8; FILE_NAME_MAX];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    /// The name as text
    pub fn as_str(&self) -> &str {
        // Only ASCII is accepted by `new`
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl Default for FileName {
    fn default() -> Self {
        let mut bytes = [0u8; FILE_NAME_MAX];
        bytes[..10].copy_from_slice(b"log000.txt");
        Self { bytes, len: 10 }
    }
}

impl TryFrom<&str> for FileName {
    type Error = LogError;

    fn try_from(name: &str) -> Result<Self> {
        Self::new(name)
    }
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileName({:?})", self.as_str())
    }
}

/// Low-level error state reported by a storage device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFault {
    /// Device specific error code
    pub code: u8,
    /// Extra status word accompanying `code`
    pub data: u32,
    /// Symbolic name of `code`
    pub symbol: &'static str,
    /// The device only recovers after a power cycle
    pub power_cycle: bool,
}

impl fmt::Display for DeviceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (0x{:02x}), ErrorData: 0x{:x}",
            self.symbol, self.code, self.data
        )
    }
}

/// Block device hosting the log file system
pub trait BlockDevice {
    /// Handle for a file opened on this device
    type File: StorageFile;

    /// Open `name` for writing, creating it if missing
    fn open(&mut self, name: &FileName) -> io::Result<Self::File>;

    /// Total number of 512-byte sectors
    fn sector_count(&self) -> u64;

    /// Current error state, `None` when the device reports no error
    fn fault(&self) -> Option<DeviceFault>;

    /// Total capacity in bytes
    fn capacity_bytes(&self) -> u64 {
        self.sector_count() << SECTOR_SHIFT
    }
}

/// Open file on a `BlockDevice`
///
/// Writes are linear appends at the current position.
pub trait StorageFile {
    /// Cut the file to `len` bytes and move the write position there
    fn truncate(&mut self, len: u64) -> io::Result<()>;

    /// Write from `buf`, returning how many bytes were accepted
    ///
    /// A count below `buf.len()` is a short write.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Durability barrier for everything written so far
    fn flush(&mut self) -> io::Result<()>;

    /// Rename the file while keeping it open
    fn rename(&mut self, name: &FileName) -> io::Result<()>;

    /// Current length in bytes
    fn size(&self) -> u64;

    /// Release the handle, reporting errors the drop would swallow
    fn close(self) -> io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_accepts_short_names() {
        let name = FileName::new("LOG001.TXT").unwrap();
        assert_eq!(name.as_str(), "LOG001.TXT");
        assert_eq!(name.to_string(), "LOG001.TXT");

        let longest = FileName::new("abcdefgh.txt").unwrap();
        assert_eq!(longest.as_str().len(), FILE_NAME_MAX);
    }

    #[test]
    fn test_file_name_rejects_invalid() {
        let invalid = [
            "",
            "abcdefghi.txt",
            "dir/log.txt",
            "a\\b",
            "log\0.txt",
            "log 1.txt",
            "lög.txt",
        ];
        for bad in invalid {
            let err = FileName::new(bad).unwrap_err();
            assert!(matches!(err, LogError::InvalidFileName { .. }), "{bad:?}");
        }
    }

    #[test]
    fn test_default_file_name() {
        assert_eq!(FileName::default().as_str(), "log000.txt");
    }

    #[test]
    fn test_device_fault_display() {
        let fault = DeviceFault {
            code: 0x17,
            data: 0xff,
            symbol: "SD_CARD_ERROR_ACMD41",
            power_cycle: true,
        };
        assert_eq!(
            fault.to_string(),
            "SD_CARD_ERROR_ACMD41 (0x17), ErrorData: 0xff"
        );
    }
}

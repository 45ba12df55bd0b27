use crate::storage::{BlockDevice, DeviceFault, FileName, StorageFile};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Block device backed by a host directory
///
/// Files are created directly under `root`. The sector count is declared by
/// the caller since a host file system has no fixed card size.
#[derive(Debug, Clone)]
pub struct FsDevice {
    root: PathBuf,
    sector_count: u64,
}

impl FsDevice {
    /// Create the device, creating `root` if it doesn't exist
    pub fn new(root: impl Into<PathBuf>, sector_count: u64) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, sector_count })
    }

    /// Directory the log files live in
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlockDevice for FsDevice {
    type File = FsFile;

    fn open(&mut self, name: &FileName) -> io::Result<FsFile> {
        let path = self.root.join(name.as_str());
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(FsFile { file, path })
    }

    fn sector_count(&self) -> u64 {
        self.sector_count
    }

    fn fault(&self) -> Option<DeviceFault> {
        None
    }
}

/// Log file on an [`FsDevice`], opened in append mode
#[derive(Debug)]
pub struct FsFile {
    file: File,
    path: PathBuf,
}

impl FsFile {
    /// Current location of the file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageFile for FsFile {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.file.set_len(len)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            match self.file.write(&buf[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if written > 0 => {
                    tracing::debug!(error = %e, written, "Write stopped early");
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.sync_data()
    }

    fn rename(&mut self, name: &FileName) -> io::Result<()> {
        let target = self.path.with_file_name(name.as_str());
        // Linking fails with `AlreadyExists` instead of replacing the target
        fs::hard_link(&self.path, &target)?;
        fs::remove_file(&self.path)?;
        self.path = target;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.file.metadata().map_or(0, |meta| meta.len())
    }

    fn close(self) -> io::Result<()> {
        self.file.sync_all()
    }
}

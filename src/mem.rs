//! In-memory block device
//!
//! Clones of a [`MemDevice`] share the same files, so a test can hand one
//! clone to the logger and inspect what reached "storage" through another.
//! Faults can be injected at every step the logger checks.

use crate::storage::{BlockDevice, DeviceFault, FileName, StorageFile};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;
use std::rc::Rc;

#[derive(Debug, Default)]
struct MemState {
    files: BTreeMap<String, Vec<u8>>,
    sector_count: u64,
    fault: Option<DeviceFault>,
    fail_open: bool,
    fail_close: bool,
    fail_sync: bool,
    /// Bytes still accepted before writes come up short
    write_budget: Option<usize>,
    write_calls: usize,
    sync_calls: usize,
}

/// Shared in-memory device
#[derive(Debug, Clone, Default)]
pub struct MemDevice {
    state: Rc<RefCell<MemState>>,
}

impl MemDevice {
    /// Empty device reporting `sector_count` sectors
    pub fn new(sector_count: u64) -> Self {
        let device = Self::default();
        device.state.borrow_mut().sector_count = sector_count;
        device
    }

    /// Create or replace a file
    pub fn insert(&self, name: &str, contents: &[u8]) {
        self.state
            .borrow_mut()
            .files
            .insert(name.to_string(), contents.to_vec());
    }

    /// Copy of a file's bytes, `None` if it doesn't exist
    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.state.borrow().files.get(name).cloned()
    }

    /// Number of `write` calls across all files
    pub fn write_calls(&self) -> usize {
        self.state.borrow().write_calls
    }

    /// Number of successful durability barriers
    pub fn sync_calls(&self) -> usize {
        self.state.borrow().sync_calls
    }

    /// Make later opens fail
    pub fn fail_open(&self, fail: bool) {
        self.state.borrow_mut().fail_open = fail;
    }

    /// Make later closes fail
    pub fn fail_close(&self, fail: bool) {
        self.state.borrow_mut().fail_close = fail;
    }

    /// Make later syncs fail
    pub fn fail_sync(&self, fail: bool) {
        self.state.borrow_mut().fail_sync = fail;
    }

    /// Limit the total bytes later writes accept; `None` lifts the limit
    pub fn set_write_budget(&self, budget: Option<usize>) {
        self.state.borrow_mut().write_budget = budget;
    }

    /// Error state reported through `BlockDevice::fault`
    pub fn set_fault(&self, fault: Option<DeviceFault>) {
        self.state.borrow_mut().fault = fault;
    }
}

impl BlockDevice for MemDevice {
    type File = MemFile;

    fn open(&mut self, name: &FileName) -> io::Result<MemFile> {
        let mut state = self.state.borrow_mut();
        if state.fail_open {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "open rejected by device",
            ));
        }
        let pos = state.files.entry(name.to_string()).or_default().len();
        Ok(MemFile {
            state: Rc::clone(&self.state),
            name: name.to_string(),
            pos,
        })
    }

    fn sector_count(&self) -> u64 {
        self.state.borrow().sector_count
    }

    fn fault(&self) -> Option<DeviceFault> {
        self.state.borrow().fault
    }
}

/// Open file on a [`MemDevice`]
#[derive(Debug)]
pub struct MemFile {
    state: Rc<RefCell<MemState>>,
    name: String,
    pos: usize,
}

impl StorageFile for MemFile {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        let len = len as usize;
        let mut state = self.state.borrow_mut();
        let file = state
            .files
            .get_mut(&self.name)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        file.resize(len, 0);
        self.pos = len;
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        state.write_calls += 1;

        let accepted = match state.write_budget.as_mut() {
            Some(budget) => {
                let n = buf.len().min(*budget);
                *budget -= n;
                n
            }
            None => buf.len(),
        };

        let file = state
            .files
            .get_mut(&self.name)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        let end = self.pos + accepted;
        if file.len() < end {
            file.resize(end, 0);
        }
        file[self.pos..end].copy_from_slice(&buf[..accepted]);
        self.pos = end;
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_sync {
            return Err(io::Error::other("sync rejected by device"));
        }
        state.sync_calls += 1;
        Ok(())
    }

    fn rename(&mut self, name: &FileName) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        let target = name.to_string();
        if state.files.contains_key(&target) {
            return Err(io::Error::from(io::ErrorKind::AlreadyExists));
        }
        let contents = state
            .files
            .remove(&self.name)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        state.files.insert(target.clone(), contents);
        self.name = target;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.state
            .borrow()
            .files
            .get(&self.name)
            .map_or(0, |file| file.len() as u64)
    }

    fn close(self) -> io::Result<()> {
        if self.state.borrow().fail_close {
            return Err(io::Error::other("close rejected by device"));
        }
        Ok(())
    }
}

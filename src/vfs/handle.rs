use alloc::vec::Vec;

use derive_more::{Display, From, Into};

/// Index into the system wide open file table
#[derive(Copy, Clone, Debug, Display, From, Into, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SysFd(usize);

/// Process local file descriptor
#[derive(Copy, Clone, Debug, Display, From, Into, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ProcFd(usize);

/// Both handles created by one successful open
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FileDescriptors {
    pub process: ProcFd,
    pub system: SysFd,
}

/// Slot table handing out the lowest free index
#[derive(Debug)]
pub struct HandleTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleTable<T> {
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn insert(&mut self, value: T) -> usize {
        match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(value);
                index
            }
            None => {
                self.slots.push(Some(value));
                self.slots.len() - 1
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        let value = self.slots.get_mut(index)?.take();
        while let Some(None) = self.slots.last() {
            self.slots.pop();
        }
        value
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| slot.as_ref().map(|v| (i, v)))
    }
}

/// Per process descriptor table, process handle to system handle
#[derive(Debug)]
pub struct ProcessFiles {
    pid: u32,
    pub(super) table: HandleTable<SysFd>,
}

impl ProcessFiles {
    pub fn new(pid: u32) -> Self {
        Self { pid, table: HandleTable::new() }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn resolve(&self, fd: ProcFd) -> Option<SysFd> {
        self.table.get(fd.into()).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

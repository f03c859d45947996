//! The working copy of the settings record.
//!
//! Seeded from the persisted record at boot, mutated by the BLE callback
//! (field updates, mode flip on commit) and snapshotted by the main loop
//! when it runs a deferred commit.  Every access goes through one
//! critical-section mutex, so a snapshot never observes a half-written
//! field.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::settings::{Field, FieldWrite, Mode, SettingsRecord};

pub struct StagedSettings {
    inner: Mutex<CriticalSectionRawMutex, RefCell<SettingsRecord>>,
}

impl StagedSettings {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(SettingsRecord::new())),
        }
    }

    /// Replace the whole working copy.
    pub fn load(&self, record: SettingsRecord) {
        self.inner.lock(|cell| *cell.borrow_mut() = record);
    }

    pub fn set_field(&self, field: Field, value: &[u8]) -> FieldWrite {
        self.inner
            .lock(|cell| cell.borrow_mut().set_field(field, value))
    }

    pub fn set_mode(&self, mode: Mode) {
        self.inner.lock(|cell| cell.borrow_mut().mode = mode);
    }

    /// Consistent copy of the working record.
    pub fn snapshot(&self) -> SettingsRecord {
        self.inner.lock(|cell| cell.borrow().clone())
    }
}

impl Default for StagedSettings {
    fn default() -> Self {
        Self::new()
    }
}

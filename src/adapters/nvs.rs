//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`PersistentStore`] as one fixed-size blob in its own NVS
//! namespace.  The blob is the whole settings region: `capacity` bytes,
//! the record at offset 0, zero padding after it.
//!
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`, so
//!   a power cut mid-write leaves either the old or the new record.
//! - A missing blob reads as all zeros and is created on `begin`.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::PersistentStore;
use crate::error::StorageError;
use crate::settings::RECORD_LEN;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const NAMESPACE: &[u8] = b"smartplant\0";
#[cfg(target_os = "espidf")]
const REGION_KEY: &[u8] = b"settings\0";

pub struct NvsStore {
    capacity: Option<usize>,
    #[cfg(not(target_os = "espidf"))]
    region: Vec<u8>,
}

impl NvsStore {
    pub fn new() -> Self {
        Self {
            capacity: None,
            #[cfg(not(target_os = "espidf"))]
            region: Vec::new(),
        }
    }

    fn capacity(&self) -> Result<usize, StorageError> {
        self.capacity.ok_or(StorageError::NotInitialised)
    }

    fn zeroed_region(capacity: usize) -> Vec<u8> {
        vec![0u8; capacity]
    }
}

impl Default for NvsStore {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl NvsStore {
    fn init_flash() -> Result<(), StorageError> {
        // SAFETY: nvs_flash_init / nvs_flash_erase are re-entrant with
        // respect to an already initialised partition.
        let ret = unsafe { nvs_flash_init() };
        if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
            warn!("NvsStore: erasing and re-initialising flash partition");
            let ret = unsafe { nvs_flash_erase() };
            if ret != ESP_OK {
                return Err(StorageError::Io(ret));
            }
            let ret = unsafe { nvs_flash_init() };
            if ret != ESP_OK {
                return Err(StorageError::Io(ret));
            }
        } else if ret != ESP_OK {
            return Err(StorageError::Io(ret));
        }
        Ok(())
    }

    /// Open the namespace, execute a closure with the handle, then close.
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: NAMESPACE is NUL-terminated; handle is closed below.
        let ret = unsafe { nvs_open(NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// Read the stored blob.  `Ok(None)` if it was never written.
    fn read_blob(capacity: usize) -> Result<Option<Vec<u8>>, StorageError> {
        let result = Self::with_nvs_handle(false, |handle| {
            let mut buf = Self::zeroed_region(capacity);
            let mut size = capacity;
            // SAFETY: buf holds `size` writable bytes.
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    REGION_KEY.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            buf.truncate(size);
            buf.resize(capacity, 0);
            Ok(buf)
        });

        match result {
            Ok(buf) => Ok(Some(buf)),
            // Key (or, before the first write, the namespace) absent.
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(None),
            Err(e) if e == ESP_ERR_NVS_INVALID_LENGTH => {
                warn!("NvsStore: stored region larger than capacity, resetting");
                Ok(None)
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn write_blob(bytes: &[u8]) -> Result<(), StorageError> {
        Self::with_nvs_handle(true, |handle| {
            // SAFETY: bytes outlives the call; key is NUL-terminated.
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    REGION_KEY.as_ptr() as *const _,
                    bytes.as_ptr() as *const _,
                    bytes.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(StorageError::Io)
    }
}

#[cfg(target_os = "espidf")]
impl PersistentStore for NvsStore {
    fn begin(&mut self, capacity: usize) -> Result<(), StorageError> {
        if capacity < RECORD_LEN {
            return Err(StorageError::CapacityTooSmall {
                requested: capacity,
                required: RECORD_LEN,
            });
        }
        Self::init_flash()?;
        if Self::read_blob(capacity)?.is_none() {
            Self::write_blob(&Self::zeroed_region(capacity))?;
            info!("NvsStore: created {} byte settings region", capacity);
        }
        self.capacity = Some(capacity);
        Ok(())
    }

    fn read_record(&self) -> Result<[u8; RECORD_LEN], StorageError> {
        let capacity = self.capacity()?;
        let mut out = [0u8; RECORD_LEN];
        if let Some(region) = Self::read_blob(capacity)? {
            out.copy_from_slice(&region[..RECORD_LEN]);
        }
        Ok(out)
    }

    fn write_record(&mut self, bytes: &[u8; RECORD_LEN]) -> Result<(), StorageError> {
        let capacity = self.capacity()?;
        let mut region = Self::zeroed_region(capacity);
        region[..RECORD_LEN].copy_from_slice(bytes);
        Self::write_blob(&region)?;
        info!("NvsStore: record committed ({} bytes)", RECORD_LEN);
        Ok(())
    }

    fn erase_all(&mut self) -> Result<(), StorageError> {
        let capacity = self.capacity()?;
        Self::write_blob(&Self::zeroed_region(capacity))?;
        info!("NvsStore: region erased");
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation backend
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl PersistentStore for NvsStore {
    fn begin(&mut self, capacity: usize) -> Result<(), StorageError> {
        if capacity < RECORD_LEN {
            return Err(StorageError::CapacityTooSmall {
                requested: capacity,
                required: RECORD_LEN,
            });
        }
        self.region.resize(capacity, 0);
        self.capacity = Some(capacity);
        info!("NvsStore: simulation backend ({} bytes)", capacity);
        Ok(())
    }

    fn read_record(&self) -> Result<[u8; RECORD_LEN], StorageError> {
        self.capacity()?;
        let mut out = [0u8; RECORD_LEN];
        out.copy_from_slice(&self.region[..RECORD_LEN]);
        Ok(out)
    }

    fn write_record(&mut self, bytes: &[u8; RECORD_LEN]) -> Result<(), StorageError> {
        self.capacity()?;
        self.region[..RECORD_LEN].copy_from_slice(bytes);
        Ok(())
    }

    fn erase_all(&mut self) -> Result<(), StorageError> {
        let capacity = self.capacity()?;
        self.region = Self::zeroed_region(capacity);
        Ok(())
    }
}

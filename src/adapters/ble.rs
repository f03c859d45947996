//! BLE provisioning adapter.
//!
//! Implements [`ProvisioningChannel`]: a UART-style GATT service with one
//! writable characteristic for inbound commands and one notifiable
//! characteristic for replies.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid GATT server via raw
//!   `esp_idf_svc::sys` calls.
//! - **all other targets**: simulation backend that records notifications
//!   and lets tests deliver writes.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                                     | Perms        |
//! |----------------|------------------------------------------|--------------|
//! | Service        | `6E400001-B5A3-F393-E0A9-E50E24DCCA9E`   |              |
//! | Inbound (RX)   | `6E400002-B5A3-F393-E0A9-E50E24DCCA9E`   | Write        |
//! | Outbound (TX)  | `6E400003-B5A3-F393-E0A9-E50E24DCCA9E`   | Notify + CCCD|

use std::sync::OnceLock;

use log::{info, warn};

use super::utils::prefix_preview;
use crate::app::ports::{InboundMessageHandler, ProvisioningChannel};
use crate::error::ChannelError;

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E;
pub const CHAR_RX: u128 = 0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E;
pub const CHAR_TX: u128 = 0x6E400003_B5A3_F393_E0A9_E50E24DCCA9E;

/// Largest inbound write the handler will see.
pub const MAX_INBOUND_BYTES: usize = 128;

/// Notification payload limit before MTU negotiation (23 - 3 header bytes).
#[cfg(target_os = "espidf")]
const DEFAULT_NOTIFY_MAX: usize = 20;

// ───────────────────────────────────────────────────────────────
// Handler registration
// ───────────────────────────────────────────────────────────────

// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures, so the inbound handler lives in a process-wide cell.
static INBOUND_HANDLER: OnceLock<&'static (dyn InboundMessageHandler + Sync)> = OnceLock::new();

/// Route one inbound write to the registered handler.
fn dispatch_inbound(raw: &[u8]) {
    if raw.len() > MAX_INBOUND_BYTES {
        warn!(
            "BLE: inbound write of {} bytes exceeds {}, dropped",
            raw.len(),
            MAX_INBOUND_BYTES
        );
        return;
    }
    match INBOUND_HANDLER.get() {
        Some(handler) => {
            info!(
                "BLE: inbound '{}' ({} bytes)",
                prefix_preview(raw),
                raw.len()
            );
            handler.on_inbound_message(raw);
        }
        None => warn!("BLE: write before handler registration, dropped"),
    }
}

// ───────────────────────────────────────────────────────────────
// BLE state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Connected,
    Failed,
}

// ── ESP-IDF BLE static state ──────────────────────────────────
//
// Written from the Bluedroid task, read from the main loop.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering as AtomicOrdering};

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONN_ID: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONNECTED: AtomicBool = AtomicBool::new(false);
#[cfg(target_os = "espidf")]
static BLE_NOTIFY_ENABLED: AtomicBool = AtomicBool::new(false);
#[cfg(target_os = "espidf")]
static BLE_NOTIFY_MAX: AtomicU32 = AtomicU32::new(DEFAULT_NOTIFY_MAX as u32);
#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_RX_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_TX_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_TX_CCCD_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CHAR_STEP: AtomicU32 = AtomicU32::new(0);

/// Bits still pending before advertising may start.
#[cfg(target_os = "espidf")]
static ADV_CONFIG_PENDING: AtomicU8 = AtomicU8::new(0);
#[cfg(target_os = "espidf")]
const ADV_CONFIG_FLAG: u8 = 1 << 0;
#[cfg(target_os = "espidf")]
const SCAN_RSP_CONFIG_FLAG: u8 = 1 << 1;

/// Service UUID in the little-endian byte order the stack expects.
#[cfg(target_os = "espidf")]
static SERVICE_UUID_LE: [u8; 16] = SERVICE_UUID.to_le_bytes();

#[cfg(target_os = "espidf")]
const CCCD_UUID: u16 = 0x2902;
#[cfg(target_os = "espidf")]
const LOCAL_MTU: u16 = 185;

#[cfg(target_os = "espidf")]
fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
    // SAFETY: esp_bt_uuid_t is a plain C struct; all-zero is valid.
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    t.uuid.uuid128 = uuid.to_le_bytes();
    t
}

#[cfg(target_os = "espidf")]
fn uuid16_to_esp(uuid: u16) -> esp_idf_svc::sys::esp_bt_uuid_t {
    // SAFETY: as above.
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 2;
    t.uuid.uuid16 = uuid;
    t
}

#[cfg(target_os = "espidf")]
unsafe fn add_gatt_char(svc_handle: u16, uuid: u128, perm: u32, prop: u32) {
    use esp_idf_svc::sys::*;
    let mut char_uuid = uuid128_to_esp(uuid);
    unsafe {
        esp_ble_gatts_add_char(
            svc_handle,
            &mut char_uuid,
            perm as esp_gatt_perm_t,
            prop as esp_gatt_char_prop_t,
            core::ptr::null_mut(),
            core::ptr::null_mut(),
        );
    }
}

#[cfg(target_os = "espidf")]
unsafe fn start_advertising() {
    use esp_idf_svc::sys::*;
    unsafe {
        let mut adv_params = esp_ble_adv_params_t {
            adv_int_min: 0x20,
            adv_int_max: 0x40,
            adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
            own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
            channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
            adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            ..core::mem::zeroed()
        };
        esp_ble_gap_start_advertising(&mut adv_params);
    }
}

/// Advertising payload: flags and name.  Scan response: the service UUID,
/// which does not fit alongside the name in 31 bytes.
#[cfg(target_os = "espidf")]
unsafe fn configure_advertising() -> i32 {
    use esp_idf_svc::sys::*;
    ADV_CONFIG_PENDING.store(ADV_CONFIG_FLAG | SCAN_RSP_CONFIG_FLAG, AtomicOrdering::Relaxed);
    unsafe {
        let mut adv: esp_ble_adv_data_t = core::mem::zeroed();
        adv.set_scan_rsp = false;
        adv.include_name = true;
        adv.flag = (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8;
        let ret = esp_ble_gap_config_adv_data(&mut adv);
        if ret != ESP_OK {
            return ret;
        }

        let mut rsp: esp_ble_adv_data_t = core::mem::zeroed();
        rsp.set_scan_rsp = true;
        rsp.service_uuid_len = SERVICE_UUID_LE.len() as u16;
        // The stack copies the UUID out; it never writes through this pointer.
        rsp.p_service_uuid = SERVICE_UUID_LE.as_ptr() as *mut u8;
        esp_ble_gap_config_adv_data(&mut rsp)
    }
}

#[cfg(target_os = "espidf")]
fn adv_config_done(flag: u8) {
    let before = ADV_CONFIG_PENDING.fetch_and(!flag, AtomicOrdering::Relaxed);
    if before & !flag == 0 {
        // SAFETY: called from the Bluedroid task after the stack is up.
        unsafe { start_advertising() };
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    _param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => {
            adv_config_done(ADV_CONFIG_FLAG);
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_SET_COMPLETE_EVT => {
            adv_config_done(SCAN_RSP_CONFIG_FLAG);
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising started");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising stopped");
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            BLE_GATTS_IF.store(gatts_if as u32, AtomicOrdering::Relaxed);
            let p = unsafe { &(*param).reg };
            if p.status != esp_gatt_status_t_ESP_GATT_OK {
                log::error!("BLE GATTS: app register failed (status={})", p.status);
                return;
            }
            log::info!("BLE GATTS: app registered (if={})", gatts_if);
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: uuid128_to_esp(SERVICE_UUID),
                    inst_id: 0,
                },
                is_primary: true,
            };
            // Service decl + 2 chars (decl + value) + CCCD.
            unsafe { esp_ble_gatts_create_service(gatts_if, &mut svc_id, 8) };
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let p = unsafe { &(*param).create };
            let svc_handle = p.service_handle;
            BLE_SVC_HANDLE.store(svc_handle as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: service created (handle={})", svc_handle);
            unsafe { esp_ble_gatts_start_service(svc_handle) };
            BLE_CHAR_STEP.store(1, AtomicOrdering::Relaxed);
            unsafe {
                add_gatt_char(
                    svc_handle,
                    CHAR_RX,
                    ESP_GATT_PERM_WRITE,
                    ESP_GATT_CHAR_PROP_BIT_WRITE | ESP_GATT_CHAR_PROP_BIT_WRITE_NR,
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let p = unsafe { &(*param).add_char };
            let handle = p.attr_handle;
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            match BLE_CHAR_STEP.load(AtomicOrdering::Relaxed) {
                1 => {
                    BLE_RX_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: RX char (handle={})", handle);
                    BLE_CHAR_STEP.store(2, AtomicOrdering::Relaxed);
                    unsafe {
                        add_gatt_char(
                            svc_handle,
                            CHAR_TX,
                            ESP_GATT_PERM_READ,
                            ESP_GATT_CHAR_PROP_BIT_NOTIFY,
                        );
                    }
                }
                2 => {
                    BLE_TX_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: TX char (handle={})", handle);
                    BLE_CHAR_STEP.store(3, AtomicOrdering::Relaxed);
                    let mut cccd = uuid16_to_esp(CCCD_UUID);
                    unsafe {
                        esp_ble_gatts_add_char_descr(
                            svc_handle,
                            &mut cccd,
                            (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                            core::ptr::null_mut(),
                            core::ptr::null_mut(),
                        );
                    }
                }
                _ => {}
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
            let p = unsafe { &(*param).add_char_descr };
            BLE_TX_CCCD_HANDLE.store(p.attr_handle as u32, AtomicOrdering::Relaxed);
            BLE_CHAR_STEP.store(4, AtomicOrdering::Relaxed);
            log::info!(
                "BLE GATTS: TX CCCD (handle={}), service ready",
                p.attr_handle
            );
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let p = unsafe { &(*param).connect };
            BLE_CONN_ID.store(p.conn_id as u32, AtomicOrdering::Relaxed);
            BLE_NOTIFY_ENABLED.store(false, AtomicOrdering::Relaxed);
            BLE_NOTIFY_MAX.store(DEFAULT_NOTIFY_MAX as u32, AtomicOrdering::Relaxed);
            BLE_CONNECTED.store(true, AtomicOrdering::Release);
            log::info!("BLE GATTS: client connected (conn_id={})", p.conn_id);
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            BLE_CONNECTED.store(false, AtomicOrdering::Release);
            BLE_NOTIFY_ENABLED.store(false, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: client disconnected, re-advertising");
            unsafe { start_advertising() };
        }
        esp_gatts_cb_event_t_ESP_GATTS_MTU_EVT => {
            let p = unsafe { &(*param).mtu };
            let max = usize::from(p.mtu).saturating_sub(3);
            BLE_NOTIFY_MAX.store(max as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: MTU {} negotiated", p.mtu);
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            let handle = u32::from(p.handle);
            let data: &[u8] = if p.value.is_null() || p.len == 0 {
                &[]
            } else {
                // SAFETY: the stack owns `len` bytes at `value` for the
                // duration of this callback.
                unsafe { core::slice::from_raw_parts(p.value, usize::from(p.len)) }
            };

            if handle == BLE_RX_CHAR_HANDLE.load(AtomicOrdering::Relaxed) {
                dispatch_inbound(data);
            } else if handle == BLE_TX_CCCD_HANDLE.load(AtomicOrdering::Relaxed) {
                let enabled = data.first().is_some_and(|b| b & 0x01 != 0);
                BLE_NOTIFY_ENABLED.store(enabled, AtomicOrdering::Relaxed);
                log::info!(
                    "BLE GATTS: notifications {}",
                    if enabled { "enabled" } else { "disabled" }
                );
            }

            if p.need_rsp {
                unsafe {
                    esp_ble_gatts_send_response(
                        gatts_if,
                        p.conn_id,
                        p.trans_id,
                        esp_gatt_status_t_ESP_GATT_OK,
                        core::ptr::null_mut(),
                    );
                }
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

pub struct BleAdapter {
    state: BleState,
    device_name: heapless::String<24>,
    #[cfg(not(target_os = "espidf"))]
    sim_subscribed: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_notifications: Vec<Vec<u8>>,
}

impl BleAdapter {
    pub fn new(device_name: heapless::String<24>) -> Self {
        Self {
            state: BleState::Idle,
            device_name,
            #[cfg(not(target_os = "espidf"))]
            sim_subscribed: false,
            #[cfg(not(target_os = "espidf"))]
            sim_notifications: Vec::new(),
        }
    }

    #[cfg(target_os = "espidf")]
    pub fn state(&self) -> BleState {
        match self.state {
            BleState::Advertising | BleState::Connected => {
                if BLE_CONNECTED.load(AtomicOrdering::Acquire) {
                    BleState::Connected
                } else {
                    BleState::Advertising
                }
            }
            other => other,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn state(&self) -> BleState {
        self.state
    }

    fn register(handler: &'static (dyn InboundMessageHandler + Sync)) {
        if INBOUND_HANDLER.set(handler).is_err() {
            warn!("BLE: inbound handler already registered, keeping the first");
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self) -> Result<(), ChannelError> {
        use esp_idf_svc::sys::*;

        let name = std::ffi::CString::new(self.device_name.as_str())
            .map_err(|_| ChannelError::InitFailed(ESP_ERR_INVALID_ARG))?;

        // SAFETY: single-threaded bring-up from main before any BLE
        // callback can fire; every pointer outlives its call.
        unsafe {
            // BLE-only mode frees the classic BT controller memory.
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK {
                return Err(ChannelError::InitFailed(ret));
            }
            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK {
                return Err(ChannelError::InitFailed(ret));
            }
            let ret = esp_bluedroid_init();
            if ret != ESP_OK {
                return Err(ChannelError::InitFailed(ret));
            }
            let ret = esp_bluedroid_enable();
            if ret != ESP_OK {
                return Err(ChannelError::InitFailed(ret));
            }

            let ret = esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            if ret != ESP_OK {
                return Err(ChannelError::RegisterFailed(ret));
            }
            let ret = esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
            if ret != ESP_OK {
                return Err(ChannelError::RegisterFailed(ret));
            }
            let ret = esp_ble_gatts_app_register(0);
            if ret != ESP_OK {
                return Err(ChannelError::RegisterFailed(ret));
            }
            let ret = esp_ble_gatt_set_local_mtu(LOCAL_MTU);
            if ret != ESP_OK {
                warn!("BLE: set_local_mtu failed ({}), using default", ret);
            }

            let ret = esp_ble_gap_set_device_name(name.as_ptr());
            if ret != ESP_OK {
                return Err(ChannelError::InitFailed(ret));
            }
            let ret = configure_advertising();
            if ret != ESP_OK {
                return Err(ChannelError::InitFailed(ret));
            }
        }

        info!(
            "BLE(espidf): Bluedroid up, advertising as '{}'",
            self.device_name
        );
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self) -> Result<(), ChannelError> {
        info!(
            "BLE(sim): advertising '{}' (service {:032X})",
            self.device_name, SERVICE_UUID
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_notify(&mut self, payload: &[u8]) {
        use esp_idf_svc::sys::*;

        if !BLE_CONNECTED.load(AtomicOrdering::Acquire) {
            return;
        }
        if !BLE_NOTIFY_ENABLED.load(AtomicOrdering::Relaxed) {
            info!("BLE: peer not subscribed, notification skipped");
            return;
        }
        let handle = BLE_TX_CHAR_HANDLE.load(AtomicOrdering::Relaxed);
        if handle == 0 {
            return;
        }
        let max = BLE_NOTIFY_MAX.load(AtomicOrdering::Relaxed) as usize;
        let len = if payload.len() > max {
            warn!(
                "BLE: notification truncated ({} > {})",
                payload.len(),
                max
            );
            max
        } else {
            payload.len()
        };
        // SAFETY: payload outlives the call; the stack copies the bytes.
        let ret = unsafe {
            esp_ble_gatts_send_indicate(
                BLE_GATTS_IF.load(AtomicOrdering::Relaxed) as esp_gatt_if_t,
                BLE_CONN_ID.load(AtomicOrdering::Relaxed) as u16,
                handle as u16,
                len as u16,
                payload.as_ptr() as *mut u8,
                false,
            )
        };
        if ret != ESP_OK {
            warn!("BLE: notify failed ({})", ret);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_notify(&mut self, payload: &[u8]) {
        if self.state != BleState::Connected || !self.sim_subscribed {
            return;
        }
        self.sim_notifications.push(payload.to_vec());
    }
}

// ── Simulation hooks ──────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl BleAdapter {
    /// A central connects and optionally subscribes to the TX characteristic.
    pub fn sim_connect(&mut self, subscribe: bool) {
        if self.state == BleState::Advertising {
            self.state = BleState::Connected;
            self.sim_subscribed = subscribe;
            info!("BLE(sim): central connected (subscribed={})", subscribe);
        }
    }

    pub fn sim_disconnect(&mut self) {
        if self.state == BleState::Connected {
            self.state = BleState::Advertising;
            self.sim_subscribed = false;
            info!("BLE(sim): central disconnected, re-advertising");
        }
    }

    /// Deliver a write on the RX characteristic.
    pub fn sim_deliver(&self, raw: &[u8]) {
        dispatch_inbound(raw);
    }

    pub fn sim_notifications(&self) -> &[Vec<u8>] {
        &self.sim_notifications
    }
}

// ───────────────────────────────────────────────────────────────
// ProvisioningChannel implementation
// ───────────────────────────────────────────────────────────────

impl ProvisioningChannel for BleAdapter {
    fn start(
        &mut self,
        handler: &'static (dyn InboundMessageHandler + Sync),
    ) -> Result<(), ChannelError> {
        Self::register(handler);
        info!("BLE: starting advertising as '{}'", self.device_name);
        match self.platform_start() {
            Ok(()) => {
                self.state = BleState::Advertising;
                Ok(())
            }
            Err(e) => {
                self.state = BleState::Failed;
                Err(e)
            }
        }
    }

    fn notify(&mut self, payload: &[u8]) {
        self.platform_notify(payload);
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

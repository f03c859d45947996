//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to                  |
//! |------------|---------------------|------------------------------|
//! | `ble`      | ProvisioningChannel | Bluedroid GATT server        |
//! | `cloud`    | CloudPush           | Realtime database over HTTPS |
//! | `hardware` | SensorPort          | ESP32 ADC                    |
//! |            | StatusIndicator     | ESP32 GPIO (RGB LED)         |
//! | `log_sink` | EventSink           | Serial log output            |
//! | `nvs`      | PersistentStore     | NVS / in-memory store        |
//! | `time`     | (clock)             | ESP32 system timer           |
//! | `wifi`     | NetworkJoin         | ESP-IDF WiFi STA             |
//!
//! [`SystemPort`](crate::app::ports::SystemPort) is implemented by
//! [`power::EspSystem`](crate::power::EspSystem).

pub mod ble;
pub mod cloud;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub(super) mod utils;
pub mod wifi;

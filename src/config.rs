//! Firmware configuration parameters
//!
//! All tunable parameters for the Smartplant node.  Values are compiled in;
//! the cloud endpoint and credential come from the build environment
//! (`SMARTPLANT_CLOUD_HOST`, `SMARTPLANT_CLOUD_AUTH`) so no secret lives in
//! the source tree.

use core::fmt;

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::settings::RECORD_LEN;

/// Fallback cloud host when `SMARTPLANT_CLOUD_HOST` is unset at build time.
const DEFAULT_CLOUD_HOST: &str = "smartplant-df86c.firebaseio.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareConfig {
    // --- Provisioning ---
    /// Advertised BLE device name.
    pub device_name: String<24>,
    /// Bytes reserved for the settings region.
    pub storage_capacity: u16,

    // --- Reset input ---
    /// Hold time before a reset press is confirmed.
    pub reset_settle_ms: u32,
    /// How often the reset guard samples while in telemetry mode.
    pub reset_poll_ms: u32,

    // --- Timing ---
    /// Pause between provisioning main-loop passes.
    pub loop_interval_ms: u32,
    /// Deep-sleep duration between telemetry cycles.
    pub sleep_interval_secs: u32,
    /// Network join window; 0 waits forever.
    pub join_timeout_secs: u32,

    // --- Cloud ---
    pub cloud_host: String<64>,
    pub cloud_auth: String<64>,

    // --- Moisture calibration ---
    /// Raw ADC reading with the probe in dry air (0 %).
    pub moisture_dry_raw: u16,
    /// Raw ADC reading with the probe submerged (100 %).
    pub moisture_wet_raw: u16,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            device_name: bounded("Smartplant"),
            storage_capacity: 120,

            reset_settle_ms: 2_000,
            reset_poll_ms: 50,

            loop_interval_ms: 100,
            sleep_interval_secs: 600, // 10 min
            join_timeout_secs: 60,

            cloud_host: bounded(option_env!("SMARTPLANT_CLOUD_HOST").unwrap_or(DEFAULT_CLOUD_HOST)),
            cloud_auth: bounded(option_env!("SMARTPLANT_CLOUD_AUTH").unwrap_or("")),

            moisture_dry_raw: 3_000,
            moisture_wet_raw: 1_300,
        }
    }
}

impl FirmwareConfig {
    /// Range-check every field.  Rejects rather than clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_name.is_empty() {
            return Err(ConfigError::ValidationFailed("device_name empty"));
        }
        if (self.storage_capacity as usize) < RECORD_LEN {
            return Err(ConfigError::ValidationFailed(
                "storage_capacity below record length",
            ));
        }
        if !(100..=10_000).contains(&self.reset_settle_ms) {
            return Err(ConfigError::ValidationFailed(
                "reset_settle_ms out of range 100-10000",
            ));
        }
        if self.reset_poll_ms == 0 || self.reset_poll_ms >= self.reset_settle_ms {
            return Err(ConfigError::ValidationFailed(
                "reset_poll_ms must be non-zero and below reset_settle_ms",
            ));
        }
        if self.loop_interval_ms == 0 || self.loop_interval_ms >= self.reset_settle_ms {
            return Err(ConfigError::ValidationFailed(
                "loop_interval_ms must be non-zero and below reset_settle_ms",
            ));
        }
        if !(10..=86_400).contains(&self.sleep_interval_secs) {
            return Err(ConfigError::ValidationFailed(
                "sleep_interval_secs out of range 10-86400",
            ));
        }
        if self.cloud_host.is_empty() {
            return Err(ConfigError::ValidationFailed("cloud_host empty"));
        }
        if self.moisture_dry_raw == self.moisture_wet_raw {
            return Err(ConfigError::ValidationFailed(
                "moisture calibration points identical",
            ));
        }
        Ok(())
    }
}

/// Copy as much of `s` as fits, stopping on a char boundary.
fn bounded<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Errors from [`FirmwareConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
        }
    }
}

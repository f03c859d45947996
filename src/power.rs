//! Chip power control: wake-cause query, deep sleep, restart, halt.
//!
//! Telemetry mode never idles awake.  Each wake runs one cycle and then
//! arms two wake sources before sleeping:
//!
//! - the RTC timer (next telemetry cycle)
//! - ext0 on the reset input going low, so a reset press wakes the node
//!
//! ```text
//!  wake ─▶ boot ─▶ cycle ─▶ arm timer + ext0 ─▶ deep sleep ─┐
//!    ▲                                                      │
//!    └──────────────────────────────────────────────────────┘
//! ```

use core::time::Duration;

use log::{info, warn};

use crate::app::ports::SystemPort;

/// Why the chip is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// Cold boot, brown-out or software restart.
    PowerOn,
    /// The sleep timer expired.
    Timer,
    /// The reset input was pulled low during sleep.
    ResetInput,
    /// Any other wake source.
    Other,
}

#[cfg(target_os = "espidf")]
pub fn wake_reason() -> WakeReason {
    use esp_idf_svc::sys::{
        esp_sleep_get_wakeup_cause, esp_sleep_source_t_ESP_SLEEP_WAKEUP_EXT0,
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER, esp_sleep_source_t_ESP_SLEEP_WAKEUP_UNDEFINED,
    };

    // SAFETY: reads a register latched by the ROM bootloader.
    #[allow(non_upper_case_globals)]
    match unsafe { esp_sleep_get_wakeup_cause() } {
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_UNDEFINED => WakeReason::PowerOn,
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER => WakeReason::Timer,
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_EXT0 => WakeReason::ResetInput,
        _ => WakeReason::Other,
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn wake_reason() -> WakeReason {
    WakeReason::PowerOn
}

// ───────────────────────────────────────────────────────────────
// SystemPort implementation
// ───────────────────────────────────────────────────────────────

/// Chip-level control.  On the host every call only logs.
pub struct EspSystem;

impl EspSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EspSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemPort for EspSystem {
    fn restart(&mut self) {
        info!("System: restart");
        platform_restart();
    }

    fn deep_sleep(&mut self, duration: Duration) {
        info!("System: deep sleep for {} s", duration.as_secs());
        platform_deep_sleep(Some(duration));
    }

    fn halt(&mut self) {
        warn!("System: halted until power cycle");
        platform_deep_sleep(None);
    }
}

// ── Platform: ESP-IDF ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn platform_restart() {
    // SAFETY: esp_restart never returns.
    unsafe { esp_idf_svc::sys::esp_restart() };
}

#[cfg(target_os = "espidf")]
fn platform_deep_sleep(duration: Option<Duration>) {
    use esp_idf_svc::sys::{
        esp_deep_sleep_start, esp_sleep_enable_ext0_wakeup, esp_sleep_enable_timer_wakeup,
    };

    // SAFETY: wake-source registration only writes RTC control registers;
    // esp_deep_sleep_start never returns.
    unsafe {
        if let Some(d) = duration {
            esp_sleep_enable_timer_wakeup(d.as_micros() as u64);
            let ret = esp_sleep_enable_ext0_wakeup(crate::pins::RESET_GPIO, 0);
            if ret != 0 {
                warn!("System: ext0 wake not armed ({})", ret);
            }
        }
        esp_deep_sleep_start();
    }
}

// ── Platform: host simulation ─────────────────────────────────

#[cfg(not(target_os = "espidf"))]
fn platform_restart() {}

#[cfg(not(target_os = "espidf"))]
fn platform_deep_sleep(_duration: Option<Duration>) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_boot_is_power_on() {
        assert_eq!(wake_reason(), WakeReason::PowerOn);
    }

    #[test]
    fn host_system_calls_return() {
        let mut sys = EspSystem::new();
        sys.deep_sleep(Duration::from_secs(1));
        sys.restart();
        sys.halt();
    }
}

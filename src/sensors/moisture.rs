//! Capacitive soil-moisture probe.
//!
//! Reads the probe's analog output through ADC1 and maps it onto 0–100 %
//! with a two-point calibration.  Capacitive probes read *lower* when wet,
//! so the dry point is the high end of the scale.
//!
//! On ESP-IDF: reads ADC1 via the oneshot API (initialised by hw_init).
//! On host/test: reads from a static `AtomicU16` for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use crate::error::SensorError;

#[cfg(not(target_os = "espidf"))]
static SIM_MOISTURE_ADC: AtomicU16 = AtomicU16::new(0);
#[cfg(not(target_os = "espidf"))]
static SIM_MOISTURE_FAIL: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_moisture_adc(raw: u16) {
    SIM_MOISTURE_ADC.store(raw, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_moisture_fail(fail: bool) {
    SIM_MOISTURE_FAIL.store(fail, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoistureReading {
    pub raw: u16,
    pub percent: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    /// Reading in dry air (0 %).
    pub dry_raw: u16,
    /// Reading fully submerged (100 %).
    pub wet_raw: u16,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            dry_raw: 3_000,
            wet_raw: 1_300,
        }
    }
}

impl Calibration {
    /// Map a raw reading onto 0–100 %, clamped at both ends.
    pub fn percent(&self, raw: u16) -> u8 {
        let (dry, wet, raw) = (
            i32::from(self.dry_raw),
            i32::from(self.wet_raw),
            i32::from(raw),
        );
        let span = dry - wet;
        if span == 0 {
            return 0;
        }
        let pct = (dry - raw) * 100 / span;
        pct.clamp(0, 100) as u8
    }
}

pub struct MoistureSensor {
    cal: Calibration,
    total_reads: u32,
}

impl MoistureSensor {
    pub fn new(cal: Calibration) -> Self {
        Self {
            cal,
            total_reads: 0,
        }
    }

    pub fn read(&mut self) -> Result<MoistureReading, SensorError> {
        self.total_reads = self.total_reads.saturating_add(1);
        let raw = self.read_adc().ok_or(SensorError::AdcReadFailed)?;
        Ok(MoistureReading {
            raw,
            percent: self.cal.percent(raw),
        })
    }

    pub fn total_reads(&self) -> u32 {
        self.total_reads
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> Option<u16> {
        crate::drivers::hw_init::adc1_read(crate::pins::MOISTURE_ADC_CHANNEL)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> Option<u16> {
        if SIM_MOISTURE_FAIL.load(Ordering::Relaxed) {
            return None;
        }
        Some(SIM_MOISTURE_ADC.load(Ordering::Relaxed))
    }
}

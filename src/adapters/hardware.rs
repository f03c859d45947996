//! Hardware adapter: bridges the board's peripherals to domain port traits.
//!
//! Owns the moisture probe and the status LED, exposing them through
//! [`SensorPort`] and [`StatusIndicator`].  On non-espidf targets the
//! underlying drivers use cfg-gated simulation stubs.

use log::info;

use crate::app::ports::{SensorPort, StatusIndicator};
use crate::drivers::status_led::StatusLed;
use crate::error::SensorError;
use crate::fsm::context::StatusColour;
use crate::sensors::moisture::MoistureSensor;

/// Concrete adapter that combines the board's I/O behind port traits.
pub struct BoardAdapter {
    moisture: MoistureSensor,
    led: StatusLed,
}

impl BoardAdapter {
    pub fn new(moisture: MoistureSensor, led: StatusLed) -> Self {
        Self { moisture, led }
    }

    pub fn led(&self) -> &StatusLed {
        &self.led
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for BoardAdapter {
    /// Reports the calibrated percentage; the raw count is only logged.
    fn read_moisture(&mut self) -> Result<i32, SensorError> {
        let reading = self.moisture.read()?;
        info!(
            "Sensor: moisture raw={} -> {}%",
            reading.raw, reading.percent
        );
        Ok(i32::from(reading.percent))
    }
}

// ── StatusIndicator implementation ────────────────────────────

impl StatusIndicator for BoardAdapter {
    fn show(&mut self, colour: StatusColour) {
        self.led.set(colour);
    }
}

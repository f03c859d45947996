//! One telemetry wake: join, sample, push.
//!
//! Exactly one cloud push is attempted per cycle.  Any failure abandons
//! the rest of the cycle; the caller sleeps regardless and the next wake
//! starts over.  There is no retry inside a cycle.

use core::fmt::Write as _;
use core::time::Duration;

use heapless::String;
use log::{info, warn};

use crate::config::FirmwareConfig;
use crate::error::{Error, PushError};
use crate::settings::SettingsRecord;

use super::events::AppEvent;
use super::ports::{CloudPush, EventSink, NetworkJoin, SensorPort};

/// Longest record path: `plants/` + account + `/` + device + `/value`.
pub const PATH_CAP: usize = 64;

/// Cloud record path for a device's reading.
pub fn record_path(settings: &SettingsRecord) -> Result<String<PATH_CAP>, PushError> {
    let mut path = String::new();
    write!(
        path,
        "plants/{}/{}/value",
        settings.account_id, settings.device_id
    )
    .map_err(|_| PushError::InvalidPath)?;
    Ok(path)
}

pub struct TelemetryCycle<'c> {
    config: &'c FirmwareConfig,
}

impl<'c> TelemetryCycle<'c> {
    pub fn new(config: &'c FirmwareConfig) -> Self {
        Self { config }
    }

    fn join_timeout(&self) -> Option<Duration> {
        match self.config.join_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(u64::from(secs))),
        }
    }

    /// Run one cycle.  Returns the pushed value on success.
    pub fn run(
        &self,
        settings: &SettingsRecord,
        net: &mut impl NetworkJoin,
        sensor: &mut impl SensorPort,
        cloud: &mut impl CloudPush,
        sink: &mut impl EventSink,
    ) -> Result<i32, Error> {
        let result = self.attempt(settings, net, sensor, cloud);
        match result {
            Ok(value) => sink.emit(&AppEvent::TelemetryPushed { value }),
            Err(e) => {
                warn!("Telemetry: cycle abandoned: {}", e);
                sink.emit(&AppEvent::TelemetryAbandoned(e));
            }
        }
        result
    }

    fn attempt(
        &self,
        settings: &SettingsRecord,
        net: &mut impl NetworkJoin,
        sensor: &mut impl SensorPort,
        cloud: &mut impl CloudPush,
    ) -> Result<i32, Error> {
        let path = record_path(settings)?;

        info!("Telemetry: joining \"{}\"", settings.network_id);
        net.join(
            &settings.network_id,
            &settings.network_secret,
            self.join_timeout(),
        )?;

        let value = sensor.read_moisture()?;
        info!("Telemetry: moisture = {}", value);

        cloud.push_value(&path, value)?;
        info!("Telemetry: pushed {} to {}", value, path);
        Ok(value)
    }
}

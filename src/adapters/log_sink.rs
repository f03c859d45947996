//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART in production) with a fixed tag column.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Booted(state) => {
                info!("BOOT | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::SettingsCommitted => {
                info!("COMMIT | settings persisted, restarting");
            }
            AppEvent::CommitRejected { missing } => {
                warn!("COMMIT | rejected, {} is empty", missing.name());
            }
            AppEvent::CommitFailed(e) => {
                error!("COMMIT | write failed: {}", e);
            }
            AppEvent::TelemetryPushed { value } => {
                info!("TELEM | pushed value={}", value);
            }
            AppEvent::TelemetryAbandoned(e) => {
                warn!("TELEM | cycle abandoned: {}", e);
            }
            AppEvent::FactoryReset => {
                warn!("RESET | erasing settings");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, PushError, StorageError};
    use crate::fsm::StateId;
    use crate::settings::Field;

    #[test]
    fn every_event_renders() {
        let mut sink = LogEventSink::new();
        for event in [
            AppEvent::Booted(StateId::Provisioning),
            AppEvent::StateChanged {
                from: StateId::BootDeciding,
                to: StateId::TelemetryActive,
            },
            AppEvent::SettingsCommitted,
            AppEvent::CommitRejected {
                missing: Field::DeviceId,
            },
            AppEvent::CommitFailed(StorageError::Io(-1)),
            AppEvent::TelemetryPushed { value: 37 },
            AppEvent::TelemetryAbandoned(Error::Push(PushError::Network)),
            AppEvent::FactoryReset,
        ] {
            sink.emit(&event);
        }
    }
}

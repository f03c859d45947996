//! Outbound application events.
//!
//! The [`ModeController`](super::service::ModeController) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them; on the device they become
//! tagged log lines.

use crate::error::{Error, StorageError};
use crate::fsm::StateId;
use crate::settings::Field;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Boot decision made.
    Booted(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// The working copy was persisted; a restart follows.
    SettingsCommitted,

    /// Commit refused because a field is empty.
    CommitRejected { missing: Field },

    /// Commit accepted but the flash write failed.
    CommitFailed(StorageError),

    /// A telemetry value reached the cloud.
    TelemetryPushed { value: i32 },

    /// The telemetry cycle was abandoned for this wake.
    TelemetryAbandoned(Error),

    /// The settings region is being erased; a restart follows.
    FactoryReset,
}

//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ModeController (domain)
//! ```
//!
//! Driven adapters (flash, radio, cloud, sensor, LED, chip control)
//! implement these traits.  The [`ModeController`](super::service::ModeController)
//! consumes them via generics, so the domain core never touches hardware
//! directly and every flow runs on the host against mocks.

use core::time::Duration;

use crate::error::{ChannelError, JoinError, PushError, SensorError, StorageError};
use crate::fsm::context::StatusColour;
use crate::settings::RECORD_LEN;

// ───────────────────────────────────────────────────────────────
// Persistent store (driven adapter: domain ↔ flash)
// ───────────────────────────────────────────────────────────────

/// Byte-addressable non-volatile region holding one settings record.
///
/// A region never written reads back as all zeros.  `write_record` is
/// durable when it returns `Ok`.
pub trait PersistentStore {
    /// Reserve `capacity` bytes.  Must precede every other call.
    fn begin(&mut self, capacity: usize) -> Result<(), StorageError>;

    /// Read the first [`RECORD_LEN`] bytes of the region.
    fn read_record(&self) -> Result<[u8; RECORD_LEN], StorageError>;

    /// Overwrite the first [`RECORD_LEN`] bytes and flush.
    fn write_record(&mut self, bytes: &[u8; RECORD_LEN]) -> Result<(), StorageError>;

    /// Zero the whole region and flush.
    fn erase_all(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Provisioning channel (driving adapter: phone → domain)
// ───────────────────────────────────────────────────────────────

/// Receives each inbound message.  Called from the radio stack's
/// callback context: must not block, must not touch flash.
pub trait InboundMessageHandler {
    fn on_inbound_message(&self, raw: &[u8]);
}

/// BLE peripheral exposing one writable and one notifiable characteristic.
pub trait ProvisioningChannel {
    /// Advertise and route every write to `handler`.
    fn start(
        &mut self,
        handler: &'static (dyn InboundMessageHandler + Sync),
    ) -> Result<(), ChannelError>;

    /// Send `payload` to the connected peer, if any and if subscribed.
    fn notify(&mut self, payload: &[u8]);
}

// ───────────────────────────────────────────────────────────────
// Network join (driven adapter: domain → WiFi station)
// ───────────────────────────────────────────────────────────────

pub trait NetworkJoin {
    /// Block until associated with an IP address.  `timeout = None` waits
    /// indefinitely.
    fn join(
        &mut self,
        network_id: &str,
        secret: &str,
        timeout: Option<Duration>,
    ) -> Result<(), JoinError>;
}

// ───────────────────────────────────────────────────────────────
// Cloud push (driven adapter: domain → realtime database)
// ───────────────────────────────────────────────────────────────

pub trait CloudPush {
    /// Write `value` at `path`, replacing what was there.
    fn push_value(&mut self, path: &str, value: i32) -> Result<(), PushError>;
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

pub trait SensorPort {
    /// One soil-moisture sample, already scaled for reporting.
    fn read_moisture(&mut self) -> Result<i32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Status indicator (driven adapter: domain → RGB LED)
// ───────────────────────────────────────────────────────────────

pub trait StatusIndicator {
    fn show(&mut self, colour: StatusColour);
}

// ───────────────────────────────────────────────────────────────
// System control (driven adapter: domain → chip)
// ───────────────────────────────────────────────────────────────

/// On hardware none of these return.  Test doubles record the call and
/// return so flows can be asserted.
pub trait SystemPort {
    fn restart(&mut self);

    /// Sleep for `duration`, then cold-boot.
    fn deep_sleep(&mut self, duration: Duration);

    /// Stop doing anything until power-cycled.
    fn halt(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

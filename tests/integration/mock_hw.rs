//! Mock adapters for integration tests.
//!
//! Each mock records every call so tests can assert on the full history
//! without touching flash, radio or GPIO.

use core::time::Duration;

use smartplant::app::events::AppEvent;
use smartplant::app::ports::{
    CloudPush, EventSink, InboundMessageHandler, NetworkJoin, PersistentStore,
    ProvisioningChannel, SensorPort, SystemPort,
};
use smartplant::app::provisioning::ProvisioningInbound;
use smartplant::app::staging::StagedSettings;
use smartplant::error::{ChannelError, JoinError, PushError, SensorError, StorageError};
use smartplant::events::DeferredActionQueue;
use smartplant::settings::RECORD_LEN;

// ── Shared cells ──────────────────────────────────────────────

/// Staging cell, queue and inbound handler with `'static` lifetimes, as
/// `main` declares them.  Leaked per test so tests stay independent.
pub struct Shared {
    pub staged: &'static StagedSettings,
    pub deferred: &'static DeferredActionQueue,
    pub inbound: &'static ProvisioningInbound<'static>,
}

impl Shared {
    pub fn leak() -> Self {
        let staged: &'static StagedSettings = Box::leak(Box::new(StagedSettings::new()));
        let deferred: &'static DeferredActionQueue =
            Box::leak(Box::new(DeferredActionQueue::new()));
        let inbound = Box::leak(Box::new(ProvisioningInbound::new(staged, deferred)));
        Self {
            staged,
            deferred,
            inbound,
        }
    }
}

// ── MockStore ─────────────────────────────────────────────────

pub struct MockStore {
    pub region: Vec<u8>,
    pub begun: bool,
    pub writes: u32,
    pub erases: u32,
    pub fail_writes: bool,
    pub fail_reads: bool,
}

#[allow(dead_code)]
impl MockStore {
    /// An all-zero region, as on a fresh chip.
    pub fn blank() -> Self {
        Self {
            region: vec![0; 120],
            begun: true,
            writes: 0,
            erases: 0,
            fail_writes: false,
            fail_reads: false,
        }
    }

    pub fn with_image(image: &[u8; RECORD_LEN]) -> Self {
        let mut s = Self::blank();
        s.region[..RECORD_LEN].copy_from_slice(image);
        s
    }

    pub fn image(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        out.copy_from_slice(&self.region[..RECORD_LEN]);
        out
    }

    pub fn is_zeroed(&self) -> bool {
        self.region.iter().all(|&b| b == 0)
    }
}

impl PersistentStore for MockStore {
    fn begin(&mut self, capacity: usize) -> Result<(), StorageError> {
        if capacity < RECORD_LEN {
            return Err(StorageError::CapacityTooSmall {
                requested: capacity,
                required: RECORD_LEN,
            });
        }
        self.region.resize(capacity, 0);
        self.begun = true;
        Ok(())
    }

    fn read_record(&self) -> Result<[u8; RECORD_LEN], StorageError> {
        if self.fail_reads {
            return Err(StorageError::Io(-1));
        }
        Ok(self.image())
    }

    fn write_record(&mut self, bytes: &[u8; RECORD_LEN]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io(-2));
        }
        self.region[..RECORD_LEN].copy_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }

    fn erase_all(&mut self) -> Result<(), StorageError> {
        self.region.iter_mut().for_each(|b| *b = 0);
        self.erases += 1;
        Ok(())
    }
}

// ── MockChannel ───────────────────────────────────────────────

pub struct MockChannel {
    handler: Option<&'static (dyn InboundMessageHandler + Sync)>,
    pub notifications: Vec<String>,
    pub fail_start: bool,
}

#[allow(dead_code)]
impl MockChannel {
    pub fn new() -> Self {
        Self {
            handler: None,
            notifications: Vec::new(),
            fail_start: false,
        }
    }

    /// Simulate a client write arriving on the inbound characteristic.
    pub fn deliver(&self, raw: &[u8]) {
        if let Some(h) = self.handler {
            h.on_inbound_message(raw);
        }
    }

    pub fn is_started(&self) -> bool {
        self.handler.is_some()
    }
}

impl ProvisioningChannel for MockChannel {
    fn start(
        &mut self,
        handler: &'static (dyn InboundMessageHandler + Sync),
    ) -> Result<(), ChannelError> {
        if self.fail_start {
            return Err(ChannelError::InitFailed(-1));
        }
        self.handler = Some(handler);
        Ok(())
    }

    fn notify(&mut self, payload: &[u8]) {
        self.notifications
            .push(String::from_utf8_lossy(payload).into_owned());
    }
}

// ── MockNetwork ───────────────────────────────────────────────

pub struct MockNetwork {
    pub joins: Vec<(String, String, Option<Duration>)>,
    pub result: Result<(), JoinError>,
}

impl MockNetwork {
    pub fn reachable() -> Self {
        Self {
            joins: Vec::new(),
            result: Ok(()),
        }
    }

    pub fn failing(e: JoinError) -> Self {
        Self {
            joins: Vec::new(),
            result: Err(e),
        }
    }
}

impl NetworkJoin for MockNetwork {
    fn join(
        &mut self,
        network_id: &str,
        secret: &str,
        timeout: Option<Duration>,
    ) -> Result<(), JoinError> {
        self.joins
            .push((network_id.to_owned(), secret.to_owned(), timeout));
        self.result
    }
}

// ── MockCloud ─────────────────────────────────────────────────

pub struct MockCloud {
    pub pushes: Vec<(String, i32)>,
    pub result: Result<(), PushError>,
}

impl MockCloud {
    pub fn ok() -> Self {
        Self {
            pushes: Vec::new(),
            result: Ok(()),
        }
    }

    pub fn failing(e: PushError) -> Self {
        Self {
            pushes: Vec::new(),
            result: Err(e),
        }
    }
}

impl CloudPush for MockCloud {
    fn push_value(&mut self, path: &str, value: i32) -> Result<(), PushError> {
        self.pushes.push((path.to_owned(), value));
        self.result
    }
}

// ── MockSensor ────────────────────────────────────────────────

pub struct MockSensor {
    pub value: Result<i32, SensorError>,
    pub reads: u32,
}

impl MockSensor {
    pub fn reading(value: i32) -> Self {
        Self {
            value: Ok(value),
            reads: 0,
        }
    }
}

impl SensorPort for MockSensor {
    fn read_moisture(&mut self) -> Result<i32, SensorError> {
        self.reads += 1;
        self.value
    }
}

// ── MockSystem ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemCall {
    Restart,
    DeepSleep(Duration),
    Halt,
}

pub struct MockSystem {
    pub calls: Vec<SystemCall>,
}

#[allow(dead_code)]
impl MockSystem {
    pub fn new() -> Self {
        Self { calls: Vec::new() }
    }

    pub fn restarts(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == SystemCall::Restart)
            .count()
    }
}

impl SystemPort for MockSystem {
    fn restart(&mut self) {
        self.calls.push(SystemCall::Restart);
    }

    fn deep_sleep(&mut self, duration: Duration) {
        self.calls.push(SystemCall::DeepSleep(duration));
    }

    fn halt(&mut self) {
        self.calls.push(SystemCall::Halt);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

//! Integration tests for the factory-reset path: debounced input through
//! the guard, then erase and restart via the controller or the watcher.

use core::cell::Cell;
use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin};

use smartplant::app::events::AppEvent;
use smartplant::app::reset::factory_reset;
use smartplant::app::service::{ModeController, PassOutcome};
use smartplant::config::FirmwareConfig;
use smartplant::drivers::reset_guard::{ResetEdge, ResetGuard};
use smartplant::fsm::StateId;
use smartplant::settings::{self, Field, Mode, SettingsRecord};

use crate::mock_hw::{MockStore, MockSystem, RecordingSink, Shared, SystemCall};

// ── Mock input pin ────────────────────────────────────────────

struct HeldPin<'a>(&'a Cell<bool>);

impl ErrorType for HeldPin<'_> {
    type Error = Infallible;
}

impl InputPin for HeldPin<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.get())
    }
}

fn committed_store() -> MockStore {
    let mut r = SettingsRecord::new();
    r.mode = Mode::WifiActive;
    r.set_field(Field::NetworkId, b"HomeNet");
    r.set_field(Field::NetworkSecret, b"hunter22");
    r.set_field(Field::AccountId, b"u-42");
    r.set_field(Field::DeviceId, b"ficus-7");
    MockStore::with_image(&settings::encode(&r))
}

/// Boot in provisioning mode, press at t=100, sample at t=100 and
/// t=100+2000 with the pin at `held_at_second_sample`.
fn press_in_provisioning(held_at_second_sample: bool) -> (MockStore, MockSystem, RecordingSink) {
    let shared = Shared::leak();
    let mut r = SettingsRecord::new();
    r.set_field(Field::NetworkId, b"half-done");
    let mut store = MockStore::with_image(&settings::encode(&r));
    let mut system = MockSystem::new();
    let mut sink = RecordingSink::new();

    let mut c = ModeController::new(FirmwareConfig::default(), shared.staged, shared.deferred);
    assert_eq!(c.boot(&store, &mut sink), StateId::Provisioning);

    let pressed = Cell::new(true);
    let edge = ResetEdge::new();
    let settle = c.config().reset_settle_ms;
    let mut guard = ResetGuard::new(HeldPin(&pressed), &edge, settle);

    edge.record(100);
    assert!(guard.poll(100).is_none());
    pressed.set(held_at_second_sample);
    if guard.poll(100 + settle).is_some() {
        assert_eq!(
            c.request_reset(&mut store, &mut system, &mut sink),
            PassOutcome::Restarted
        );
        assert_eq!(c.state(), StateId::ResettingDevice);
    }
    (store, system, sink)
}

#[test]
fn held_press_erases_and_restarts() {
    let (store, system, sink) = press_in_provisioning(true);
    assert!(store.is_zeroed());
    assert_eq!(store.erases, 1);
    assert_eq!(system.calls, vec![SystemCall::Restart]);
    assert!(sink.contains(&AppEvent::FactoryReset));
    assert!(sink.contains(&AppEvent::StateChanged {
        from: StateId::Provisioning,
        to: StateId::ResettingDevice
    }));
}

#[test]
fn released_press_does_not_erase() {
    let (store, system, sink) = press_in_provisioning(false);
    assert!(!store.is_zeroed());
    assert_eq!(store.erases, 0);
    assert!(system.calls.is_empty());
    assert!(!sink.contains(&AppEvent::FactoryReset));
}

#[test]
fn second_reset_request_is_ignored() {
    let shared = Shared::leak();
    let mut store = committed_store();
    let mut system = MockSystem::new();
    let mut sink = RecordingSink::new();

    let mut c = ModeController::new(FirmwareConfig::default(), shared.staged, shared.deferred);
    assert_eq!(c.boot(&store, &mut sink), StateId::TelemetryActive);

    assert_eq!(
        c.request_reset(&mut store, &mut system, &mut sink),
        PassOutcome::Restarted
    );
    assert_eq!(
        c.request_reset(&mut store, &mut system, &mut sink),
        PassOutcome::Continue
    );
    assert_eq!(store.erases, 1);
    assert_eq!(system.restarts(), 1);
}

#[test]
fn erased_store_boots_back_into_provisioning() {
    let shared = Shared::leak();
    let mut store = committed_store();
    let mut system = MockSystem::new();
    let mut sink = RecordingSink::new();

    factory_reset(&mut store, &mut system, &mut sink);
    assert_eq!(system.calls, vec![SystemCall::Restart]);

    let mut c = ModeController::new(FirmwareConfig::default(), shared.staged, shared.deferred);
    assert_eq!(c.boot(&store, &mut sink), StateId::Provisioning);
}

#[test]
fn guard_ignores_presses_once_triggered() {
    let pressed = Cell::new(true);
    let edge = ResetEdge::new();
    let mut guard = ResetGuard::new(HeldPin(&pressed), &edge, 2_000);

    edge.record(10);
    assert!(guard.poll(10).is_none());
    assert!(guard.poll(2_010).is_some());
    assert!(!edge.is_armed());

    edge.record(3_000);
    assert!(guard.poll(3_000).is_none());
    assert!(guard.poll(5_000).is_none());
}

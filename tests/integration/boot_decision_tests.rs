//! Integration tests for the boot-time mode decision.

use smartplant::app::events::AppEvent;
use smartplant::app::service::{ModeController, PassOutcome};
use smartplant::config::FirmwareConfig;
use smartplant::fsm::StateId;
use smartplant::fsm::context::StatusColour;
use smartplant::settings::{self, Field, Mode, SettingsRecord};

use crate::mock_hw::{MockChannel, MockStore, MockSystem, RecordingSink, Shared};

fn record(mode: Mode, fields: &[(Field, &[u8])]) -> SettingsRecord {
    let mut r = SettingsRecord::new();
    r.mode = mode;
    for (f, v) in fields {
        r.set_field(*f, v);
    }
    r
}

fn complete(mode: Mode) -> SettingsRecord {
    record(
        mode,
        &[
            (Field::NetworkId, b"HomeNet"),
            (Field::NetworkSecret, b"hunter22"),
            (Field::AccountId, b"u-42"),
            (Field::DeviceId, b"ficus-7"),
        ],
    )
}

fn boot(store: &MockStore) -> (StateId, StatusColour, RecordingSink) {
    let shared = Shared::leak();
    let mut sink = RecordingSink::new();
    let mut c = ModeController::new(FirmwareConfig::default(), shared.staged, shared.deferred);
    let state = c.boot(store, &mut sink);
    (state, c.status_colour(), sink)
}

#[test]
fn blank_storage_boots_into_provisioning() {
    let (state, colour, sink) = boot(&MockStore::blank());
    assert_eq!(state, StateId::Provisioning);
    assert_eq!(colour, StatusColour::Provisioning);
    assert!(sink.contains(&AppEvent::StateChanged {
        from: StateId::BootDeciding,
        to: StateId::Provisioning
    }));
    assert_eq!(sink.events.last(), Some(&AppEvent::Booted(StateId::Provisioning)));
}

#[test]
fn committed_complete_record_boots_into_telemetry() {
    let store = MockStore::with_image(&settings::encode(&complete(Mode::WifiActive)));
    let (state, colour, _) = boot(&store);
    assert_eq!(state, StateId::TelemetryActive);
    assert_eq!(colour, StatusColour::Telemetry);
}

#[test]
fn committed_but_incomplete_record_boots_into_provisioning() {
    let mut r = complete(Mode::WifiActive);
    r.set_field(Field::AccountId, b"");
    let store = MockStore::with_image(&settings::encode(&r));
    assert_eq!(boot(&store).0, StateId::Provisioning);
}

#[test]
fn complete_but_uncommitted_record_boots_into_provisioning() {
    let store = MockStore::with_image(&settings::encode(&complete(Mode::Unconfigured)));
    assert_eq!(boot(&store).0, StateId::Provisioning);
}

#[test]
fn unreadable_storage_boots_into_provisioning() {
    let mut store = MockStore::with_image(&settings::encode(&complete(Mode::WifiActive)));
    store.fail_reads = true;
    assert_eq!(boot(&store).0, StateId::Provisioning);
}

#[test]
fn garbage_mode_tag_is_unconfigured() {
    let mut image = settings::encode(&complete(Mode::WifiActive));
    image[0] = b'W';
    let store = MockStore::with_image(&image);
    assert_eq!(boot(&store).0, StateId::Provisioning);
}

#[test]
fn stored_values_seed_the_working_copy() {
    // Re-provisioning only needs the fields that change.
    let shared = Shared::leak();
    let mut store = MockStore::with_image(&settings::encode(&complete(Mode::Unconfigured)));
    let mut channel = MockChannel::new();
    let mut system = MockSystem::new();
    let mut sink = RecordingSink::new();

    let mut c = ModeController::new(FirmwareConfig::default(), shared.staged, shared.deferred);
    assert_eq!(c.boot(&store, &mut sink), StateId::Provisioning);
    c.start_provisioning(&mut channel, shared.inbound).unwrap();

    channel.deliver(b"passnew-secret");
    channel.deliver(b"ssav");
    assert_eq!(
        c.provisioning_pass(&mut store, &mut channel, &mut system, &mut sink),
        PassOutcome::Restarted
    );

    let stored = settings::decode(&store.image());
    assert_eq!(stored.network_id.as_str(), "HomeNet");
    assert_eq!(stored.network_secret.as_str(), "new-secret");
    assert_eq!(stored.mode, Mode::WifiActive);
}

#[test]
fn telemetry_mode_refuses_to_start_provisioning() {
    let shared = Shared::leak();
    let store = MockStore::with_image(&settings::encode(&complete(Mode::WifiActive)));
    let mut sink = RecordingSink::new();
    let mut channel = MockChannel::new();
    let mut c = ModeController::new(FirmwareConfig::default(), shared.staged, shared.deferred);
    c.boot(&store, &mut sink);
    assert!(c.start_provisioning(&mut channel, shared.inbound).is_err());
    assert!(!channel.is_started());
}

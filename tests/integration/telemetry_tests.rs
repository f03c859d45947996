//! Integration tests for the telemetry wake cycle: join, read, push once,
//! deep sleep.

use core::time::Duration;

use smartplant::app::events::AppEvent;
use smartplant::app::service::{ModeController, PassOutcome};
use smartplant::config::FirmwareConfig;
use smartplant::error::{Error, JoinError, PushError, SensorError};
use smartplant::fsm::StateId;
use smartplant::settings::{self, Field, Mode, SettingsRecord};

use crate::mock_hw::{
    MockCloud, MockNetwork, MockSensor, MockStore, MockSystem, RecordingSink, Shared, SystemCall,
};

fn committed_store() -> MockStore {
    let mut r = SettingsRecord::new();
    r.mode = Mode::WifiActive;
    r.set_field(Field::NetworkId, b"HomeNet");
    r.set_field(Field::NetworkSecret, b"hunter22");
    r.set_field(Field::AccountId, b"u-42");
    r.set_field(Field::DeviceId, b"ficus-7");
    MockStore::with_image(&settings::encode(&r))
}

struct Wake {
    net: MockNetwork,
    sensor: MockSensor,
    cloud: MockCloud,
    system: MockSystem,
    sink: RecordingSink,
    outcome: PassOutcome,
}

fn wake(config: FirmwareConfig, net: MockNetwork, sensor: MockSensor, cloud: MockCloud) -> Wake {
    let shared = Shared::leak();
    let store = committed_store();
    let mut w = Wake {
        net,
        sensor,
        cloud,
        system: MockSystem::new(),
        sink: RecordingSink::new(),
        outcome: PassOutcome::Continue,
    };
    let mut c = ModeController::new(config, shared.staged, shared.deferred);
    assert_eq!(c.boot(&store, &mut w.sink), StateId::TelemetryActive);
    w.outcome = c.run_telemetry(
        &mut w.net,
        &mut w.sensor,
        &mut w.cloud,
        &mut w.system,
        &mut w.sink,
    );
    w
}

const SLEEP: Duration = Duration::from_secs(600);

#[test]
fn one_push_per_wake_then_sleep() {
    let w = wake(
        FirmwareConfig::default(),
        MockNetwork::reachable(),
        MockSensor::reading(37),
        MockCloud::ok(),
    );

    assert_eq!(
        w.net.joins,
        vec![(
            "HomeNet".to_owned(),
            "hunter22".to_owned(),
            Some(Duration::from_secs(60))
        )]
    );
    assert_eq!(w.cloud.pushes, vec![("plants/u-42/ficus-7/value".to_owned(), 37)]);
    assert_eq!(w.system.calls, vec![SystemCall::DeepSleep(SLEEP)]);
    assert_eq!(w.outcome, PassOutcome::Slept(SLEEP));
    assert!(w.sink.contains(&AppEvent::TelemetryPushed { value: 37 }));
}

#[test]
fn push_failure_is_not_retried() {
    let w = wake(
        FirmwareConfig::default(),
        MockNetwork::reachable(),
        MockSensor::reading(12),
        MockCloud::failing(PushError::Network),
    );

    assert_eq!(w.cloud.pushes.len(), 1);
    assert!(w.sink.contains(&AppEvent::TelemetryAbandoned(Error::Push(
        PushError::Network
    ))));
    assert_eq!(w.system.calls, vec![SystemCall::DeepSleep(SLEEP)]);
}

#[test]
fn join_timeout_skips_the_push_and_sleeps() {
    let w = wake(
        FirmwareConfig::default(),
        MockNetwork::failing(JoinError::TimedOut),
        MockSensor::reading(12),
        MockCloud::ok(),
    );

    assert!(w.cloud.pushes.is_empty());
    assert_eq!(w.sensor.reads, 0);
    assert!(w.sink.contains(&AppEvent::TelemetryAbandoned(Error::Join(
        JoinError::TimedOut
    ))));
    assert_eq!(w.outcome, PassOutcome::Slept(SLEEP));
}

#[test]
fn sensor_failure_skips_the_push() {
    let mut sensor = MockSensor::reading(0);
    sensor.value = Err(SensorError::AdcReadFailed);
    let w = wake(
        FirmwareConfig::default(),
        MockNetwork::reachable(),
        sensor,
        MockCloud::ok(),
    );

    assert!(w.cloud.pushes.is_empty());
    assert_eq!(w.system.calls, vec![SystemCall::DeepSleep(SLEEP)]);
}

#[test]
fn zero_join_timeout_waits_unbounded() {
    let config = FirmwareConfig {
        join_timeout_secs: 0,
        ..FirmwareConfig::default()
    };
    let w = wake(
        config,
        MockNetwork::reachable(),
        MockSensor::reading(5),
        MockCloud::ok(),
    );
    assert_eq!(w.net.joins[0].2, None);
}

#[test]
fn sleep_interval_follows_config() {
    let config = FirmwareConfig {
        sleep_interval_secs: 30,
        ..FirmwareConfig::default()
    };
    let w = wake(
        config,
        MockNetwork::reachable(),
        MockSensor::reading(5),
        MockCloud::ok(),
    );
    assert_eq!(
        w.system.calls,
        vec![SystemCall::DeepSleep(Duration::from_secs(30))]
    );
}

#[test]
fn telemetry_is_a_no_op_in_provisioning_mode() {
    let shared = Shared::leak();
    let store = MockStore::blank();
    let mut sink = RecordingSink::new();
    let mut net = MockNetwork::reachable();
    let mut sensor = MockSensor::reading(1);
    let mut cloud = MockCloud::ok();
    let mut system = MockSystem::new();

    let mut c = ModeController::new(FirmwareConfig::default(), shared.staged, shared.deferred);
    c.boot(&store, &mut sink);
    let outcome = c.run_telemetry(&mut net, &mut sensor, &mut cloud, &mut system, &mut sink);

    assert_eq!(outcome, PassOutcome::Continue);
    assert!(net.joins.is_empty());
    assert!(system.calls.is_empty());
}

//! Integration tests for the BLE provisioning flow.
//!
//! Writes arrive through the registered inbound handler, are staged into
//! the working copy, and a `ssav` commit is persisted from the main-loop
//! pass followed by exactly one restart.

use smartplant::app::events::AppEvent;
use smartplant::app::service::{ModeController, PassOutcome};
use smartplant::config::FirmwareConfig;
use smartplant::error::StorageError;
use smartplant::fsm::StateId;
use smartplant::settings::{self, Field, Mode};

use crate::mock_hw::{MockChannel, MockStore, MockSystem, RecordingSink, Shared};

struct Rig {
    shared: Shared,
    store: MockStore,
    channel: MockChannel,
    system: MockSystem,
    sink: RecordingSink,
}

impl Rig {
    fn blank() -> Self {
        Self {
            shared: Shared::leak(),
            store: MockStore::blank(),
            channel: MockChannel::new(),
            system: MockSystem::new(),
            sink: RecordingSink::new(),
        }
    }

    fn controller(&mut self) -> ModeController<'static> {
        let mut c = ModeController::new(
            FirmwareConfig::default(),
            self.shared.staged,
            self.shared.deferred,
        );
        assert_eq!(c.boot(&self.store, &mut self.sink), StateId::Provisioning);
        c.start_provisioning(&mut self.channel, self.shared.inbound)
            .unwrap();
        c
    }

    fn pass(&mut self, c: &mut ModeController<'static>) -> PassOutcome {
        c.provisioning_pass(
            &mut self.store,
            &mut self.channel,
            &mut self.system,
            &mut self.sink,
        )
    }

    fn deliver_all(&self, msgs: &[&[u8]]) {
        for m in msgs {
            self.channel.deliver(m);
        }
    }
}

const FULL_SET: [&[u8]; 4] = [b"ssidHomeNet", b"passhunter22", b"usidu-42", b"plidficus-7"];

#[test]
fn full_provisioning_persists_and_restarts_once() {
    let mut rig = Rig::blank();
    let mut c = rig.controller();

    rig.deliver_all(&FULL_SET);
    rig.channel.deliver(b"ssav");

    assert_eq!(rig.pass(&mut c), PassOutcome::Restarted);
    assert_eq!(rig.system.restarts(), 1);
    assert_eq!(rig.store.writes, 1);

    let stored = settings::decode(&rig.store.image());
    assert_eq!(stored.mode, Mode::WifiActive);
    assert_eq!(stored.network_id.as_str(), "HomeNet");
    assert_eq!(stored.network_secret.as_str(), "hunter22");
    assert_eq!(stored.account_id.as_str(), "u-42");
    assert_eq!(stored.device_id.as_str(), "ficus-7");

    assert_eq!(rig.channel.notifications, vec![r#"{"commit":"ok"}"#.to_owned()]);
    assert!(rig.sink.contains(&AppEvent::SettingsCommitted));
}

#[test]
fn last_write_wins_per_field() {
    let mut rig = Rig::blank();
    let mut c = rig.controller();

    rig.deliver_all(&FULL_SET);
    rig.deliver_all(&[b"ssidFirst", b"ssidSecond"]);
    rig.channel.deliver(b"ssav");

    assert_eq!(rig.pass(&mut c), PassOutcome::Restarted);
    let stored = settings::decode(&rig.store.image());
    assert_eq!(stored.network_id.as_str(), "Second");
}

#[test]
fn nothing_is_written_before_commit() {
    let mut rig = Rig::blank();
    let mut c = rig.controller();

    rig.deliver_all(&FULL_SET);
    assert_eq!(rig.pass(&mut c), PassOutcome::Continue);
    assert_eq!(rig.store.writes, 0);
    assert!(rig.store.is_zeroed());
    assert!(rig.system.calls.is_empty());
}

#[test]
fn incomplete_commit_is_rejected_then_recovers() {
    let mut rig = Rig::blank();
    let mut c = rig.controller();

    rig.deliver_all(&[b"ssidHomeNet", b"passhunter22", b"usidu-42"]);
    rig.channel.deliver(b"ssav");

    assert_eq!(rig.pass(&mut c), PassOutcome::Continue);
    assert_eq!(rig.store.writes, 0);
    assert_eq!(rig.system.restarts(), 0);
    assert_eq!(
        rig.channel.notifications,
        vec![r#"{"commit":"rejected","missing":"device_id"}"#.to_owned()]
    );
    assert!(rig.sink.contains(&AppEvent::CommitRejected {
        missing: Field::DeviceId
    }));
    assert_eq!(rig.shared.staged.snapshot().mode, Mode::Unconfigured);

    rig.channel.deliver(b"plidficus-7");
    rig.channel.deliver(b"ssav");
    assert_eq!(rig.pass(&mut c), PassOutcome::Restarted);
    assert_eq!(settings::decode(&rig.store.image()).mode, Mode::WifiActive);
}

#[test]
fn failed_write_reports_and_keeps_running() {
    let mut rig = Rig::blank();
    rig.store.fail_writes = true;
    let mut c = rig.controller();

    rig.deliver_all(&FULL_SET);
    rig.channel.deliver(b"ssav");

    assert_eq!(rig.pass(&mut c), PassOutcome::Continue);
    assert_eq!(rig.system.restarts(), 0);
    assert_eq!(rig.channel.notifications, vec![r#"{"commit":"failed"}"#.to_owned()]);
    assert!(rig.sink.contains(&AppEvent::CommitFailed(StorageError::Io(-2))));
    assert_eq!(c.state(), StateId::Provisioning);
}

#[test]
fn commit_with_trailing_bytes_still_commits() {
    let mut rig = Rig::blank();
    let mut c = rig.controller();

    rig.deliver_all(&FULL_SET);
    rig.channel.deliver(b"ssavNOW");
    assert_eq!(rig.pass(&mut c), PassOutcome::Restarted);
}

#[test]
fn noise_is_ignored() {
    let mut rig = Rig::blank();
    let mut c = rig.controller();

    rig.deliver_all(&[b"", b"ss", b"SSIDHome", b"wifiX", b"\xff\xfe\x00\x01"]);

    assert!(rig.shared.deferred.is_empty());
    assert_eq!(rig.pass(&mut c), PassOutcome::Continue);
    assert_eq!(rig.shared.staged.snapshot(), settings::SettingsRecord::new());
}

#[test]
fn one_deferred_action_per_pass() {
    let mut rig = Rig::blank();
    rig.store.fail_writes = true;
    let mut c = rig.controller();

    rig.deliver_all(&FULL_SET);
    rig.deliver_all(&[b"ssav", b"ssav"]);
    assert_eq!(rig.shared.deferred.len(), 2);

    rig.pass(&mut c);
    assert_eq!(rig.shared.deferred.len(), 1);
    rig.pass(&mut c);
    assert!(rig.shared.deferred.is_empty());
    assert_eq!(rig.channel.notifications.len(), 2);
}

#[test]
fn overlong_values_are_truncated_to_field_width() {
    let mut rig = Rig::blank();
    let mut c = rig.controller();

    let mut long_ssid = b"ssid".to_vec();
    long_ssid.extend(std::iter::repeat_n(b'n', 40));
    rig.channel.deliver(&long_ssid);
    rig.deliver_all(&FULL_SET[1..]);
    rig.channel.deliver(b"ssav");

    assert_eq!(rig.pass(&mut c), PassOutcome::Restarted);
    let stored = settings::decode(&rig.store.image());
    assert_eq!(stored.network_id.len(), Field::NetworkId.max_len());
}

#[test]
fn channel_start_failure_is_reported() {
    let mut rig = Rig::blank();
    rig.channel.fail_start = true;
    let mut c = ModeController::new(
        FirmwareConfig::default(),
        rig.shared.staged,
        rig.shared.deferred,
    );
    c.boot(&rig.store, &mut rig.sink);
    assert!(c.start_provisioning(&mut rig.channel, rig.shared.inbound).is_err());
    assert!(!rig.channel.is_started());
}

#[test]
fn queued_commit_after_rejection_persists_active_mode() {
    let mut rig = Rig::blank();
    let mut c = rig.controller();

    rig.deliver_all(&[b"ssidHomeNet", b"passhunter22", b"usidu-42"]);
    rig.deliver_all(&[b"ssav", b"ssav"]);

    assert_eq!(rig.pass(&mut c), PassOutcome::Continue);
    assert_eq!(rig.shared.staged.snapshot().mode, Mode::Unconfigured);

    rig.channel.deliver(b"plidficus-7");
    assert_eq!(rig.pass(&mut c), PassOutcome::Restarted);

    let stored = settings::decode(&rig.store.image());
    assert_eq!(stored.mode, Mode::WifiActive);
    assert!(stored.is_telemetry_ready());
    assert_eq!(rig.system.restarts(), 1);
    assert_eq!(
        rig.channel.notifications.last().map(String::as_str),
        Some(r#"{"commit":"ok"}"#)
    );
}

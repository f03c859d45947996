//! Mode controller, the hexagonal core.
//!
//! [`ModeController`] owns the FSM and its context.  It decides the boot
//! mode from the stored record, runs deferred commits in provisioning
//! mode, runs one telemetry cycle per wake, and arbitrates the reset path.
//! All I/O flows through port traits injected at call sites.
//!
//! ```text
//!  PersistentStore ──▶ ┌────────────────────────┐ ──▶ EventSink
//!  ProvisioningChannel │     ModeController     │ ──▶ SystemPort
//!  NetworkJoin ◀────── │  FSM · staging · queue │
//!  CloudPush ◀──────── └────────────────────────┘
//! ```

use core::time::Duration;

use log::{error, info, warn};
use serde::Serialize;

use crate::config::FirmwareConfig;
use crate::events::{DeferredAction, DeferredActionQueue};
use crate::fsm::context::{FsmContext, StatusColour};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::settings::{self, Mode, SettingsRecord};

use super::events::AppEvent;
use super::ports::{
    CloudPush, EventSink, InboundMessageHandler, NetworkJoin, PersistentStore,
    ProvisioningChannel, SensorPort, SystemPort,
};
use super::reset::factory_reset;
use super::staging::StagedSettings;
use super::telemetry::TelemetryCycle;

/// What the main loop should do after a controller call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Keep looping.
    Continue,
    /// A restart was requested.
    Restarted,
    /// Deep sleep was requested for this long.
    Slept(Duration),
}

/// Reply sent back over the provisioning channel after a commit attempt.
#[derive(Debug, Serialize)]
struct CommitReply<'a> {
    commit: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing: Option<&'a str>,
}

// ───────────────────────────────────────────────────────────────
// ModeController
// ───────────────────────────────────────────────────────────────

pub struct ModeController<'a> {
    fsm: Fsm,
    ctx: FsmContext,
    config: FirmwareConfig,
    staged: &'a StagedSettings,
    deferred: &'a DeferredActionQueue,
}

impl<'a> ModeController<'a> {
    /// Construct the controller.  Does **not** read storage; call
    /// [`boot`](Self::boot) next.
    pub fn new(
        config: FirmwareConfig,
        staged: &'a StagedSettings,
        deferred: &'a DeferredActionQueue,
    ) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), StateId::BootDeciding),
            ctx: FsmContext::default(),
            config,
            staged,
            deferred,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load the stored record and decide the operating mode.
    ///
    /// An unreadable store is treated as an empty one.
    pub fn boot(&mut self, store: &impl PersistentStore, sink: &mut impl EventSink) -> StateId {
        let image = store.read_record().unwrap_or_else(|e| {
            warn!("Boot: settings unreadable ({}); treating as empty", e);
            [0u8; settings::RECORD_LEN]
        });
        let record = settings::decode(&image);
        info!(
            "Boot: mode={} network=\"{}\" account=\"{}\" device=\"{}\" secret={}B",
            record.mode,
            record.network_id,
            record.account_id,
            record.device_id,
            record.network_secret.len()
        );

        self.staged.load(record.clone());
        self.ctx = FsmContext::new(record);
        self.fsm.start(&mut self.ctx);
        self.step(sink);

        let state = self.state();
        sink.emit(&AppEvent::Booted(state));
        state
    }

    /// Bring up the provisioning channel.  Only valid in
    /// [`StateId::Provisioning`].
    pub fn start_provisioning(
        &mut self,
        channel: &mut impl ProvisioningChannel,
        handler: &'static (dyn InboundMessageHandler + Sync),
    ) -> crate::error::Result<()> {
        if self.state() != StateId::Provisioning {
            return Err(crate::error::Error::Config("not in provisioning mode"));
        }
        channel.start(handler)?;
        info!("Provisioning: advertising as \"{}\"", self.config.device_name);
        Ok(())
    }

    // ── Provisioning ──────────────────────────────────────────

    /// One main-loop pass: run at most one deferred action.
    pub fn provisioning_pass(
        &mut self,
        store: &mut impl PersistentStore,
        channel: &mut impl ProvisioningChannel,
        system: &mut impl SystemPort,
        sink: &mut impl EventSink,
    ) -> PassOutcome {
        if self.state() != StateId::Provisioning {
            return PassOutcome::Continue;
        }
        match self.deferred.pop() {
            Some(DeferredAction::Commit) => self.commit(store, channel, system, sink),
            None => PassOutcome::Continue,
        }
    }

    fn commit(
        &mut self,
        store: &mut impl PersistentStore,
        channel: &mut impl ProvisioningChannel,
        system: &mut impl SystemPort,
        sink: &mut impl EventSink,
    ) -> PassOutcome {
        let mut record = self.staged.snapshot();

        if let Some(missing) = record.missing_field() {
            warn!("Commit: rejected, {} is empty", missing);
            self.staged.set_mode(Mode::Unconfigured);
            notify_reply(
                channel,
                &CommitReply {
                    commit: "rejected",
                    missing: Some(missing.name()),
                },
            );
            sink.emit(&AppEvent::CommitRejected { missing });
            return PassOutcome::Continue;
        }

        // The dequeued action is the commit intent, whatever an earlier
        // rejection did to the working copy's mode.
        record.mode = Mode::WifiActive;
        self.staged.set_mode(Mode::WifiActive);

        match store.write_record(&settings::encode(&record)) {
            Ok(()) => {
                info!("Commit: settings persisted, restarting");
                notify_reply(
                    channel,
                    &CommitReply {
                        commit: "ok",
                        missing: None,
                    },
                );
                sink.emit(&AppEvent::SettingsCommitted);
                system.restart();
                PassOutcome::Restarted
            }
            Err(e) => {
                error!("Commit: write failed: {}", e);
                notify_reply(
                    channel,
                    &CommitReply {
                        commit: "failed",
                        missing: None,
                    },
                );
                sink.emit(&AppEvent::CommitFailed(e));
                PassOutcome::Continue
            }
        }
    }

    // ── Telemetry ─────────────────────────────────────────────

    /// Run the wake's single telemetry cycle, then deep sleep.  Only
    /// valid in [`StateId::TelemetryActive`].
    pub fn run_telemetry(
        &mut self,
        net: &mut impl NetworkJoin,
        sensor: &mut impl SensorPort,
        cloud: &mut impl CloudPush,
        system: &mut impl SystemPort,
        sink: &mut impl EventSink,
    ) -> PassOutcome {
        if self.state() != StateId::TelemetryActive {
            return PassOutcome::Continue;
        }
        // Outcome already logged and emitted by the cycle; sleep either way.
        match TelemetryCycle::new(&self.config).run(&self.ctx.settings, net, sensor, cloud, sink) {
            Ok(value) => info!("Telemetry: cycle complete ({})", value),
            Err(_) => info!("Telemetry: cycle abandoned, retrying next wake"),
        }

        let interval = Duration::from_secs(u64::from(self.config.sleep_interval_secs));
        info!("Telemetry: sleeping {} s", interval.as_secs());
        system.deep_sleep(interval);
        PassOutcome::Slept(interval)
    }

    // ── Reset ─────────────────────────────────────────────────

    /// A confirmed reset press: enter `ResettingDevice`, erase and restart.
    /// Ignored if a reset is already under way.
    pub fn request_reset(
        &mut self,
        store: &mut impl PersistentStore,
        system: &mut impl SystemPort,
        sink: &mut impl EventSink,
    ) -> PassOutcome {
        if self.state() == StateId::ResettingDevice {
            return PassOutcome::Continue;
        }
        self.ctx.reset_requested = true;
        self.step(sink);
        factory_reset(store, system, sink);
        PassOutcome::Restarted
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn status_colour(&self) -> StatusColour {
        self.ctx.status
    }

    /// Settings decoded at boot.
    pub fn settings(&self) -> &SettingsRecord {
        &self.ctx.settings
    }

    pub fn config(&self) -> &FirmwareConfig {
        &self.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn step(&mut self, sink: &mut impl EventSink) {
        if let Some(t) = self.fsm.tick(&mut self.ctx) {
            sink.emit(&AppEvent::StateChanged {
                from: t.from,
                to: t.to,
            });
        }
    }
}

fn notify_reply(channel: &mut impl ProvisioningChannel, reply: &CommitReply<'_>) {
    match serde_json::to_vec(reply) {
        Ok(body) => channel.notify(&body),
        Err(e) => warn!("Commit: reply encoding failed: {}", e),
    }
}

//! Smartplant firmware entry point
//!
//! Hexagonal architecture with two boot-selected modes and deep sleep.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BoardAdapter      LogEventSink   NvsStore     EspSystem       │
//! │  (Sensor+LED)      (EventSink)    (Persistent) (SystemPort)    │
//! │  WifiAdapter       BleAdapter     FirebaseCloud                │
//! │  (NetworkJoin)     (Provisioning) (CloudPush)                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            ModeController (pure logic)                 │    │
//! │  │  FSM · staging cell · deferred queue · telemetry       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  ResetGuard (ISR edge + settle) · deep sleep (timer + ext0)    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::time::Duration;

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;

use smartplant::adapters::ble::BleAdapter;
use smartplant::adapters::cloud::FirebaseCloud;
use smartplant::adapters::hardware::BoardAdapter;
use smartplant::adapters::log_sink::LogEventSink;
use smartplant::adapters::nvs::NvsStore;
use smartplant::adapters::time::MonotonicClock;
use smartplant::adapters::wifi::WifiAdapter;
use smartplant::app::ports::{PersistentStore, StatusIndicator, SystemPort};
use smartplant::app::provisioning::ProvisioningInbound;
use smartplant::app::reset::factory_reset;
use smartplant::app::service::{ModeController, PassOutcome};
use smartplant::app::staging::StagedSettings;
use smartplant::config::FirmwareConfig;
use smartplant::drivers::reset_guard::{RESET_EDGE, ResetGuard, ResetPin};
use smartplant::drivers::status_led::StatusLed;
use smartplant::drivers::task_pin::{self, Core};
use smartplant::drivers::hw_init;
use smartplant::events::DeferredActionQueue;
use smartplant::fsm::StateId;
use smartplant::fsm::context::StatusColour;
use smartplant::pins;
use smartplant::power::{self, EspSystem, WakeReason};
use smartplant::sensors::moisture::{Calibration, MoistureSensor};

// ── Shared with the BLE callback ──────────────────────────────
//
// The Bluedroid task only stages fields and queues a commit; the main
// loop does every flash write.

static STAGED: StagedSettings = StagedSettings::new();
static DEFERRED: DeferredActionQueue = DeferredActionQueue::new();
static INBOUND: ProvisioningInbound<'static> = ProvisioningInbound::new(&STAGED, &DEFERRED);

const RESET_WATCHER_STACK_KB: usize = 4;
const RESET_WATCHER_PRIORITY: u8 = 3;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Smartplant v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = FirmwareConfig::default();
    config.validate()?;

    let mut system = EspSystem::new();
    let mut sink = LogEventSink::new();
    let clock = MonotonicClock::new();

    // ── 2. Initialise hardware peripherals ────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        error!("HAL init failed: {}; halting", e);
        system.halt();
        return Ok(());
    }
    if let Err(e) = hw_init::init_isr_service() {
        warn!("ISR service init failed: {}; reset input disabled", e);
    }

    let mut board = BoardAdapter::new(
        MoistureSensor::new(Calibration {
            dry_raw: config.moisture_dry_raw,
            wet_raw: config.moisture_wet_raw,
        }),
        StatusLed::new(),
    );
    board.show(StatusColour::Booting);

    // ── 3. Wake reason ────────────────────────────────────────
    let wake = power::wake_reason();
    info!("Boot: wake reason {:?}", wake);
    if wake == WakeReason::ResetInput {
        // The press that woke us is already past its falling edge.
        RESET_EDGE.record(clock.now_ms());
    }

    // ── 4. Settings region ────────────────────────────────────
    let mut store = NvsStore::new();
    if let Err(e) = store.begin(usize::from(config.storage_capacity)) {
        error!("Storage init failed: {}; halting", e);
        board.show(StatusColour::Alert);
        system.halt();
        return Ok(());
    }

    // ── 5. Boot decision ──────────────────────────────────────
    let mut controller = ModeController::new(config.clone(), &STAGED, &DEFERRED);
    let state = controller.boot(&store, &mut sink);
    board.show(controller.status_colour());

    match state {
        StateId::Provisioning => {
            run_provisioning(&mut controller, store, &mut board, &mut system, &mut sink, &clock);
        }
        StateId::TelemetryActive => {
            let peripherals = Peripherals::take()?;
            let sysloop = EspSystemEventLoop::take()?;
            spawn_reset_watcher(&config, store);

            let mut cloud = FirebaseCloud::new(&config.cloud_host, &config.cloud_auth);
            match WifiAdapter::new(peripherals.modem, sysloop) {
                Ok(mut wifi) => {
                    controller.run_telemetry(&mut wifi, &mut board, &mut cloud, &mut system, &mut sink);
                }
                Err(e) => {
                    error!("WiFi: driver unavailable ({}), sleeping", e);
                    system.deep_sleep(Duration::from_secs(u64::from(config.sleep_interval_secs)));
                }
            }
        }
        other => {
            error!("Boot: unexpected state {:?}; halting", other);
            board.show(StatusColour::Alert);
            system.halt();
        }
    }

    Ok(())
}

// ── Provisioning mode ─────────────────────────────────────────

fn run_provisioning(
    controller: &mut ModeController<'_>,
    mut store: NvsStore,
    board: &mut BoardAdapter,
    system: &mut EspSystem,
    sink: &mut LogEventSink,
    clock: &MonotonicClock,
) {
    let mut ble = BleAdapter::new(controller.config().device_name.clone());
    if let Err(e) = controller.start_provisioning(&mut ble, &INBOUND) {
        error!("Provisioning: channel start failed ({}), restarting", e);
        system.restart();
        return;
    }

    let mut guard = ResetGuard::new(
        ResetPin::new(pins::RESET_GPIO),
        &RESET_EDGE,
        controller.config().reset_settle_ms,
    );
    let pass_interval = Duration::from_millis(u64::from(controller.config().loop_interval_ms));

    info!("System ready. Entering provisioning loop.");
    loop {
        if let Some(confirmed) = guard.poll(clock.now_ms()) {
            info!("Reset: confirmed after {} ms", confirmed.held_ms);
            board.show(StatusColour::Alert);
            controller.request_reset(&mut store, system, sink);
            return;
        }

        if controller.provisioning_pass(&mut store, &mut ble, system, sink) == PassOutcome::Restarted {
            return;
        }

        std::thread::sleep(pass_interval);
    }
}

// ── Telemetry-mode reset watcher ──────────────────────────────
//
// The telemetry cycle blocks in join/push, so the reset input is watched
// from its own task.  A confirmed press erases and restarts, abandoning
// whatever the main task is doing.

fn spawn_reset_watcher(config: &FirmwareConfig, mut store: NvsStore) {
    let settle_ms = config.reset_settle_ms;
    let poll = Duration::from_millis(u64::from(config.reset_poll_ms));

    let spawned = task_pin::spawn_on_core(
        Core::App,
        RESET_WATCHER_PRIORITY,
        RESET_WATCHER_STACK_KB,
        "reset-guard\0",
        move || {
            let clock = MonotonicClock::new();
            let mut guard = ResetGuard::new(ResetPin::new(pins::RESET_GPIO), &RESET_EDGE, settle_ms);
            let mut system = EspSystem::new();
            let mut sink = LogEventSink::new();
            let mut led = StatusLed::new();
            loop {
                if let Some(confirmed) = guard.poll(clock.now_ms()) {
                    info!("Reset: confirmed after {} ms", confirmed.held_ms);
                    led.set(StatusColour::Alert);
                    factory_reset(&mut store, &mut system, &mut sink);
                    return;
                }
                std::thread::sleep(poll);
            }
        },
    );
    if let Err(e) = spawned {
        warn!("Reset: watcher task not started ({}); reset input inactive this wake", e);
    }
}

//! Concrete state handler functions and table builder.
//!
//! ```text
//!                     ┌──[telemetry-ready]──▶ TELEMETRY_ACTIVE
//!  BOOT_DECIDING ─────┤
//!                     └──[otherwise]────────▶ PROVISIONING
//!
//!  Any state ──[reset confirmed]──▶ RESETTING_DEVICE (terminal, restarts)
//! ```
//!
//! A successful commit leaves PROVISIONING by restarting the chip, and a
//! telemetry cycle leaves TELEMETRY_ACTIVE by deep sleep.  Neither is an
//! in-table transition: the next boot re-enters BOOT_DECIDING.

use super::context::{FsmContext, StatusColour};
use super::{StateDescriptor, StateId};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // 0: BootDeciding
        StateDescriptor {
            id: StateId::BootDeciding,
            name: "BootDeciding",
            on_enter: Some(boot_enter),
            on_exit: None,
            on_update: boot_update,
        },
        // 1: Provisioning
        StateDescriptor {
            id: StateId::Provisioning,
            name: "Provisioning",
            on_enter: Some(provisioning_enter),
            on_exit: None,
            on_update: provisioning_update,
        },
        // 2: TelemetryActive
        StateDescriptor {
            id: StateId::TelemetryActive,
            name: "TelemetryActive",
            on_enter: Some(telemetry_enter),
            on_exit: None,
            on_update: telemetry_update,
        },
        // 3: ResettingDevice
        StateDescriptor {
            id: StateId::ResettingDevice,
            name: "ResettingDevice",
            on_enter: Some(resetting_enter),
            on_exit: None,
            on_update: resetting_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  BOOT_DECIDING state
// ═══════════════════════════════════════════════════════════════════════════

fn boot_enter(ctx: &mut FsmContext) {
    ctx.status = StatusColour::Booting;
    info!("BOOT: stored mode = {}", ctx.settings.mode);
}

fn boot_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.reset_requested {
        return Some(StateId::ResettingDevice);
    }
    if ctx.settings.is_telemetry_ready() {
        return Some(StateId::TelemetryActive);
    }
    if let Some(field) = ctx.settings.missing_field() {
        if ctx.settings.mode == crate::settings::Mode::WifiActive {
            warn!("BOOT: record tagged wifi but {} is empty; provisioning", field);
        }
    }
    Some(StateId::Provisioning)
}

// ═══════════════════════════════════════════════════════════════════════════
//  PROVISIONING state
// ═══════════════════════════════════════════════════════════════════════════

fn provisioning_enter(ctx: &mut FsmContext) {
    ctx.status = StatusColour::Provisioning;
    info!("PROVISIONING: waiting for settings over BLE");
}

fn provisioning_update(ctx: &mut FsmContext) -> Option<StateId> {
    ctx.reset_requested.then_some(StateId::ResettingDevice)
}

// ═══════════════════════════════════════════════════════════════════════════
//  TELEMETRY_ACTIVE state
// ═══════════════════════════════════════════════════════════════════════════

fn telemetry_enter(ctx: &mut FsmContext) {
    ctx.status = StatusColour::Telemetry;
    info!("TELEMETRY: reporting as device {}", ctx.settings.device_id);
}

fn telemetry_update(ctx: &mut FsmContext) -> Option<StateId> {
    ctx.reset_requested.then_some(StateId::ResettingDevice)
}

// ═══════════════════════════════════════════════════════════════════════════
//  RESETTING_DEVICE state
// ═══════════════════════════════════════════════════════════════════════════

fn resetting_enter(ctx: &mut FsmContext) {
    ctx.status = StatusColour::Alert;
    warn!("RESET: factory reset confirmed");
}

fn resetting_update(_ctx: &mut FsmContext) -> Option<StateId> {
    None
}

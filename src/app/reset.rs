//! Factory reset: erase the settings region and restart.
//!
//! Shared by the controller (provisioning loop) and the reset watcher task
//! that runs beside a blocking telemetry cycle.

use log::{error, warn};

use super::events::AppEvent;
use super::ports::{EventSink, PersistentStore, SystemPort};

/// Erase every stored setting, then restart.  The restart happens even if
/// the erase fails; the next boot decides from whatever is left.
pub fn factory_reset(
    store: &mut impl PersistentStore,
    system: &mut impl SystemPort,
    sink: &mut impl EventSink,
) {
    sink.emit(&AppEvent::FactoryReset);
    match store.erase_all() {
        Ok(()) => warn!("Reset: settings erased, restarting"),
        Err(e) => error!("Reset: erase failed ({}), restarting anyway", e),
    }
    system.restart();
}

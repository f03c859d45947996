//! Application core: pure domain logic, zero I/O.
//!
//! Boot-mode decision, provisioning commits, the telemetry cycle and the
//! factory-reset path.  All interaction with hardware happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod provisioning;
pub mod reset;
pub mod service;
pub mod staging;
pub mod telemetry;

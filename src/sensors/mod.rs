//! Sensor drivers.  The node carries a single analog soil-moisture probe.

pub mod moisture;

//! Shared mutable context threaded through every FSM handler.
//!
//! State handlers read the boot-loaded settings and the reset request from
//! here, and write the status colour the main loop shows on the LED.

use crate::settings::SettingsRecord;

// ---------------------------------------------------------------------------
// Status colour (written by state handlers; shown by the main loop)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusColour {
    #[default]
    Off,
    /// Magenta: deciding the boot mode.
    Booting,
    /// Green: advertising for provisioning.
    Provisioning,
    /// Blue: telemetry cycle.
    Telemetry,
    /// Red: factory reset in progress or fatal init failure.
    Alert,
}

impl StatusColour {
    /// On/off levels for the (R, G, B) channels.
    pub const fn levels(self) -> (bool, bool, bool) {
        match self {
            Self::Off => (false, false, false),
            Self::Booting => (true, false, true),
            Self::Provisioning => (false, true, false),
            Self::Telemetry => (false, false, true),
            Self::Alert => (true, false, false),
        }
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
#[derive(Debug, Default)]
pub struct FsmContext {
    // -- Inputs --
    /// Settings decoded from the store at boot.  Never changes afterwards;
    /// a successful commit restarts the device.
    pub settings: SettingsRecord,
    /// Set once the reset guard has confirmed a press.
    pub reset_requested: bool,

    // -- Outputs --
    pub status: StatusColour,
}

impl FsmContext {
    pub fn new(settings: SettingsRecord) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }
}

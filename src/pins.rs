//! GPIO / peripheral pin assignments for the Smartplant node board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Status LED (discrete RGB, common cathode)
// ---------------------------------------------------------------------------

pub const LED_R_GPIO: i32 = 25;
pub const LED_G_GPIO: i32 = 26;
pub const LED_B_GPIO: i32 = 27;

// ---------------------------------------------------------------------------
// Factory-reset input (active-low, internal pull-up)
// ---------------------------------------------------------------------------

/// Momentary reset button. Also the ext0 deep-sleep wake source.
pub const RESET_GPIO: i32 = 14;

/// Level that means "pressed".
pub const RESET_ACTIVE_LEVEL: bool = false;

// ---------------------------------------------------------------------------
// Soil-moisture probe (ADC1)
// ---------------------------------------------------------------------------

/// Capacitive moisture probe output.
pub const MOISTURE_ADC_GPIO: i32 = 34;
/// ADC1 channel wired to GPIO 34 on the classic ESP32.
pub const MOISTURE_ADC_CHANNEL: u32 = 6;
/// ADC attenuation (12 dB → 0 – 3.1 V range).
pub const MOISTURE_ADC_ATTEN: u32 = 3;

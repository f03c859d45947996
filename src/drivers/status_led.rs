//! RGB status LED driver.
//!
//! Three plain GPIO outputs drive a common-cathode RGB LED.  Only the
//! on/off mixes in [`StatusColour`] are shown, so no PWM is needed.
//!
//! On ESP-IDF: writes the three GPIO levels via hw_init.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;
use crate::fsm::context::StatusColour;
use crate::pins;

pub struct StatusLed {
    current: StatusColour,
}

impl StatusLed {
    pub fn new() -> Self {
        Self {
            current: StatusColour::Off,
        }
    }

    pub fn set(&mut self, colour: StatusColour) {
        let (r, g, b) = colour.levels();
        hw_init::gpio_write(pins::LED_R_GPIO, r);
        hw_init::gpio_write(pins::LED_G_GPIO, g);
        hw_init::gpio_write(pins::LED_B_GPIO, b);
        self.current = colour;
    }

    pub fn off(&mut self) {
        self.set(StatusColour::Off);
    }

    pub fn current(&self) -> StatusColour {
        self.current
    }
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}

//! Debounced factory-reset input.
//!
//! ## Hardware
//!
//! Active-low momentary switch with internal pull-up.  The GPIO fires on
//! the falling edge; the ISR records a timestamp into a [`ResetEdge`]
//! atomic and [`ResetGuard::poll`] (called from a task at a few tens of
//! milliseconds) runs the confirmation state machine:
//!
//! ```text
//!  IDLE ──[edge, pin low]──▶ SETTLING ──[settle elapsed, pin low]──▶ TRIGGERED
//!   ▲                           │
//!   └──[pin high at edge]───────┴──[settle elapsed, pin high]
//! ```
//!
//! A press counts only if the pin reads low both when the edge is seen and
//! again once the settle interval has passed.  After triggering, the edge
//! source is disarmed so a reset in progress cannot be re-triggered.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embedded_hal::digital::{ErrorType, InputPin};
use log::{info, warn};

// ───────────────────────────────────────────────────────────────
// Edge latch (ISR → task)
// ───────────────────────────────────────────────────────────────

/// Falling-edge latch shared between an ISR and the polling task.
pub struct ResetEdge {
    /// Milliseconds of the latest unconsumed edge, 0 = none.
    edge_ms: AtomicU32,
    armed: AtomicBool,
}

impl ResetEdge {
    pub const fn new() -> Self {
        Self {
            edge_ms: AtomicU32::new(0),
            armed: AtomicBool::new(true),
        }
    }

    /// Latch an edge.  ISR-safe.  Ignored once disarmed.
    pub fn record(&self, now_ms: u32) {
        if self.armed.load(Ordering::Acquire) {
            self.edge_ms.store(now_ms.max(1), Ordering::Release);
        }
    }

    /// Consume the pending edge, if any.
    fn take(&self) -> Option<u32> {
        match self.edge_ms.swap(0, Ordering::AcqRel) {
            0 => None,
            ms => Some(ms),
        }
    }

    fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
        self.edge_ms.store(0, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}

impl Default for ResetEdge {
    fn default() -> Self {
        Self::new()
    }
}

/// Edge latch fed by the reset GPIO interrupt.
pub static RESET_EDGE: ResetEdge = ResetEdge::new();

/// ISR handler.  Register this on the reset GPIO falling edge.
pub fn reset_isr_handler(now_ms: u32) {
    RESET_EDGE.record(now_ms);
}

// ───────────────────────────────────────────────────────────────
// Guard
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardState {
    Idle,
    Settling { since_ms: u32 },
    Triggered,
}

/// Emitted once per confirmed press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetConfirmed {
    pub held_ms: u32,
}

pub struct ResetGuard<'e, P> {
    pin: P,
    edge: &'e ResetEdge,
    settle_ms: u32,
    state: GuardState,
}

impl<'e, P: InputPin> ResetGuard<'e, P> {
    pub fn new(pin: P, edge: &'e ResetEdge, settle_ms: u32) -> Self {
        Self {
            pin,
            edge,
            settle_ms,
            state: GuardState::Idle,
        }
    }

    /// Advance the state machine.  `now_ms` must share the ISR's time base.
    pub fn poll(&mut self, now_ms: u32) -> Option<ResetConfirmed> {
        match self.state {
            GuardState::Triggered => None,

            GuardState::Idle => {
                let edge_ms = self.edge.take()?;
                if self.pressed() {
                    // Never start in the future relative to this poll.
                    let since_ms = if now_ms.wrapping_sub(edge_ms) <= self.settle_ms {
                        edge_ms
                    } else {
                        now_ms
                    };
                    info!("Reset: press detected, confirming in {} ms", self.settle_ms);
                    self.state = GuardState::Settling { since_ms };
                }
                None
            }

            GuardState::Settling { since_ms } => {
                // Bounces while settling carry no information.
                let _ = self.edge.take();

                let held_ms = now_ms.wrapping_sub(since_ms);
                if held_ms < self.settle_ms {
                    return None;
                }
                if self.pressed() {
                    self.state = GuardState::Triggered;
                    self.edge.disarm();
                    Some(ResetConfirmed { held_ms })
                } else {
                    info!("Reset: released before {} ms, ignored", self.settle_ms);
                    self.state = GuardState::Idle;
                    None
                }
            }
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.state == GuardState::Triggered
    }

    fn pressed(&mut self) -> bool {
        match self.pin.is_low() {
            Ok(low) => low,
            Err(_) => {
                warn!("Reset: pin read failed, treating as released");
                false
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// GPIO pin
// ───────────────────────────────────────────────────────────────

/// The board's reset input, read through the raw GPIO helper.
#[derive(Debug, Clone, Copy)]
pub struct ResetPin {
    gpio: i32,
}

impl ResetPin {
    pub const fn new(gpio: i32) -> Self {
        Self { gpio }
    }
}

impl ErrorType for ResetPin {
    type Error = core::convert::Infallible;
}

impl InputPin for ResetPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(crate::drivers::hw_init::gpio_read(self.gpio))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!crate::drivers::hw_init::gpio_read(self.gpio))
    }
}

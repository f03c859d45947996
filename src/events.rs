//! Deferred actions: work requested from the BLE callback, run on the main loop.
//!
//! The GATT write callback runs on the Bluetooth host task and must not
//! block on flash or restart the chip.  It enqueues a [`DeferredAction`]
//! instead; the main loop drains at most one per pass.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │ GATT write   │────▶│ DeferredAction   │────▶│  Main loop   │
//! │ (BT task)    │     │ queue (bounded)  │     │  (consumer)  │
//! └──────────────┘     └──────────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::error;

/// Maximum number of pending actions.
pub const DEFERRED_QUEUE_CAP: usize = 4;

/// Work that must leave the callback context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Validate the working copy, persist it and restart.
    Commit,
}

/// Bounded FIFO between the callback context and the main loop.
///
/// Any number of producers, one consumer.  A full queue drops the new
/// action and logs it; earlier actions are kept.
pub struct DeferredActionQueue {
    channel: Channel<CriticalSectionRawMutex, DeferredAction, DEFERRED_QUEUE_CAP>,
    dropped: AtomicU32,
}

impl DeferredActionQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue `action`.  Returns `false` if it was dropped.
    pub fn push(&self, action: DeferredAction) -> bool {
        match self.channel.try_send(action) {
            Ok(()) => true,
            Err(TrySendError::Full(action)) => {
                let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                error!("Deferred: queue full, dropped {:?} ({} total)", action, n);
                false
            }
        }
    }

    /// Dequeue the oldest pending action.
    pub fn pop(&self) -> Option<DeferredAction> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Actions lost to a full queue since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for DeferredActionQueue {
    fn default() -> Self {
        Self::new()
    }
}

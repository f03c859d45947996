//! Function-pointer finite state machine engine.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌─────────────────┬───────────┬──────────┬─────────────────┐ │
//! │  │ StateId         │ on_enter  │ on_exit  │ on_update       │ │
//! │  ├─────────────────┼───────────┼──────────┼─────────────────┤ │
//! │  │ BootDeciding    │ fn(ctx)   │ -        │ fn(ctx)->Option │ │
//! │  │ Provisioning    │ fn(ctx)   │ -        │ fn(ctx)->Option │ │
//! │  │ TelemetryActive │ fn(ctx)   │ -        │ fn(ctx)->Option │ │
//! │  │ ResettingDevice │ fn(ctx)   │ -        │ fn(ctx)->Option │ │
//! │  └─────────────────┴───────────┴──────────┴─────────────────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all operating modes.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    BootDeciding = 0,
    Provisioning = 1,
    TelemetryActive = 2,
    ResettingDevice = 3,
}

impl StateId {
    /// Total number of states; sizes the table array.
    pub const COUNT: usize = 4;
}

// ---------------------------------------------------------------------------
// Handler signatures
// ---------------------------------------------------------------------------

/// `on_enter` / `on_exit` action.
pub type StateActionFn = fn(&mut FsmContext);

/// Per-tick decision.  `Some(next)` leaves the current state.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

/// A state change performed by [`Fsm::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: StateId,
    pub to: StateId,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: StateId,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial,
        }
    }

    /// Enter the initial state.  Call once, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        let row = self.row(self.current);
        info!("FSM: entering {}", row.name);
        if let Some(enter) = row.on_enter {
            enter(ctx);
        }
    }

    /// Run the current state's update and follow any transition it asks
    /// for.  A request to re-enter the current state is ignored.
    pub fn tick(&mut self, ctx: &mut FsmContext) -> Option<Transition> {
        let next = (self.row(self.current).on_update)(ctx)?;
        if next == self.current {
            return None;
        }

        let from = self.current;
        info!("FSM: {} -> {}", self.row(from).name, self.row(next).name);
        if let Some(exit) = self.row(from).on_exit {
            exit(ctx);
        }
        self.current = next;
        if let Some(enter) = self.row(next).on_enter {
            enter(ctx);
        }
        Some(Transition { from, to: next })
    }

    pub fn current_state(&self) -> StateId {
        self.current
    }

    pub fn state_name(&self) -> &'static str {
        self.row(self.current).name
    }

    fn row(&self, id: StateId) -> &StateDescriptor {
        &self.table[id as usize]
    }
}

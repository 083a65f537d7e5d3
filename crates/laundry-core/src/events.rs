//! Core events emitted by the engine

use laundry_api::{Alert, MachineSlot, MachineType};

/// Where a slot change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A local claim, release or extend
    Local,
    /// The countdown reached zero on this client
    Countdown,
    /// A change-feed record or the initial load
    Remote,
    /// An overdue cycle completed at its projected end
    Correction,
    /// The auto-release scheduler
    Scheduler,
}

/// Events emitted by the core engine
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// The visible state of a machine changed
    SlotChanged {
        machine: MachineType,
        slot: MachineSlot,
        origin: ChangeOrigin,
    },

    /// An alert should be raised
    Alert(Alert),

    /// A background write (expiry, correction) did not persist
    WriteFailed { machine: MachineType, reason: String },
}

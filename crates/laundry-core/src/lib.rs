//! Reservation engine for the shared laundry machines
//!
//! This crate contains:
//! - The time model (remaining cycle and pickup-window time from timestamps)
//! - The slot state machine (Available -> InUse -> Complete -> Available)
//! - The engine holding confirmed and tentative state per machine
//! - Replication: wire-row translation and reconciliation with the store
//! - Notification thresholds with one-shot flags
//! - The auto-release scheduler pass

mod countdown;
mod engine;
mod events;
mod notify;
pub mod replication;
mod scheduler;
pub mod slot;
pub mod timing;

pub use countdown::*;
pub use engine::*;
pub use events::*;
pub use notify::*;
pub use replication::TranslateError;
pub use scheduler::*;

use laundry_api::{MachineStatus, MachineType};
use thiserror::Error;

/// Why a reservation operation was refused or did not persist
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    #[error("{machine} cycles must be between 1 and {} minutes (asked for {requested} seconds)", .max / 60)]
    InvalidDuration {
        machine: MachineType,
        requested: u64,
        max: u64,
    },

    #[error("the {machine} belongs to {owner_name}")]
    NotOwner {
        machine: MachineType,
        owner_name: String,
    },

    #[error("the {machine} is already in use by {owner_name}")]
    NotAvailable {
        machine: MachineType,
        owner_name: String,
    },

    #[error("cannot {operation} the {machine} while it is {status}")]
    InvalidTransition {
        machine: MachineType,
        status: MachineStatus,
        operation: &'static str,
    },

    #[error("the {machine} cycle still has {remaining} seconds to go")]
    NotDue { machine: MachineType, remaining: u64 },

    #[error("the {machine} pickup window still has {remaining} seconds to go")]
    AutoReleaseNotDue { machine: MachineType, remaining: u64 },

    #[error("could not save the {machine} change, please retry: {reason}")]
    StoreWriteFailed {
        machine: MachineType,
        reason: String,
        /// Another writer changed the row first
        conflict: bool,
    },

    #[error("could not load machine state: {0}")]
    FetchFailed(String),
}

pub type ReservationResult<T> = Result<T, ReservationError>;

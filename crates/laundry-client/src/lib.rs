//! Terminal client for the shared laundry room
//!
//! The `laundry` binary wires a [`ClientSession`] to stdin, the change feed
//! and a 1 Hz countdown. `laundry-reaper` runs the auto-release scheduler.

mod commands;
mod session;

pub use commands::*;
pub use session::*;

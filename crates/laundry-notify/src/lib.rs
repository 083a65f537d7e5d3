//! Alert delivery for the laundry tracker
//!
//! This crate defines the capability-checked interface to the desktop's
//! notification service and the in-process alert queue it degrades to.
//! Deciding *when* an alert fires lives in `laundry-core`.

mod capabilities;
mod mock;
mod notify_send;
mod queue;
mod strategy;
mod traits;

pub use capabilities::*;
pub use mock::*;
pub use notify_send::*;
pub use queue::*;
pub use strategy::*;
pub use traits::*;

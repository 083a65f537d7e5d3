//! Shared types for the laundry tracker
//!
//! This crate defines the vocabulary every other crate speaks:
//! - Machines, slot state and identities
//! - The durable store's row and change-feed shapes
//! - Alerts raised by the notification engine

mod alerts;
mod row;
mod types;

pub use alerts::*;
pub use row::*;
pub use types::*;

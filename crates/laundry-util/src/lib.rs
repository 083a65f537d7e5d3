//! Shared utilities for the laundry tracker
//!
//! This crate provides:
//! - ID types (UserId, AlertId)
//! - Time utilities (mockable wall clock, countdown formatting)
//! - Write coalescing for the durable store
//! - Default paths for config, data and the shared store

mod coalesce;
mod ids;
mod paths;
mod time;

pub use coalesce::*;
pub use ids::*;
pub use paths::*;
pub use time::*;

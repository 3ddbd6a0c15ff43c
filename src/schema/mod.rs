//! Activity wire format
//!
//! This module defines the loosely typed records the remote store sends and
//! the adapter that turns them into typed activities.

mod raw_activity;
mod adapter;

pub use raw_activity::*;
pub use adapter::*;

//! Common types, traits, and error definitions for rust_footstep_planning
//!
//! This module provides the foundational building blocks used across
//! the footstep planner and the walking state machine.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;

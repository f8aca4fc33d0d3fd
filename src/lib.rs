//! RustFootstepPlanning - biped footstep planning in Rust
//!
//! This crate plans footstep sequences for walking robots over terrain
//! given as planar regions, using a Monte-Carlo graph search over a
//! discrete foothold lattice.

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod footstep_planning;
pub mod mission_planning;

// Re-export common types for convenience
pub use common::{Point2D, Pose2D, RobotSide, SideDependent};
pub use common::FootstepPlanner;
pub use common::{PlannerError, PlannerResult};
pub use footstep_planning::{
    FootstepGraphSearchEngine, FootstepPlan, FootstepPlannerConfig, PlanSlot, PlannerRequest,
};

//! Utility modules for rust_footstep_planning

pub mod visualization;

pub use visualization::{colors, FootstepPlotter, OutlineStyle};

//! Mission-level planning on top of the footstep planner

pub mod continuous_walking;

pub use continuous_walking::{
    ContinuousWalkingConfig, ContinuousWalkingPlanner, FootstepStatus, WalkingEvent, WalkingState,
    WalkingStatistics,
};

//! Common traits defining interfaces for footstep planners

use crate::common::error::PlannerError;
use crate::footstep_planning::{FootstepPlan, PlannerRequest};

/// Trait for footstep planning algorithms
pub trait FootstepPlanner {
    /// Plan a footstep sequence from the request's start stance toward its goal
    fn plan(&mut self, request: &PlannerRequest) -> Result<FootstepPlan, PlannerError>;

    /// Drop all search state so the next call starts a fresh session
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Pose2D, RobotSide, SideDependent};
    use nalgebra::Isometry3;

    // Test that traits compile correctly
    struct DummyPlanner;

    impl FootstepPlanner for DummyPlanner {
        fn plan(&mut self, _request: &PlannerRequest) -> Result<FootstepPlan, PlannerError> {
            Ok(FootstepPlan::empty())
        }

        fn reset(&mut self) {}
    }

    #[test]
    fn test_footstep_planner_trait() {
        let mut planner = DummyPlanner;
        let request = PlannerRequest::new(
            SideDependent::new(Isometry3::identity(), Isometry3::identity()),
            RobotSide::Left,
            Pose2D::new(1.0, 0.0, 0.0),
        );
        let result = planner.plan(&request);
        assert!(result.is_ok());
        assert!(result.unwrap().is_empty());
    }
}

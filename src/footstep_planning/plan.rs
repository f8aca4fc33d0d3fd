//! Planner input and output

use std::fmt;
use std::sync::Arc;

use nalgebra::Isometry3;

use crate::common::{PlannerError, PlannerResult, Pose2D, RobotSide, SideDependent};

use super::lattice::FootstepNode;
use super::polygon::ConvexPolygon2D;
use super::terrain::TerrainModel;

/// One step of a footstep plan
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFootstep {
    pub side: RobotSide,
    pub node: FootstepNode,
    /// Snapped sole pose in world
    pub pose: Isometry3<f64>,
    /// Supported part of the sole, in the sole frame
    pub foothold: ConvexPolygon2D,
    /// Time from plan start at which the foot touches down [s]
    pub arrival_time: f64,
}

impl PlannedFootstep {
    pub fn planar_pose(&self) -> Pose2D {
        Pose2D::from_isometry(&self.pose)
    }
}

/// Ordered footsteps from the current stance toward the goal
///
/// An empty plan is a normal result: no progress was found, or the robot
/// already stands at the goal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FootstepPlan {
    pub steps: Vec<PlannedFootstep>,
    /// Score the planner assigned to this plan
    pub value: f64,
    /// Whether the last step lies within the goal margin
    pub reached_goal: bool,
}

impl FootstepPlan {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlannedFootstep> {
        self.steps.iter()
    }

    pub fn last(&self) -> Option<&PlannedFootstep> {
        self.steps.last()
    }

    /// First `max_steps` steps; the goal only counts as reached if the cut
    /// keeps the final step
    pub fn limited(&self, max_steps: usize) -> FootstepPlan {
        if max_steps >= self.steps.len() {
            return self.clone();
        }
        FootstepPlan {
            steps: self.steps[..max_steps].to_vec(),
            value: self.value,
            reached_goal: false,
        }
    }

    /// Arrival time of the last step [s]
    pub fn total_duration(&self) -> f64 {
        self.steps.last().map_or(0.0, |s| s.arrival_time)
    }
}

impl<'a> IntoIterator for &'a FootstepPlan {
    type Item = &'a PlannedFootstep;
    type IntoIter = std::slice::Iter<'a, PlannedFootstep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Everything a single planning call needs
#[derive(Clone)]
pub struct PlannerRequest {
    /// Measured sole pose of each foot
    pub start_foot_poses: SideDependent<Isometry3<f64>>,
    /// Foot currently carrying the robot; the first planned step swings the other one
    pub initial_support_side: RobotSide,
    /// Target mid-feet pose
    pub goal: Pose2D,
    /// Overrides the configured goal margin
    pub goal_margin: Option<f64>,
    /// `None` means no terrain has been received yet
    pub terrain: Option<Arc<dyn TerrainModel>>,
    /// Overrides the configured wall-clock cutoff [s]
    pub timeout: Option<f64>,
    /// Overrides the configured iteration budget
    pub search_iterations: Option<usize>,
}

impl PlannerRequest {
    pub fn new(
        start_foot_poses: SideDependent<Isometry3<f64>>,
        initial_support_side: RobotSide,
        goal: Pose2D,
    ) -> Self {
        Self {
            start_foot_poses,
            initial_support_side,
            goal,
            goal_margin: None,
            terrain: None,
            timeout: None,
            search_iterations: None,
        }
    }

    pub fn with_terrain(mut self, terrain: Arc<dyn TerrainModel>) -> Self {
        self.terrain = Some(terrain);
        self
    }

    pub fn with_goal_margin(mut self, goal_margin: f64) -> Self {
        self.goal_margin = Some(goal_margin);
        self
    }

    pub fn with_timeout(mut self, timeout: f64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_search_iterations(mut self, iterations: usize) -> Self {
        self.search_iterations = Some(iterations);
        self
    }

    /// Sole pose of the support foot
    pub fn support_foot_pose(&self) -> &Isometry3<f64> {
        self.start_foot_poses.get(self.initial_support_side)
    }

    /// Reject inputs the search cannot start from
    pub fn validate(&self) -> PlannerResult<()> {
        for side in RobotSide::ALL {
            let pose = self.start_foot_poses.get(side);
            let finite = pose.translation.vector.iter().all(|v| v.is_finite())
                && pose.rotation.coords.iter().all(|v| v.is_finite());
            if !finite {
                return Err(PlannerError::InvalidInput(format!("{} start foot pose is not finite", side)));
            }
        }
        if !self.goal.is_finite() {
            return Err(PlannerError::InvalidInput("goal pose is not finite".to_string()));
        }
        if let Some(margin) = self.goal_margin {
            if !(margin.is_finite() && margin > 0.0) {
                return Err(PlannerError::InvalidInput(format!(
                    "goal margin must be positive, got {}",
                    margin
                )));
            }
        }
        if let Some(timeout) = self.timeout {
            if !(timeout.is_finite() && timeout >= 0.0) {
                return Err(PlannerError::InvalidInput(format!(
                    "timeout must be non-negative, got {}",
                    timeout
                )));
            }
        }
        if self.search_iterations == Some(0) {
            return Err(PlannerError::InvalidInput("search iteration budget must be positive".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for PlannerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlannerRequest")
            .field("start_foot_poses", &self.start_foot_poses)
            .field("initial_support_side", &self.initial_support_side)
            .field("goal", &self.goal)
            .field("goal_margin", &self.goal_margin)
            .field("terrain_version", &self.terrain.as_ref().map(|t| t.version()))
            .field("timeout", &self.timeout)
            .field("search_iterations", &self.search_iterations)
            .finish()
    }
}

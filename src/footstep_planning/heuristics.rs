//! Step scoring
//!
//! A step is worth the goal progress it makes, measured from the session
//! start, minus penalties for partial footholds and turning. Landing at the
//! goal earns a fixed reward.

use crate::common::{Point2D, Pose2D, RobotSide};

use super::config::{FootstepPlannerConfig, HeuristicConfig, LatticeConfig};
use super::lattice::{yaw_index_distance, FootstepNode};
use super::world::PlanningWorld;

/// Goal of the current session, as seen by the scorer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalContext {
    pub pose: Pose2D,
    pub margin: f64,
    /// Goal distance of the root footstep
    pub start_distance: f64,
}

/// Where a foot of `side` stands when the robot is at `goal`
pub fn goal_foot_position(goal: &Pose2D, side: RobotSide, ideal_step_width: f64) -> Point2D {
    goal.transform_point(0.0, side.sign() * ideal_step_width / 2.0)
}

#[derive(Debug, Clone)]
pub struct FootstepHeuristic {
    weights: HeuristicConfig,
    lattice: LatticeConfig,
    max_step_length: f64,
    ideal_step_width: f64,
}

impl FootstepHeuristic {
    pub fn new(config: &FootstepPlannerConfig) -> Self {
        Self {
            weights: config.heuristic.clone(),
            lattice: config.lattice.clone(),
            max_step_length: config.envelope.max_step_length,
            ideal_step_width: config.envelope.ideal_step_width,
        }
    }

    pub fn distance_to_goal(&self, world: &PlanningWorld, node: &FootstepNode) -> f64 {
        world.goal_distance(node.x(&self.lattice), node.y(&self.lattice))
    }

    /// Within the goal margin of the goal foot for the node's side
    pub fn is_at_goal(&self, node: &FootstepNode, goal: &GoalContext) -> bool {
        let target = goal_foot_position(&goal.pose, node.side, self.ideal_step_width);
        let position = Point2D::new(node.x(&self.lattice), node.y(&self.lattice));
        position.distance(&target) <= goal.margin
    }

    fn progress(&self, world: &PlanningWorld, node: &FootstepNode, goal: &GoalContext) -> f64 {
        self.weights.goal_progress_weight * (goal.start_distance - self.distance_to_goal(world, node))
            / self.max_step_length
    }

    /// Immediate score of stepping from `stance` onto `candidate`
    pub fn step_score(
        &self,
        world: &PlanningWorld,
        stance: &FootstepNode,
        candidate: &FootstepNode,
        foothold_fraction: f64,
        goal: &GoalContext,
    ) -> f64 {
        let turn = yaw_index_distance(candidate.yaw_index, stance.yaw_index, self.lattice.yaw_divisions);
        let mut score = self.progress(world, candidate, goal)
            - self.weights.foothold_weight * (1.0 - foothold_fraction)
            - self.weights.turning_weight * turn as f64;
        if self.is_at_goal(candidate, goal) {
            score += self.weights.goal_reward;
        }
        score
    }

    /// Value of a plan ending at `last`; zero for an empty plan
    pub fn plan_value(&self, world: &PlanningWorld, last: Option<&FootstepNode>, goal: &GoalContext) -> f64 {
        match last {
            None => 0.0,
            Some(node) => {
                let mut value = self.progress(world, node, goal);
                if self.is_at_goal(node, goal) {
                    value += self.weights.goal_reward;
                }
                value
            }
        }
    }
}

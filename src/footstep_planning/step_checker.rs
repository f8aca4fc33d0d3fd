//! Pluggable step validity checks

use super::lattice::FootstepNode;
use super::snapper::SnapData;

/// Decides whether a snapped step from `stance` to `candidate` is feasible
pub trait StepChecker: Send {
    fn is_valid_step(
        &self,
        stance: &FootstepNode,
        stance_snap: &SnapData,
        candidate: &FootstepNode,
        candidate_snap: &SnapData,
    ) -> bool;
}

/// Rejects steps that climb or descend more than `max_step_z`
#[derive(Debug, Clone)]
pub struct StepHeightChecker {
    pub max_step_z: f64,
}

impl StepHeightChecker {
    pub fn new(max_step_z: f64) -> Self {
        Self { max_step_z }
    }
}

impl StepChecker for StepHeightChecker {
    fn is_valid_step(
        &self,
        _stance: &FootstepNode,
        stance_snap: &SnapData,
        _candidate: &FootstepNode,
        candidate_snap: &SnapData,
    ) -> bool {
        candidate_snap.valid && (candidate_snap.height() - stance_snap.height()).abs() <= self.max_step_z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RobotSide;
    use crate::footstep_planning::config::FootConfig;
    use nalgebra::Isometry3;

    fn snap_at(z: f64) -> SnapData {
        SnapData::from_pose(Isometry3::translation(0.0, 0.0, z), &FootConfig::default())
    }

    #[test]
    fn test_step_height_limit() {
        let checker = StepHeightChecker::new(0.25);
        let stance = FootstepNode::new(0, 2, 0, RobotSide::Left);
        let candidate = FootstepNode::new(4, -2, 0, RobotSide::Right);

        assert!(checker.is_valid_step(&stance, &snap_at(0.0), &candidate, &snap_at(0.2)));
        assert!(checker.is_valid_step(&stance, &snap_at(0.3), &candidate, &snap_at(0.1)));
        assert!(!checker.is_valid_step(&stance, &snap_at(0.0), &candidate, &snap_at(0.3)));
        assert!(!checker.is_valid_step(&stance, &snap_at(0.0), &candidate, &SnapData::invalid()));
    }
}

//! Tunables for the footstep planner
//!
//! Every section deserializes with defaults, so a TOML file only needs the
//! values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{PlannerError, PlannerResult};

/// Lattice discretization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Cell size in x and y [m]
    pub xy_resolution: f64,
    /// Number of discrete yaw values over a full turn
    pub yaw_divisions: u32,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            xy_resolution: 0.05,
            yaw_divisions: 16,
        }
    }
}

impl LatticeConfig {
    /// Yaw cell size [rad]
    pub fn yaw_resolution(&self) -> f64 {
        2.0 * std::f64::consts::PI / self.yaw_divisions as f64
    }
}

/// Reachable step envelope, expressed in the stance foot's frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepEnvelopeConfig {
    /// Most backward step [m]
    pub min_step_length: f64,
    /// Most forward step [m]
    pub max_step_length: f64,
    /// Narrowest stance width [m]
    pub min_step_width: f64,
    /// Widest stance width [m]
    pub max_step_width: f64,
    /// Nominal stance width, used to place goal feet [m]
    pub ideal_step_width: f64,
    /// Largest yaw change per step [rad]
    pub max_step_yaw: f64,
    /// Evenly spaced length samples over [min, max]
    pub length_samples: usize,
    /// Evenly spaced width samples over [min, max]
    pub width_samples: usize,
    /// Evenly spaced yaw samples over [-max, max]
    pub yaw_samples: usize,
    /// Largest height change between consecutive footholds [m]
    pub max_step_z: f64,
}

impl Default for StepEnvelopeConfig {
    fn default() -> Self {
        Self {
            min_step_length: -0.1,
            max_step_length: 0.3,
            min_step_width: 0.15,
            max_step_width: 0.25,
            ideal_step_width: 0.2,
            max_step_yaw: 0.4,
            length_samples: 4,
            width_samples: 1,
            yaw_samples: 3,
            max_step_z: 0.25,
        }
    }
}

/// Foot geometry and foothold acceptance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FootConfig {
    /// Sole length [m]
    pub length: f64,
    /// Sole width [m]
    pub width: f64,
    /// Smallest accepted share of the sole supported by terrain
    pub min_foothold_fraction: f64,
    /// Steepest accepted surface [rad]
    pub max_surface_incline: f64,
}

impl Default for FootConfig {
    fn default() -> Self {
        Self {
            length: 0.22,
            width: 0.11,
            min_foothold_fraction: 0.5,
            max_surface_incline: 0.6,
        }
    }
}

/// Monte-Carlo graph search budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// `update_tree` calls per `generate_plan`
    pub search_iterations: usize,
    /// Random steps per rollout
    pub simulation_iterations: usize,
    /// Deepest level, relative to the root, that may still be expanded
    pub max_expansion_depth: u32,
    /// UCB exploration weight
    pub exploration_constant: f64,
    /// Rollout RNG seed
    pub seed: u64,
    /// Optional wall-clock cutoff per call [s]
    pub timeout: Option<f64>,
    /// Iterations between plan-slot publications
    pub publish_interval: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_iterations: 200,
            simulation_iterations: 6,
            max_expansion_depth: 8,
            exploration_constant: 2.0,
            seed: 0,
            timeout: None,
            publish_interval: 50,
        }
    }
}

/// Step score weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    pub goal_progress_weight: f64,
    pub foothold_weight: f64,
    /// Penalty per yaw cell turned
    pub turning_weight: f64,
    /// Bonus for a step landing at the goal
    pub goal_reward: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            goal_progress_weight: 1.0,
            foothold_weight: 1.0,
            turning_weight: 0.1,
            goal_reward: 5.0,
        }
    }
}

/// Bounds and resolution of the scoring grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningWorldConfig {
    /// World coordinates of the lower-left cell center [m]
    pub origin: [f64; 2],
    /// Extent along x [m]
    pub width: f64,
    /// Extent along y [m]
    pub height: f64,
    pub resolution: f64,
    /// Distance from a goal foot that counts as arrived [m]
    pub goal_margin: f64,
}

impl Default for PlanningWorldConfig {
    fn default() -> Self {
        Self {
            origin: [-5.0, -5.0],
            width: 10.0,
            height: 10.0,
            resolution: 0.05,
            goal_margin: 0.25,
        }
    }
}

/// Step timing used for arrival times
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub swing_duration: f64,
    pub transfer_duration: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            swing_duration: 0.6,
            transfer_duration: 0.25,
        }
    }
}

impl TimingConfig {
    pub fn step_duration(&self) -> f64 {
        self.swing_duration + self.transfer_duration
    }
}

/// Configuration for the footstep graph search planner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FootstepPlannerConfig {
    pub lattice: LatticeConfig,
    pub envelope: StepEnvelopeConfig,
    pub foot: FootConfig,
    pub search: SearchConfig,
    pub heuristic: HeuristicConfig,
    pub world: PlanningWorldConfig,
    pub timing: TimingConfig,
}

impl FootstepPlannerConfig {
    /// Reject values that would leave the search in an undefined state
    pub fn validate(&self) -> PlannerResult<()> {
        positive("lattice.xy_resolution", self.lattice.xy_resolution)?;
        if self.lattice.yaw_divisions < 2 {
            return Err(invalid("lattice.yaw_divisions must be at least 2"));
        }

        let env = &self.envelope;
        ordered("envelope step length", env.min_step_length, env.max_step_length)?;
        ordered("envelope step width", env.min_step_width, env.max_step_width)?;
        positive("envelope.max_step_length", env.max_step_length)?;
        non_negative("envelope.min_step_width", env.min_step_width)?;
        non_negative("envelope.ideal_step_width", env.ideal_step_width)?;
        non_negative("envelope.max_step_yaw", env.max_step_yaw)?;
        non_negative("envelope.max_step_z", env.max_step_z)?;
        if env.length_samples == 0 || env.width_samples == 0 || env.yaw_samples == 0 {
            return Err(invalid("envelope sample counts must be at least 1"));
        }

        positive("foot.length", self.foot.length)?;
        positive("foot.width", self.foot.width)?;
        if !(0.0..=1.0).contains(&self.foot.min_foothold_fraction) {
            return Err(invalid("foot.min_foothold_fraction must lie in [0, 1]"));
        }
        non_negative("foot.max_surface_incline", self.foot.max_surface_incline)?;

        let search = &self.search;
        if search.search_iterations == 0 {
            return Err(invalid("search.search_iterations must be positive"));
        }
        if search.max_expansion_depth == 0 {
            return Err(invalid("search.max_expansion_depth must be positive"));
        }
        if search.publish_interval == 0 {
            return Err(invalid("search.publish_interval must be positive"));
        }
        non_negative("search.exploration_constant", search.exploration_constant)?;
        if let Some(timeout) = search.timeout {
            non_negative("search.timeout", timeout)?;
        }

        non_negative("heuristic.goal_progress_weight", self.heuristic.goal_progress_weight)?;
        non_negative("heuristic.foothold_weight", self.heuristic.foothold_weight)?;
        non_negative("heuristic.turning_weight", self.heuristic.turning_weight)?;
        non_negative("heuristic.goal_reward", self.heuristic.goal_reward)?;

        if !(self.world.origin[0].is_finite() && self.world.origin[1].is_finite()) {
            return Err(invalid("world.origin must be finite"));
        }
        positive("world.width", self.world.width)?;
        positive("world.height", self.world.height)?;
        positive("world.resolution", self.world.resolution)?;
        positive("world.goal_margin", self.world.goal_margin)?;

        positive("timing.swing_duration", self.timing.swing_duration)?;
        non_negative("timing.transfer_duration", self.timing.transfer_duration)?;
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> PlannerResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> PlannerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

fn invalid(message: &str) -> PlannerError {
    PlannerError::InvalidParameter(message.to_string())
}

fn positive(name: &str, value: f64) -> PlannerResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PlannerError::InvalidParameter(format!(
            "{} must be positive and finite, got {}",
            name, value
        )))
    }
}

fn non_negative(name: &str, value: f64) -> PlannerResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PlannerError::InvalidParameter(format!(
            "{} must be non-negative and finite, got {}",
            name, value
        )))
    }
}

fn ordered(name: &str, min: f64, max: f64) -> PlannerResult<()> {
    if min.is_finite() && max.is_finite() && min <= max {
        Ok(())
    } else {
        Err(PlannerError::InvalidParameter(format!(
            "{}: min {} must not exceed max {}",
            name, min, max
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FootstepPlannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.search_iterations, 200);
        assert_eq!(config.search.max_expansion_depth, 8);
        assert!((config.lattice.xy_resolution - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FootstepPlannerConfig::from_toml_str(
            r#"
            [search]
            search_iterations = 500
            seed = 7

            [envelope]
            max_step_length = 0.4
            "#,
        )
        .unwrap();
        assert_eq!(config.search.search_iterations, 500);
        assert_eq!(config.search.seed, 7);
        assert_eq!(config.search.simulation_iterations, 6);
        assert!((config.envelope.max_step_length - 0.4).abs() < 1e-12);
        assert!((config.envelope.ideal_step_width - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = FootstepPlannerConfig::default();
        config.lattice.xy_resolution = -0.05;
        assert!(matches!(config.validate(), Err(PlannerError::InvalidParameter(_))));

        let mut config = FootstepPlannerConfig::default();
        config.search.search_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = FootstepPlannerConfig::default();
        config.envelope.min_step_length = 0.5;
        assert!(config.validate().is_err());

        let mut config = FootstepPlannerConfig::default();
        config.search.timeout = Some(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = FootstepPlannerConfig::from_toml_str("[search\nseed = 1");
        assert!(matches!(result, Err(PlannerError::Config(_))));
    }

    #[test]
    fn test_toml_validation_error() {
        let result = FootstepPlannerConfig::from_toml_str("[world]\ngoal_margin = 0.0");
        assert!(matches!(result, Err(PlannerError::InvalidParameter(_))));
    }
}

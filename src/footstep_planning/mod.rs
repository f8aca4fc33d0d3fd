//! Footstep planning
//!
//! Biped footstep planning over terrain given as planar regions. Candidate
//! foot placements live on a discrete (x, y, yaw) lattice, are snapped onto
//! the terrain and searched with a Monte-Carlo graph search that merges
//! footsteps reached along different paths.

pub mod config;
pub mod engine;
pub mod heuristics;
pub mod lattice;
pub mod plan;
pub mod plan_slot;
pub mod polygon;
pub mod search_node;
pub mod snapper;
pub mod step_checker;
pub mod terrain;
pub mod world;

pub use config::{
    FootConfig, FootstepPlannerConfig, HeuristicConfig, LatticeConfig, PlanningWorldConfig, SearchConfig,
    StepEnvelopeConfig, TimingConfig,
};
pub use engine::{FootstepGraphSearchEngine, PlannerHandle, PlannerStatistics};
pub use heuristics::{goal_foot_position, FootstepHeuristic, GoalContext};
pub use lattice::{FootstepNode, LatticeCell};
pub use plan::{FootstepPlan, PlannedFootstep, PlannerRequest};
pub use plan_slot::PlanSlot;
pub use polygon::ConvexPolygon2D;
pub use search_node::{NodeId, SearchGraph, SearchNode};
pub use snapper::{FootholdSnapper, SnapData};
pub use step_checker::{StepChecker, StepHeightChecker};
pub use terrain::{next_terrain_version, PlanarRegion, PlanarRegionsList, TerrainModel};
pub use world::{Occupancy, PlanningWorld};

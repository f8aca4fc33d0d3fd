// Footstep planning over stepping stones
//
// usage: footstep_planner [config.toml]

use std::sync::Arc;

use log::info;
use nalgebra::Isometry3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use rust_footstep_planning::footstep_planning::{PlanarRegion, PlanarRegionsList};
use rust_footstep_planning::utils::FootstepPlotter;
use rust_footstep_planning::{
    FootstepGraphSearchEngine, FootstepPlannerConfig, PlannerError, PlannerRequest, PlannerResult, Pose2D,
    RobotSide, SideDependent,
};

const STONE_COUNT: usize = 4;
const STONE_SPACING: f64 = 0.3;
const HEIGHT_NOISE: f64 = 0.03;

/// Start platform, a row of noisy-height stones, goal platform
fn stepping_stones(seed: u64) -> PlannerResult<PlanarRegionsList> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, HEIGHT_NOISE).map_err(|e| PlannerError::InvalidParameter(e.to_string()))?;

    let mut terrain = PlanarRegionsList::new();
    terrain.add_region(PlanarRegion::horizontal_rectangle(0.0, 0.0, 0.0, 1.0, 1.0));
    for i in 0..STONE_COUNT {
        let x = 0.6 + STONE_SPACING * i as f64;
        let z: f64 = noise.sample(&mut rng);
        terrain.add_region(PlanarRegion::horizontal_rectangle(x, 0.0, z.abs(), 0.26, 0.6));
    }
    let goal_x = 0.6 + STONE_SPACING * STONE_COUNT as f64 + 0.4;
    terrain.add_region(PlanarRegion::horizontal_rectangle(goal_x, 0.0, 0.0, 1.0, 1.0));
    Ok(terrain)
}

fn main() -> PlannerResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading planner configuration from {}", path);
            FootstepPlannerConfig::from_file(&path)?
        }
        None => FootstepPlannerConfig::default(),
    };
    let foot = config.foot.clone();

    let terrain = Arc::new(stepping_stones(config.search.seed)?);
    let goal_x = 0.6 + STONE_SPACING * STONE_COUNT as f64 + 0.4;
    let goal = Pose2D::new(goal_x, 0.0, 0.0);
    let start = SideDependent::new(
        Isometry3::translation(0.0, 0.1, 0.0),
        Isometry3::translation(0.0, -0.1, 0.0),
    );
    let request = PlannerRequest::new(start, RobotSide::Left, goal)
        .with_terrain(terrain.clone())
        .with_search_iterations(config.search.search_iterations.max(1000));

    let mut planner = FootstepGraphSearchEngine::new(config)?;
    let plan = planner.generate_plan(&request)?;

    println!("Plan with {} steps (value {:.3}, goal reached: {})", plan.len(), plan.value, plan.reached_goal);
    for (i, step) in plan.iter().enumerate() {
        let p = step.pose.translation;
        println!(
            "  {:2} {:5} x={:6.3} y={:6.3} z={:6.3} yaw={:6.3} t={:5.2}s",
            i + 1,
            step.side,
            p.x,
            p.y,
            p.z,
            step.planar_pose().yaw,
            step.arrival_time
        );
    }
    let statistics = planner.statistics();
    println!(
        "{} iterations, {} nodes, {} snaps in {:?}",
        statistics.iterations, statistics.graph_size, statistics.snap_computations, statistics.elapsed
    );

    std::fs::create_dir_all("img")?;
    let mut plotter = FootstepPlotter::new();
    plotter
        .set_title("Footstep plan")
        .plot_regions(terrain.regions())
        .plot_plan(&plan, foot.length, foot.width)
        .plot_start(&Pose2D::origin())
        .plot_goal(&goal);
    plotter.save_png("./img/footstep_planner.png", 1200, 600)?;
    Ok(())
}

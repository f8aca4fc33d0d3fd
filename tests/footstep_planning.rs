use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use nalgebra::Isometry3;

use rust_footstep_planning::footstep_planning::{
    goal_foot_position, FootholdSnapper, FootstepNode, NodeId, PlanarRegion, PlanarRegionsList, PlannerHandle, SearchGraph, SnapData,
    StepChecker, StepHeightChecker,
};
use rust_footstep_planning::{
    FootstepGraphSearchEngine, FootstepPlannerConfig, PlanSlot, PlannerError, PlannerRequest, Pose2D, RobotSide,
    SideDependent,
};

fn flat_terrain() -> Arc<PlanarRegionsList> {
    // 5 m x 5 m, start stance at the origin
    Arc::new(PlanarRegionsList::from_regions(vec![PlanarRegion::horizontal_rectangle(
        1.0, 0.0, 0.0, 5.0, 5.0,
    )]))
}

fn start_stance() -> SideDependent<Isometry3<f64>> {
    SideDependent::new(Isometry3::translation(0.0, 0.1, 0.0), Isometry3::translation(0.0, -0.1, 0.0))
}

fn request(iterations: usize) -> PlannerRequest {
    PlannerRequest::new(start_stance(), RobotSide::Left, Pose2D::new(2.0, 0.0, 0.0))
        .with_terrain(flat_terrain())
        .with_search_iterations(iterations)
}

fn engine() -> FootstepGraphSearchEngine {
    FootstepGraphSearchEngine::new(FootstepPlannerConfig::default()).unwrap()
}

fn reachable(graph: &SearchGraph) -> HashSet<NodeId> {
    let mut seen = HashSet::new();
    let mut stack = vec![graph.root()];
    while let Some(id) = stack.pop() {
        if seen.insert(id) {
            stack.extend(graph.node(id).children().iter().copied());
        }
    }
    seen
}

fn assert_dag_invariants(graph: &SearchGraph) {
    assert!(graph.is_acyclic());
    for (id, node) in graph.iter() {
        for child in node.children() {
            assert!(graph.node(*child).parents().contains(&id));
            assert_eq!(graph.node(*child).level(), node.level() + 1);
        }
        if let Some(min_parent) = node.parents().iter().map(|p| graph.node(*p).level()).min() {
            assert_eq!(node.level(), min_parent + 1);
        }
    }
}

#[test]
fn test_flat_ground_reaches_goal() {
    let config = FootstepPlannerConfig::default();
    let mut planner = engine();
    let request = request(200);
    let plan = planner.generate_plan(&request).unwrap();

    assert!(
        (6..=10).contains(&plan.len()),
        "expected 6-10 steps, got {}",
        plan.len()
    );
    assert!(plan.reached_goal);

    let mut side = RobotSide::Right;
    for step in &plan {
        assert_eq!(step.side, side);
        side = side.opposite();
    }

    let last = plan.last().unwrap();
    let target = goal_foot_position(&request.goal, last.side, config.envelope.ideal_step_width);
    let position = last.planar_pose().position();
    assert!(position.distance(&target) <= config.world.goal_margin + 1e-9);

    let mut snapper = FootholdSnapper::new(config.foot.clone(), config.lattice.clone());
    let terrain = flat_terrain();
    for step in &plan {
        assert!(snapper.snap(&step.node, Some(&*terrain)).valid);
        assert!(step.pose.translation.z.abs() < 1e-9);
    }

    let expected_duration = plan.len() as f64 * config.timing.step_duration();
    assert!((plan.total_duration() - expected_duration).abs() < 1e-9);
}

#[test]
fn test_empty_terrain_gives_empty_plan() {
    let mut planner = engine();
    let request = PlannerRequest::new(start_stance(), RobotSide::Left, Pose2D::new(2.0, 0.0, 0.0))
        .with_terrain(Arc::new(PlanarRegionsList::new()))
        .with_search_iterations(50);
    let plan = planner.generate_plan(&request).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.value, 0.0);
    assert_eq!(planner.graph().unwrap().len(), 1);
}

#[test]
fn test_missing_terrain_gives_empty_plan() {
    let mut planner = engine();
    let mut request = request(50);
    request.terrain = None;
    let plan = planner.generate_plan(&request).unwrap();
    assert!(plan.is_empty());
    assert_eq!(planner.snap_computations(), 0);
}

#[test]
fn test_fixed_seed_is_deterministic() {
    let first = engine().generate_plan(&request(150)).unwrap();
    let second = engine().generate_plan(&request(150)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_plan_value_non_decreasing_in_iterations() {
    let mut previous = f64::NEG_INFINITY;
    for iterations in [20, 50, 100, 200] {
        let plan = engine().generate_plan(&request(iterations)).unwrap();
        assert!(
            plan.value >= previous,
            "value dropped from {} to {} at {} iterations",
            previous,
            plan.value,
            iterations
        );
        previous = plan.value;
    }
}

#[test]
fn test_graph_stays_acyclic() {
    let mut planner = engine();
    let request = request(1);
    for i in 0..150 {
        planner.update_tree(&request).unwrap();
        if i % 50 == 49 {
            assert_dag_invariants(planner.graph().unwrap());
        }
    }
    let graph = planner.graph().unwrap();
    assert_eq!(graph.node(graph.root()).visits(), 150);
    assert!(graph.iter().any(|(_, node)| node.parents().len() > 1), "expected merged footsteps");
}

#[test]
fn test_incremental_calls_reuse_graph() {
    let mut planner = engine();
    let request = request(100);
    let first = planner.generate_plan(&request).unwrap();
    let size = planner.graph().unwrap().len();
    let root_visits = planner.graph().unwrap().node(planner.graph().unwrap().root()).visits();

    let second = planner.generate_plan(&request).unwrap();
    let graph = planner.graph().unwrap();
    assert!(graph.len() >= size);
    assert_eq!(graph.node(graph.root()).visits(), root_visits + 100);
    assert!(second.value >= first.value);
}

#[test]
fn test_new_stance_reroots_graph() {
    let mut planner = engine();
    let plan = planner.generate_plan(&request(100)).unwrap();
    let before = planner.graph().unwrap().len();
    let first = plan.steps[0].clone();

    let mut feet = start_stance();
    *feet.get_mut(first.side) = first.pose;
    let next = PlannerRequest::new(feet, first.side, Pose2D::new(2.0, 0.0, 0.0))
        .with_terrain(flat_terrain())
        .with_search_iterations(50);
    let replanned = planner.generate_plan(&next).unwrap();

    let graph = planner.graph().unwrap();
    assert_eq!(graph.node(graph.root()).footstep(), &first.node);
    assert!(graph.node(graph.root()).parents().is_empty());
    assert_eq!(reachable(graph).len(), graph.len());
    assert!(graph.len() < before + 50 * 12);
    assert_dag_invariants(graph);

    assert!(!replanned.is_empty());
    assert_eq!(replanned.steps[0].side, first.side.opposite());
}

#[test]
fn test_unknown_stance_starts_new_session() {
    let mut planner = engine();
    planner.generate_plan(&request(50)).unwrap();

    let feet = SideDependent::new(Isometry3::translation(-1.0, 0.1, 0.0), Isometry3::translation(-1.0, -0.1, 0.0));
    let far = PlannerRequest::new(feet, RobotSide::Left, Pose2D::new(2.0, 0.0, 0.0))
        .with_terrain(flat_terrain())
        .with_search_iterations(1);
    planner.generate_plan(&far).unwrap();
    let graph = planner.graph().unwrap();
    assert_eq!(graph.len(), 13);
    assert_eq!(graph.node(graph.root()).footstep(), &FootstepNode::new(-20, 2, 0, RobotSide::Left));
}

#[test]
fn test_plans_far_from_world_origin() {
    let terrain = Arc::new(PlanarRegionsList::from_regions(vec![PlanarRegion::horizontal_rectangle(
        7.0, 0.0, 0.0, 5.0, 5.0,
    )]));
    let feet = SideDependent::new(Isometry3::translation(6.0, 0.1, 0.0), Isometry3::translation(6.0, -0.1, 0.0));
    let goal = Pose2D::new(8.0, 0.0, 0.0);
    let request = PlannerRequest::new(feet, RobotSide::Left, goal)
        .with_terrain(terrain)
        .with_search_iterations(200);

    let mut planner = engine();
    let plan = planner.generate_plan(&request).unwrap();
    assert!(planner.world().contains(6.0, 0.0));
    assert!(planner.world().contains(8.0, 0.0));
    assert!(plan.len() >= 3, "expected progress, got {} steps", plan.len());
    let last = plan.last().unwrap().planar_pose().position();
    assert!(last.distance(&goal.position()) < 1.0);
}

#[test]
fn test_raised_terrain_prunes_unsupported_children() {
    let config = FootstepPlannerConfig::default();
    let ground = PlanarRegionsList::from_regions(vec![PlanarRegion::horizontal_rectangle(1.0, 0.0, 0.0, 5.0, 5.0)]);
    let mut planner = engine();
    let before = PlannerRequest::new(start_stance(), RobotSide::Left, Pose2D::new(2.0, 0.0, 0.0))
        .with_terrain(Arc::new(ground.clone()))
        .with_search_iterations(100);
    planner.generate_plan(&before).unwrap();
    let graph = planner.graph().unwrap();
    assert_eq!(graph.node(graph.root()).children().len(), 12);

    // A 0.5 m block right in front of the robot
    let mut raised = ground;
    raised.add_region(PlanarRegion::horizontal_rectangle(0.3, 0.0, 0.5, 0.4, 1.0));
    let raised = Arc::new(raised);
    let after = PlannerRequest::new(start_stance(), RobotSide::Left, Pose2D::new(2.0, 0.0, 0.0))
        .with_terrain(raised.clone())
        .with_search_iterations(20);
    let plan = planner.generate_plan(&after).unwrap();

    let graph = planner.graph().unwrap();
    let root = graph.node(graph.root());
    assert!(root.children().len() < 12);
    assert!(!root.children().is_empty());

    let mut snapper = FootholdSnapper::new(config.foot.clone(), config.lattice.clone());
    let checker = StepHeightChecker::new(config.envelope.max_step_z);
    for child in root.children() {
        let child = graph.node(*child);
        let snap = snapper.snap(child.footstep(), Some(&*raised));
        assert!(snap.valid);
        assert!(checker.is_valid_step(root.footstep(), root.snap(), child.footstep(), &snap));
    }

    assert!(!plan.is_empty());
    let first = &plan.steps[0];
    assert!(root.children().iter().any(|c| graph.node(*c).footstep() == &first.node));
    assert!(snapper.snap(&first.node, Some(&*raised)).valid);
}

struct CancellingChecker {
    handle: PlannerHandle,
    inner: StepHeightChecker,
}

impl StepChecker for CancellingChecker {
    fn is_valid_step(
        &self,
        stance: &FootstepNode,
        stance_snap: &SnapData,
        candidate: &FootstepNode,
        candidate_snap: &SnapData,
    ) -> bool {
        self.handle.request_cancel();
        self.inner.is_valid_step(stance, stance_snap, candidate, candidate_snap)
    }
}

#[test]
fn test_cancel_stops_between_iterations() {
    let planner = engine();
    let handle = planner.handle();
    let mut planner = planner.with_step_checker(Box::new(CancellingChecker {
        handle: handle.clone(),
        inner: StepHeightChecker::new(0.25),
    }));

    let plan = planner.generate_plan(&request(200)).unwrap();
    let statistics = planner.statistics();
    assert!(statistics.cancelled);
    assert_eq!(statistics.iterations, 1);
    assert!(!plan.is_empty());
    assert!(!handle.is_planning());

    // The flag is cleared on entry, so the next call runs again
    planner.generate_plan(&request(200)).unwrap();
    assert_eq!(planner.statistics().iterations, 1);
}

#[test]
fn test_zero_timeout_runs_no_iterations() {
    let mut planner = engine();
    let plan = planner.generate_plan(&request(200).with_timeout(0.0)).unwrap();
    assert!(plan.is_empty());
    assert!(planner.statistics().timed_out);
    assert_eq!(planner.statistics().iterations, 0);
}

#[test]
fn test_nan_start_pose_is_rejected() {
    let mut planner = engine();
    let feet = SideDependent::new(Isometry3::translation(f64::NAN, 0.1, 0.0), Isometry3::translation(0.0, -0.1, 0.0));
    let request = PlannerRequest::new(feet, RobotSide::Left, Pose2D::new(2.0, 0.0, 0.0)).with_terrain(flat_terrain());
    assert!(matches!(planner.generate_plan(&request), Err(PlannerError::InvalidInput(_))));
    assert!(planner.graph().is_none());
    assert!(!planner.handle().is_planning());
}

#[test]
fn test_planning_on_worker_thread_publishes_to_slot() {
    let slot = Arc::new(PlanSlot::new());
    let mut planner = engine();
    planner.attach_plan_slot(Arc::clone(&slot));
    let handle = planner.handle();

    let worker = thread::spawn(move || planner.generate_plan(&request(120)));
    let plan = worker.join().unwrap().unwrap();

    assert!(!handle.is_planning());
    let published = slot.take().unwrap();
    assert_eq!(*published, plan);
    assert!(slot.take().is_none());
}

#[test]
fn test_config_file_round_trip() {
    let config = FootstepPlannerConfig::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config/footstep_planner.toml"))
        .unwrap();
    assert_eq!(config, FootstepPlannerConfig::default());
}

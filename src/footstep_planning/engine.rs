//! Monte-Carlo footstep graph search
//!
//! Each iteration descends the search graph by UCB, expands the reached
//! node into its snapped successors, plays a random rollout from the most
//! promising new child and backpropagates the rollout value to every
//! ancestor exactly once. Successors that land on an already known lattice
//! footstep are merged into the existing node, so the graph is a DAG.
//!
//! The graph survives between `generate_plan` calls. When the robot has
//! taken steps, the graph is re-rooted at the node matching the new stance;
//! a new goal starts a fresh session.
//!
//! Snapped nodes are not re-validated against changed terrain except through
//! the lazy child pruning done during descent. Call [`reset`] after a large
//! terrain change when stale footholds are not acceptable.
//!
//! [`reset`]: FootstepGraphSearchEngine::reset

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::common::{FootstepPlanner, PlannerResult, Point2D, Pose2D};

use super::config::FootstepPlannerConfig;
use super::heuristics::{FootstepHeuristic, GoalContext};
use super::lattice::{successors, FootstepNode};
use super::plan::{FootstepPlan, PlannedFootstep, PlannerRequest};
use super::plan_slot::PlanSlot;
use super::search_node::{NodeId, SearchGraph};
use super::snapper::{FootholdSnapper, SnapData};
use super::step_checker::{StepChecker, StepHeightChecker};
use super::terrain::TerrainModel;
use super::world::PlanningWorld;

/// Cancellation and status handle, shareable with other threads
#[derive(Debug, Clone, Default)]
pub struct PlannerHandle {
    cancel: Arc<AtomicBool>,
    planning: Arc<AtomicBool>,
}

impl PlannerHandle {
    /// Ask the running `generate_plan` to stop after its current iteration
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn is_planning(&self) -> bool {
        self.planning.load(Ordering::SeqCst)
    }
}

/// Clears the planning flag however `generate_plan` exits
struct PlanningGuard(Arc<AtomicBool>);

impl PlanningGuard {
    fn start(flag: Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for PlanningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Figures for the most recent `generate_plan` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlannerStatistics {
    pub iterations: usize,
    pub graph_size: usize,
    pub snap_computations: usize,
    pub cancelled: bool,
    pub timed_out: bool,
    pub elapsed: Duration,
    pub best_value: f64,
}

pub struct FootstepGraphSearchEngine {
    config: FootstepPlannerConfig,
    snapper: FootholdSnapper,
    world: PlanningWorld,
    heuristic: FootstepHeuristic,
    step_checker: Box<dyn StepChecker>,
    graph: Option<SearchGraph>,
    goal: Option<GoalContext>,
    incumbent: Option<Arc<FootstepPlan>>,
    terrain_version: Option<u64>,
    rng: StdRng,
    handle: PlannerHandle,
    plan_slot: Option<Arc<PlanSlot>>,
    statistics: PlannerStatistics,
}

impl FootstepGraphSearchEngine {
    pub fn new(config: FootstepPlannerConfig) -> PlannerResult<Self> {
        config.validate()?;
        Ok(Self {
            snapper: FootholdSnapper::new(config.foot.clone(), config.lattice.clone()),
            world: PlanningWorld::new(&config.world),
            heuristic: FootstepHeuristic::new(&config),
            step_checker: Box::new(StepHeightChecker::new(config.envelope.max_step_z)),
            graph: None,
            goal: None,
            incumbent: None,
            terrain_version: None,
            rng: StdRng::seed_from_u64(config.search.seed),
            handle: PlannerHandle::default(),
            plan_slot: None,
            statistics: PlannerStatistics::default(),
            config,
        })
    }

    /// Replace the step feasibility check
    pub fn with_step_checker(mut self, checker: Box<dyn StepChecker>) -> Self {
        self.step_checker = checker;
        self
    }

    /// Publish plans into `slot` while planning
    pub fn attach_plan_slot(&mut self, slot: Arc<PlanSlot>) {
        self.plan_slot = Some(slot);
    }

    pub fn handle(&self) -> PlannerHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &FootstepPlannerConfig {
        &self.config
    }

    pub fn world(&self) -> &PlanningWorld {
        &self.world
    }

    /// Occupancy edits take effect for the next session
    pub fn world_mut(&mut self) -> &mut PlanningWorld {
        &mut self.world
    }

    pub fn graph(&self) -> Option<&SearchGraph> {
        self.graph.as_ref()
    }

    pub fn statistics(&self) -> &PlannerStatistics {
        &self.statistics
    }

    pub fn snap_computations(&self) -> usize {
        self.snapper.computations()
    }

    /// Best plan found in the current session
    pub fn best_plan(&self) -> FootstepPlan {
        self.incumbent.as_deref().cloned().unwrap_or_default()
    }

    /// End the session: drop the graph, the goal and the best plan
    pub fn reset(&mut self) {
        debug!("Resetting footstep search session");
        self.graph = None;
        self.goal = None;
        self.incumbent = None;
        self.rng = StdRng::seed_from_u64(self.config.search.seed);
        self.snapper.clear_cache();
    }

    /// Run the search for the request's iteration budget and return the best plan
    ///
    /// Stops early on cancellation or timeout, both checked between
    /// iterations. Only malformed requests produce an error.
    pub fn generate_plan(&mut self, request: &PlannerRequest) -> PlannerResult<FootstepPlan> {
        request.validate()?;
        self.handle.cancel.store(false, Ordering::SeqCst);
        let _planning = PlanningGuard::start(Arc::clone(&self.handle.planning));

        let start = Instant::now();
        let snaps_before = self.snapper.computations();
        self.prepare_session(request);

        let terrain = request.terrain.clone();
        let iterations = request.search_iterations.unwrap_or(self.config.search.search_iterations);
        // A cutoff too far out to represent is no cutoff
        let deadline = request
            .timeout
            .or(self.config.search.timeout)
            .and_then(|t| Duration::try_from_secs_f64(t).ok())
            .and_then(|t| start.checked_add(t));
        let publish_interval = self.config.search.publish_interval;

        let mut statistics = PlannerStatistics::default();
        for i in 0..iterations {
            if self.handle.is_cancel_requested() {
                info!("Footstep planning cancelled after {} iterations", i);
                statistics.cancelled = true;
                break;
            }
            if deadline.map_or(false, |d| Instant::now() >= d) {
                warn!("Footstep planning timed out after {} iterations", i);
                statistics.timed_out = true;
                break;
            }

            self.iterate(terrain.as_deref());
            statistics.iterations += 1;

            if statistics.iterations % publish_interval == 0 {
                self.publish();
            }
        }
        self.publish();

        let plan = self.best_plan();
        statistics.graph_size = self.graph.as_ref().map_or(0, |g| g.len());
        statistics.snap_computations = self.snapper.computations() - snaps_before;
        statistics.elapsed = start.elapsed();
        statistics.best_value = plan.value;
        info!(
            "Footstep plan: {} steps, value {:.3}, goal reached: {} ({} iterations, {} nodes, {:?})",
            plan.len(),
            plan.value,
            plan.reached_goal,
            statistics.iterations,
            statistics.graph_size,
            statistics.elapsed
        );
        self.statistics = statistics;
        Ok(plan)
    }

    /// Run a single search iteration for `request`
    pub fn update_tree(&mut self, request: &PlannerRequest) -> PlannerResult<()> {
        request.validate()?;
        self.prepare_session(request);
        self.iterate(request.terrain.as_deref());
        Ok(())
    }

    /// Make the graph match the request: new session, re-root or reuse
    fn prepare_session(&mut self, request: &PlannerRequest) {
        let margin = request.goal_margin.unwrap_or(self.config.world.goal_margin);
        if let Some(goal) = &self.goal {
            if goal.pose != request.goal || goal.margin != margin {
                info!("Goal changed, starting a new search session");
                self.reset();
            }
        }

        let version = request.terrain.as_ref().map(|t| t.version());
        let terrain_changed = version != self.terrain_version;
        match version {
            None => debug!("No terrain loaded; every candidate step will be rejected"),
            Some(v) if terrain_changed => debug!("Terrain version {:?} -> {}", self.terrain_version, v),
            Some(_) => {}
        }
        self.terrain_version = version;
        if terrain_changed && self.incumbent.take().is_some() {
            // Children are re-checked lazily; the best plan is re-extracted
            debug!("Terrain changed, dropping the best plan of this session");
        }

        let support_pose = request.support_foot_pose();
        let root_footstep = FootstepNode::from_pose(
            &Pose2D::from_isometry(support_pose),
            request.initial_support_side,
            &self.config.lattice,
        );

        if let Some(graph) = self.graph.as_mut() {
            let current_root = *graph.node(graph.root()).footstep();
            if current_root == root_footstep {
                return;
            }
            match graph.find(&root_footstep) {
                Some(id) => {
                    let before = graph.len();
                    graph.reroot(id);
                    debug!("Re-rooted search graph: {} -> {} nodes", before, graph.len());
                    self.incumbent = None;
                    return;
                }
                None => {
                    info!("Stance left the search graph, starting a new session");
                    self.reset();
                }
            }
        }

        self.world.set_goal_margin(margin);
        let start = Pose2D::from_isometry(support_pose).position();
        let goal = request.goal.position();
        if !(self.world.contains(start.x, start.y) && self.world.contains(goal.x, goal.y)) {
            let center = Point2D::new((start.x + goal.x) / 2.0, (start.y + goal.y) / 2.0);
            self.world.recenter(center);
            info!(
                "Planning world moved to cover start and goal, origin now ({:.2}, {:.2})",
                self.world.origin().x,
                self.world.origin().y
            );
            if !(self.world.contains(start.x, start.y) && self.world.contains(goal.x, goal.y)) {
                warn!(
                    "Start and goal are {:.2} m apart, more than the {:.1} x {:.1} m planning world covers",
                    start.distance(&goal),
                    self.world.width(),
                    self.world.height()
                );
            }
        }
        self.world.update_goal(goal);
        let start_distance = self.heuristic.distance_to_goal(&self.world, &root_footstep);
        self.goal = Some(GoalContext {
            pose: request.goal,
            margin,
            start_distance,
        });
        let root_snap = SnapData::from_pose(*support_pose, &self.config.foot);
        self.graph = Some(SearchGraph::new(root_footstep, Arc::new(root_snap), version));
        debug!(
            "New search session rooted at {:?}, {:.2} m from the goal",
            root_footstep, start_distance
        );
    }

    /// Select, expand, simulate, backpropagate; then refresh the best plan
    fn iterate(&mut self, terrain: Option<&dyn TerrainModel>) {
        let mut graph = match self.graph.take() {
            Some(graph) => graph,
            None => return,
        };
        let version = terrain.map(|t| t.version());
        let root = graph.root();
        let root_level = graph.node(root).level();

        let mut current = root;
        loop {
            self.prune_children(&mut graph, current, terrain, version);
            let node = graph.node(current);
            if node.visits() <= 1 || node.children().is_empty() {
                break;
            }
            match graph.select_child(current, self.config.search.exploration_constant) {
                Some(child) => current = child,
                None => break,
            }
        }

        let target = self.expand(&mut graph, current, root_level, terrain).unwrap_or(current);
        let value = self.simulate(&graph, target, terrain);
        graph.back_propagate(target, value);

        let plan = self.extract_plan(&graph);
        if self.incumbent.as_ref().map_or(true, |best| plan.value > best.value) {
            self.incumbent = Some(Arc::new(plan));
        }
        self.graph = Some(graph);
    }

    fn is_candidate_valid(
        &mut self,
        stance: &FootstepNode,
        stance_snap: &SnapData,
        candidate: &FootstepNode,
        terrain: Option<&dyn TerrainModel>,
    ) -> Option<Arc<SnapData>> {
        let lattice = &self.config.lattice;
        if !self.world.is_valid(candidate.x(lattice), candidate.y(lattice)) {
            return None;
        }
        let snap = self.snapper.snap(candidate, terrain);
        if snap.valid && self.step_checker.is_valid_step(stance, stance_snap, candidate, &snap) {
            Some(snap)
        } else {
            None
        }
    }

    fn prune_children(
        &mut self,
        graph: &mut SearchGraph,
        id: NodeId,
        terrain: Option<&dyn TerrainModel>,
        version: Option<u64>,
    ) {
        let removed = graph.prune(id, version, |parent, child| {
            self.is_candidate_valid(parent.footstep(), parent.snap(), child.footstep(), terrain)
                .is_some()
        });
        if removed > 0 {
            debug!("Pruned {} children no longer supported by the terrain", removed);
        }
    }

    /// Add the valid successors of `id` to the graph
    ///
    /// Returns the child with the best immediate score, or `None` when the
    /// node is at the depth limit or has no valid successor.
    fn expand(
        &mut self,
        graph: &mut SearchGraph,
        id: NodeId,
        root_level: u32,
        terrain: Option<&dyn TerrainModel>,
    ) -> Option<NodeId> {
        let goal = self.goal?;
        let (footstep, snap, level) = {
            let node = graph.node(id);
            (*node.footstep(), Arc::clone(node.snap()), node.level())
        };
        if level - root_level >= self.config.search.max_expansion_depth {
            return None;
        }

        let version = terrain.map(|t| t.version());
        let mut best: Option<(NodeId, f64)> = None;
        for candidate in successors(&footstep, &self.config.envelope, &self.config.lattice) {
            let candidate_snap = match self.is_candidate_valid(&footstep, &snap, &candidate, terrain) {
                Some(s) => s,
                None => continue,
            };
            let score = self.heuristic.step_score(
                &self.world,
                &footstep,
                &candidate,
                candidate_snap.foothold_fraction,
                &goal,
            );

            let child = match graph.find(&candidate) {
                Some(existing) => {
                    if graph.node(existing).level() != level + 1 {
                        continue;
                    }
                    graph.add_child(id, existing);
                    existing
                }
                None => graph.insert_child(id, candidate, candidate_snap, version),
            };
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((child, score));
            }
        }
        best.map(|(child, _)| child)
    }

    /// Random playout from `id`; sum of step scores
    fn simulate(&mut self, graph: &SearchGraph, id: NodeId, terrain: Option<&dyn TerrainModel>) -> f64 {
        let goal = match self.goal {
            Some(goal) => goal,
            None => return 0.0,
        };
        let mut stance = *graph.node(id).footstep();
        let mut stance_snap = Arc::clone(graph.node(id).snap());
        let mut total = 0.0;

        for _ in 0..self.config.search.simulation_iterations {
            let mut candidates = successors(&stance, &self.config.envelope, &self.config.lattice);
            let mut next = None;
            while !candidates.is_empty() {
                let k = self.rng.gen_range(0..candidates.len());
                let candidate = candidates.remove(k);
                if let Some(snap) = self.is_candidate_valid(&stance, &stance_snap, &candidate, terrain) {
                    next = Some((candidate, snap));
                    break;
                }
            }
            let (candidate, snap) = match next {
                Some(n) => n,
                None => break,
            };
            total += self
                .heuristic
                .step_score(&self.world, &stance, &candidate, snap.foothold_fraction, &goal);
            stance = candidate;
            stance_snap = snap;
        }
        total
    }

    /// Greedy walk down the highest mean-value children
    fn extract_plan(&self, graph: &SearchGraph) -> FootstepPlan {
        let goal = match self.goal {
            Some(goal) => goal,
            None => return FootstepPlan::empty(),
        };
        let step_duration = self.config.timing.step_duration();
        let root = graph.root();
        let mut current = root;
        let mut steps: Vec<PlannedFootstep> = Vec::new();

        loop {
            if current != root && self.heuristic.is_at_goal(graph.node(current).footstep(), &goal) {
                break;
            }
            let child = match graph.best_child(current) {
                Some(child) => child,
                None => break,
            };
            let node = graph.node(child);
            steps.push(PlannedFootstep {
                side: node.footstep().side,
                node: *node.footstep(),
                pose: node.snap().transform,
                foothold: node.snap().cropped_foothold.clone(),
                arrival_time: (steps.len() + 1) as f64 * step_duration,
            });
            current = child;
        }

        let last = steps.last().map(|s| s.node);
        FootstepPlan {
            value: self.heuristic.plan_value(&self.world, last.as_ref(), &goal),
            reached_goal: last.map_or(false, |n| self.heuristic.is_at_goal(&n, &goal)),
            steps,
        }
    }

    fn publish(&self) {
        if let Some(slot) = &self.plan_slot {
            match &self.incumbent {
                Some(plan) => slot.publish_shared(Arc::clone(plan)),
                None => slot.publish(FootstepPlan::empty()),
            }
        }
    }
}

impl FootstepPlanner for FootstepGraphSearchEngine {
    fn plan(&mut self, request: &PlannerRequest) -> PlannerResult<FootstepPlan> {
        self.generate_plan(request)
    }

    fn reset(&mut self) {
        FootstepGraphSearchEngine::reset(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{PlannerError, RobotSide, SideDependent};
    use crate::footstep_planning::terrain::{PlanarRegion, PlanarRegionsList};
    use nalgebra::Isometry3;

    fn flat_request(iterations: usize) -> PlannerRequest {
        let terrain = PlanarRegionsList::from_regions(vec![PlanarRegion::horizontal_rectangle(
            1.0, 0.0, 0.0, 5.0, 5.0,
        )]);
        PlannerRequest::new(
            SideDependent::new(Isometry3::translation(0.0, 0.1, 0.0), Isometry3::translation(0.0, -0.1, 0.0)),
            RobotSide::Left,
            Pose2D::new(2.0, 0.0, 0.0),
        )
        .with_terrain(Arc::new(terrain))
        .with_search_iterations(iterations)
    }

    fn engine() -> FootstepGraphSearchEngine {
        FootstepGraphSearchEngine::new(FootstepPlannerConfig::default()).unwrap()
    }

    #[test]
    fn test_first_iteration_expands_root() {
        let mut engine = engine();
        engine.update_tree(&flat_request(1)).unwrap();
        let graph = engine.graph().unwrap();
        let root = graph.node(graph.root());
        assert_eq!(root.children().len(), 12);
        assert_eq!(root.visits(), 1);
        assert_eq!(graph.len(), 13);
        // Only the simulated child has been visited
        let visited: Vec<_> = root.children().iter().filter(|c| graph.node(**c).visits() > 0).collect();
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_plan_alternates_sides() {
        let mut engine = engine();
        let plan = engine.generate_plan(&flat_request(100)).unwrap();
        assert!(!plan.is_empty());
        assert_eq!(plan.steps[0].side, RobotSide::Right);
        for pair in plan.steps.windows(2) {
            assert_eq!(pair[1].side, pair[0].side.opposite());
            assert!(pair[1].arrival_time > pair[0].arrival_time);
        }
        assert_eq!(engine.statistics().iterations, 100);
        assert!(!engine.handle().is_planning());
    }

    #[test]
    fn test_rejects_malformed_request() {
        let mut engine = engine();
        let mut request = flat_request(10);
        request.goal.yaw = f64::NAN;
        assert!(matches!(engine.generate_plan(&request), Err(PlannerError::InvalidInput(_))));
        assert!(engine.graph().is_none());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = FootstepPlannerConfig::default();
        config.search.max_expansion_depth = 0;
        assert!(FootstepGraphSearchEngine::new(config).is_err());
    }

    #[test]
    fn test_goal_change_starts_new_session() {
        let mut engine = engine();
        engine.generate_plan(&flat_request(30)).unwrap();
        let mut request = flat_request(1);
        request.goal = Pose2D::new(1.0, 1.0, 0.0);
        engine.generate_plan(&request).unwrap();
        assert_eq!(engine.graph().unwrap().len(), 13);
    }

    #[test]
    fn test_plan_slot_receives_best_plan() {
        let slot = Arc::new(PlanSlot::new());
        let mut engine = engine();
        engine.attach_plan_slot(Arc::clone(&slot));
        let plan = engine.generate_plan(&flat_request(60)).unwrap();
        let published = slot.take().unwrap();
        assert_eq!(*published, plan);
    }

    #[test]
    fn test_huge_timeout_means_no_cutoff() {
        let mut engine = engine();
        let plan = engine.generate_plan(&flat_request(25).with_timeout(1e20)).unwrap();
        assert!(!plan.is_empty());
        assert_eq!(engine.statistics().iterations, 25);
        assert!(!engine.statistics().timed_out);

        let mut config = FootstepPlannerConfig::default();
        config.search.timeout = Some(f64::MAX);
        let mut engine = FootstepGraphSearchEngine::new(config).unwrap();
        engine.generate_plan(&flat_request(5)).unwrap();
        assert_eq!(engine.statistics().iterations, 5);
    }

    #[test]
    fn test_slot_shares_best_plan_allocation() {
        let slot = Arc::new(PlanSlot::new());
        let mut engine = engine();
        engine.attach_plan_slot(Arc::clone(&slot));
        engine.generate_plan(&flat_request(30)).unwrap();
        let published = slot.peek().unwrap();
        assert!(Arc::ptr_eq(&published, engine.incumbent.as_ref().unwrap()));
    }

    #[test]
    fn test_reset_drops_session() {
        let mut engine = engine();
        engine.generate_plan(&flat_request(20)).unwrap();
        engine.reset();
        assert!(engine.graph().is_none());
        assert!(engine.best_plan().is_empty());
    }
}

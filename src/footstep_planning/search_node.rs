//! Search graph bookkeeping
//!
//! Search nodes live in an arena and refer to each other by [`NodeId`].
//! The same lattice footstep reached along different step sequences maps to
//! one node with several parents, so the structure is a DAG rather than a
//! tree. Edges always go from level `l` to level `l + 1`, which rules out
//! cycles.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::lattice::FootstepNode;
use super::snapper::SnapData;

/// Handle of a node inside a [`SearchGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct SearchNode {
    footstep: FootstepNode,
    snap: Arc<SnapData>,
    visits: u32,
    value: f64,
    parents: Vec<NodeId>,
    children: Vec<NodeId>,
    level: u32,
    upper_confidence_bound: f64,
    checked_terrain_version: Option<u64>,
}

impl SearchNode {
    fn new(footstep: FootstepNode, snap: Arc<SnapData>, level: u32, terrain_version: Option<u64>) -> Self {
        Self {
            footstep,
            snap,
            visits: 0,
            value: 0.0,
            parents: Vec::new(),
            children: Vec::new(),
            level,
            upper_confidence_bound: f64::INFINITY,
            checked_terrain_version: terrain_version,
        }
    }

    pub fn footstep(&self) -> &FootstepNode {
        &self.footstep
    }

    pub fn snap(&self) -> &Arc<SnapData> {
        &self.snap
    }

    pub fn visits(&self) -> u32 {
        self.visits
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Average backpropagated value; zero before the first visit
    pub fn mean_value(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.value / self.visits as f64
        }
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn upper_confidence_bound(&self) -> f64 {
        self.upper_confidence_bound
    }

    /// UCB1 score; unvisited nodes score infinity so they are tried first
    pub fn update_upper_confidence_bound(&mut self, parent_visits: u32, exploration_constant: f64) {
        self.upper_confidence_bound = if self.visits == 0 {
            f64::INFINITY
        } else {
            let exploration = ((parent_visits.max(1) as f64).ln() / self.visits as f64).sqrt();
            self.mean_value() + exploration_constant * exploration
        };
    }

    pub fn add_value(&mut self, value: f64) {
        self.value += value;
    }

    pub fn increment_visits(&mut self) {
        self.visits += 1;
    }
}

/// Arena of search nodes plus the session-wide visited map
#[derive(Debug, Clone)]
pub struct SearchGraph {
    nodes: Vec<SearchNode>,
    visited: HashMap<FootstepNode, NodeId>,
    root: NodeId,
}

impl SearchGraph {
    pub fn new(root: FootstepNode, snap: Arc<SnapData>, terrain_version: Option<u64>) -> Self {
        let mut visited = HashMap::new();
        visited.insert(root, NodeId(0));
        Self {
            nodes: vec![SearchNode::new(root, snap, 0, terrain_version)],
            visited,
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SearchNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Node registered for a lattice footstep
    pub fn find(&self, footstep: &FootstepNode) -> Option<NodeId> {
        self.visited.get(footstep).copied()
    }

    /// Link `parent -> child`; no-op when the edge already exists
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.nodes[parent.0].children.contains(&child) {
            return false;
        }
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parents.push(parent);
        true
    }

    /// Create a node one level below `parent`, register it and link it
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        footstep: FootstepNode,
        snap: Arc<SnapData>,
        terrain_version: Option<u64>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let level = self.nodes[parent.0].level + 1;
        self.nodes.push(SearchNode::new(footstep, snap, level, terrain_version));
        self.visited.insert(footstep, id);
        self.add_child(parent, id);
        id
    }

    /// Add `value` and one visit to `from` and to every ancestor, each once
    pub fn back_propagate(&mut self, from: NodeId, value: f64) {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let node = &mut self.nodes[id.0];
            node.add_value(value);
            node.increment_visits();
            stack.extend(node.parents.iter().copied());
        }
    }

    /// Child with the highest UCB; the first one wins ties
    pub fn select_child(&mut self, id: NodeId, exploration_constant: f64) -> Option<NodeId> {
        let parent_visits = self.nodes[id.0].visits;
        let children = self.nodes[id.0].children.clone();
        let mut best: Option<(NodeId, f64)> = None;
        for child in children {
            let node = &mut self.nodes[child.0];
            node.update_upper_confidence_bound(parent_visits, exploration_constant);
            let score = node.upper_confidence_bound;
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((child, score));
            }
        }
        best.map(|(child, _)| child)
    }

    /// Visited child with the highest mean value; the first one wins ties
    pub fn best_child(&self, id: NodeId) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for &child in &self.nodes[id.0].children {
            let node = &self.nodes[child.0];
            if node.visits == 0 {
                continue;
            }
            let mean = node.mean_value();
            if best.map_or(true, |(_, m)| mean > m) {
                best = Some((child, mean));
            }
        }
        best.map(|(child, _)| child)
    }

    /// Drop edges to children that `keep` rejects
    ///
    /// Only runs when `terrain_version` differs from the version the node
    /// was last checked against. Returns the number of removed children.
    pub fn prune<F>(&mut self, id: NodeId, terrain_version: Option<u64>, mut keep: F) -> usize
    where
        F: FnMut(&SearchNode, &SearchNode) -> bool,
    {
        if self.nodes[id.0].checked_terrain_version == terrain_version {
            return 0;
        }

        let parent = &self.nodes[id.0];
        let rejected: Vec<NodeId> = parent
            .children
            .iter()
            .copied()
            .filter(|child| !keep(parent, &self.nodes[child.0]))
            .collect();

        for child in rejected.iter() {
            self.nodes[id.0].children.retain(|c| c != child);
            self.nodes[child.0].parents.retain(|p| *p != id);
        }
        self.nodes[id.0].checked_terrain_version = terrain_version;
        rejected.len()
    }

    /// Make `new_root` the root and discard everything no longer reachable
    ///
    /// Node ids are reassigned; the new root keeps its level and statistics.
    pub fn reroot(&mut self, new_root: NodeId) {
        let mut order = Vec::new();
        let mut reachable = vec![false; self.nodes.len()];
        let mut stack = vec![new_root];
        while let Some(id) = stack.pop() {
            if reachable[id.0] {
                continue;
            }
            reachable[id.0] = true;
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().copied());
        }
        order.sort();

        let mut remap: HashMap<NodeId, NodeId> = HashMap::with_capacity(order.len());
        for (i, old) in order.iter().enumerate() {
            remap.insert(*old, NodeId(i));
        }

        let mut old_nodes: Vec<Option<SearchNode>> = std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        let mut nodes = Vec::with_capacity(order.len());
        for old in order.iter() {
            if let Some(mut node) = old_nodes[old.0].take() {
                node.parents = node.parents.iter().filter_map(|p| remap.get(p).copied()).collect();
                node.children = node.children.iter().filter_map(|c| remap.get(c).copied()).collect();
                if *old == new_root {
                    node.parents.clear();
                }
                nodes.push(node);
            }
        }

        self.visited = nodes.iter().enumerate().map(|(i, n)| (n.footstep, NodeId(i))).collect();
        self.root = remap.get(&new_root).copied().unwrap_or(NodeId(0));
        self.nodes = nodes;
    }

    /// True when no node can reach itself along child edges
    pub fn is_acyclic(&self) -> bool {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.parents.len()).collect();
        let mut ready: Vec<usize> = (0..self.nodes.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut processed = 0;
        while let Some(i) = ready.pop() {
            processed += 1;
            for child in &self.nodes[i].children {
                in_degree[child.0] -= 1;
                if in_degree[child.0] == 0 {
                    ready.push(child.0);
                }
            }
        }
        processed == self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RobotSide;

    fn step(x: i32, side: RobotSide) -> FootstepNode {
        FootstepNode::new(x, if side == RobotSide::Left { 2 } else { -2 }, 0, side)
    }

    fn snap() -> Arc<SnapData> {
        Arc::new(SnapData::invalid())
    }

    /// root -> a, root -> b, a -> d, b -> d
    fn diamond() -> (SearchGraph, [NodeId; 4]) {
        let mut graph = SearchGraph::new(step(0, RobotSide::Left), snap(), Some(1));
        let root = graph.root();
        let a = graph.insert_child(root, step(3, RobotSide::Right), snap(), Some(1));
        let b = graph.insert_child(root, step(4, RobotSide::Right), snap(), Some(1));
        let d = graph.insert_child(a, step(8, RobotSide::Left), snap(), Some(1));
        assert!(graph.add_child(b, d));
        (graph, [root, a, b, d])
    }

    #[test]
    fn test_add_child_is_idempotent() {
        let (mut graph, [_, a, _, d]) = diamond();
        assert!(!graph.add_child(a, d));
        assert_eq!(graph.node(a).children().len(), 1);
        assert_eq!(graph.node(d).parents().len(), 2);
    }

    #[test]
    fn test_diamond_back_propagation_counts_once() {
        let (mut graph, [root, a, b, d]) = diamond();
        graph.back_propagate(d, 2.0);
        graph.back_propagate(d, 1.0);
        assert_eq!(graph.node(d).visits(), 2);
        assert_eq!(graph.node(a).visits(), 2);
        assert_eq!(graph.node(b).visits(), 2);
        assert_eq!(graph.node(root).visits(), 2);
        assert!((graph.node(root).value() - 3.0).abs() < 1e-12);
        assert!((graph.node(d).mean_value() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_ucb_prefers_unvisited() {
        let (mut graph, [root, a, b, _]) = diamond();
        graph.back_propagate(a, 10.0);
        graph.back_propagate(root, 0.0);
        assert_eq!(graph.select_child(root, 1.0), Some(b));
        assert!(graph.node(b).upper_confidence_bound().is_infinite());

        graph.back_propagate(b, -10.0);
        assert_eq!(graph.select_child(root, 1.0), Some(a));
    }

    #[test]
    fn test_best_child_uses_mean_value() {
        let (mut graph, [root, a, b, _]) = diamond();
        assert_eq!(graph.best_child(root), None);
        graph.back_propagate(a, 1.0);
        graph.back_propagate(a, 1.0);
        graph.back_propagate(b, 1.5);
        assert_eq!(graph.best_child(root), Some(b));
    }

    #[test]
    fn test_prune_only_on_version_change() {
        let (mut graph, [root, a, b, _]) = diamond();
        assert_eq!(graph.prune(root, Some(1), |_, _| false), 0);
        assert_eq!(graph.node(root).children().len(), 2);

        let removed = graph.prune(root, Some(2), |_, child| child.footstep().x_index != 4);
        assert_eq!(removed, 1);
        assert_eq!(graph.node(root).children(), &[a]);
        assert!(graph.node(b).parents().is_empty());
    }

    #[test]
    fn test_reroot_discards_unreachable() {
        let (mut graph, [_, a, _, d]) = diamond();
        let d_step = *graph.node(d).footstep();
        let a_step = *graph.node(a).footstep();
        graph.back_propagate(d, 1.0);

        graph.reroot(a);
        assert_eq!(graph.len(), 2);
        let root = graph.root();
        assert_eq!(graph.node(root).footstep(), &a_step);
        assert!(graph.node(root).parents().is_empty());
        assert_eq!(graph.node(root).level(), 1);

        let new_d = graph.find(&d_step).unwrap();
        assert_eq!(graph.node(new_d).parents(), &[root]);
        assert_eq!(graph.node(new_d).visits(), 1);
        assert!(graph.find(&step(0, RobotSide::Left)).is_none());
        assert!(graph.is_acyclic());
    }

    #[test]
    fn test_diamond_is_acyclic_with_consistent_levels() {
        let (graph, _) = diamond();
        assert!(graph.is_acyclic());
        for (_, node) in graph.iter() {
            if let Some(min_parent) = node.parents().iter().map(|p| graph.node(*p).level()).min() {
                assert_eq!(node.level(), min_parent + 1);
            }
        }
    }
}

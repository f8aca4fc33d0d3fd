//! Footstep lattice
//!
//! Continuous foot placements are discretized onto a regular (x, y, yaw)
//! lattice so that the search can recognize the same placement reached
//! through different step sequences.

use itertools::iproduct;

use crate::common::{normalize_angle, Pose2D, RobotSide};

use super::config::{LatticeConfig, StepEnvelopeConfig};

/// Lattice index of a continuous coordinate
///
/// Non-finite input yields an unspecified index; callers validate first.
pub fn to_index(value: f64, resolution: f64) -> i32 {
    (value / resolution).round() as i32
}

/// Continuous coordinate of a lattice index
pub fn to_continuous(index: i32, resolution: f64) -> f64 {
    index as f64 * resolution
}

/// Wrap a yaw index into `[-divisions / 2, divisions / 2)`
pub fn wrap_yaw_index(index: i32, divisions: u32) -> i32 {
    let n = divisions as i32;
    (index + n / 2).rem_euclid(n) - n / 2
}

/// Yaw lattice index of an angle
pub fn yaw_to_index(yaw: f64, divisions: u32) -> i32 {
    let resolution = 2.0 * std::f64::consts::PI / divisions as f64;
    wrap_yaw_index(to_index(normalize_angle(yaw), resolution), divisions)
}

/// Angle of a yaw lattice index
pub fn index_to_yaw(index: i32, divisions: u32) -> f64 {
    let resolution = 2.0 * std::f64::consts::PI / divisions as f64;
    to_continuous(wrap_yaw_index(index, divisions), resolution)
}

/// Smallest number of yaw cells between two yaw indices
pub fn yaw_index_distance(a: i32, b: i32, divisions: u32) -> i32 {
    wrap_yaw_index(a - b, divisions).abs()
}

/// Positional part of a lattice node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LatticeCell {
    pub x_index: i32,
    pub y_index: i32,
}

impl LatticeCell {
    pub fn new(x_index: i32, y_index: i32) -> Self {
        Self { x_index, y_index }
    }

    pub fn from_position(x: f64, y: f64, resolution: f64) -> Self {
        Self::new(to_index(x, resolution), to_index(y, resolution))
    }

    pub fn x(&self, resolution: f64) -> f64 {
        to_continuous(self.x_index, resolution)
    }

    pub fn y(&self, resolution: f64) -> f64 {
        to_continuous(self.y_index, resolution)
    }
}

/// Discretized foot placement; the key of the search graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FootstepNode {
    pub x_index: i32,
    pub y_index: i32,
    pub yaw_index: i32,
    pub side: RobotSide,
}

impl FootstepNode {
    pub fn new(x_index: i32, y_index: i32, yaw_index: i32, side: RobotSide) -> Self {
        Self {
            x_index,
            y_index,
            yaw_index,
            side,
        }
    }

    /// Node closest to a continuous foot pose
    pub fn from_pose(pose: &Pose2D, side: RobotSide, lattice: &LatticeConfig) -> Self {
        Self::new(
            to_index(pose.x, lattice.xy_resolution),
            to_index(pose.y, lattice.xy_resolution),
            yaw_to_index(pose.yaw, lattice.yaw_divisions),
            side,
        )
    }

    pub fn cell(&self) -> LatticeCell {
        LatticeCell::new(self.x_index, self.y_index)
    }

    pub fn x(&self, lattice: &LatticeConfig) -> f64 {
        to_continuous(self.x_index, lattice.xy_resolution)
    }

    pub fn y(&self, lattice: &LatticeConfig) -> f64 {
        to_continuous(self.y_index, lattice.xy_resolution)
    }

    pub fn yaw(&self, lattice: &LatticeConfig) -> f64 {
        index_to_yaw(self.yaw_index, lattice.yaw_divisions)
    }

    pub fn pose(&self, lattice: &LatticeConfig) -> Pose2D {
        Pose2D::new(self.x(lattice), self.y(lattice), self.yaw(lattice))
    }
}

/// Evenly spaced samples over `[min, max]`; the midpoint for a single sample
fn samples(min: f64, max: f64, count: usize) -> Vec<f64> {
    if count <= 1 {
        return vec![(min + max) / 2.0];
    }
    (0..count)
        .map(|i| min + (max - min) * i as f64 / (count - 1) as f64)
        .collect()
}

fn dedup_in_order(values: Vec<i32>) -> Vec<i32> {
    let mut out: Vec<i32> = Vec::with_capacity(values.len());
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// Successor footsteps of `stance` inside the step envelope
///
/// Successors are placed for the opposite foot, offset forward by the
/// sampled step length and sideways by the sampled step width in the
/// stance foot's frame, then snapped onto the lattice. Order is stable:
/// length-major, then width, then yaw.
pub fn successors(
    stance: &FootstepNode,
    envelope: &StepEnvelopeConfig,
    lattice: &LatticeConfig,
) -> Vec<FootstepNode> {
    let res = lattice.xy_resolution;
    let swing_side = stance.side.opposite();
    let stance_pose = stance.pose(lattice);

    let lengths = dedup_in_order(
        samples(envelope.min_step_length, envelope.max_step_length, envelope.length_samples)
            .into_iter()
            .map(|v| to_index(v, res))
            .collect(),
    );
    let widths = dedup_in_order(
        samples(envelope.min_step_width, envelope.max_step_width, envelope.width_samples)
            .into_iter()
            .map(|v| to_index(v, res))
            .collect(),
    );
    let max_yaw_cells = envelope.max_step_yaw / lattice.yaw_resolution();
    let yaws = dedup_in_order(
        samples(-max_yaw_cells, max_yaw_cells, envelope.yaw_samples)
            .into_iter()
            .map(|v| v.round() as i32)
            .collect(),
    );

    let mut out = Vec::with_capacity(lengths.len() * widths.len() * yaws.len());
    for (dx, dw, dyaw) in iproduct!(lengths, widths, yaws) {
        let offset_x = to_continuous(dx, res);
        let offset_y = swing_side.sign() * to_continuous(dw, res);
        let p = stance_pose.transform_point(offset_x, offset_y);
        let node = FootstepNode::new(
            to_index(p.x, res),
            to_index(p.y, res),
            wrap_yaw_index(stance.yaw_index + dyaw, lattice.yaw_divisions),
            swing_side,
        );
        if !out.contains(&node) {
            out.push(node);
        }
    }
    out
}

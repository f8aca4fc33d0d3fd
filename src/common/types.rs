//! Common types used throughout rust_footstep_planning

use nalgebra::{Isometry3, UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

impl From<Vector2<f64>> for Point2D {
    fn from(v: Vector2<f64>) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

/// 2D pose (position + orientation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl Pose2D {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0, yaw: 0.0 }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.yaw.is_finite()
    }

    /// Point expressed in this pose's frame, mapped into the world frame
    pub fn transform_point(&self, local_x: f64, local_y: f64) -> Point2D {
        let (s, c) = self.yaw.sin_cos();
        Point2D::new(
            self.x + c * local_x - s * local_y,
            self.y + s * local_x + c * local_y,
        )
    }

    /// Planar pose of a 3D isometry (yaw taken from the rotation)
    pub fn from_isometry(pose: &Isometry3<f64>) -> Self {
        let (_, _, yaw) = pose.rotation.euler_angles();
        Self::new(pose.translation.x, pose.translation.y, yaw)
    }

    /// Lift into 3D at the given height
    pub fn to_isometry(&self, z: f64) -> Isometry3<f64> {
        Isometry3::from_parts(
            Vector3::new(self.x, self.y, z).into(),
            UnitQuaternion::from_euler_angles(0.0, 0.0, self.yaw),
        )
    }

    /// Normalize yaw to [-pi, pi]
    pub fn normalize_yaw(&mut self) {
        self.yaw = normalize_angle(self.yaw);
    }
}

/// Wrap an angle into [-pi, pi]
pub fn normalize_angle(mut angle: f64) -> f64 {
    while angle > std::f64::consts::PI {
        angle -= 2.0 * std::f64::consts::PI;
    }
    while angle < -std::f64::consts::PI {
        angle += 2.0 * std::f64::consts::PI;
    }
    angle
}

/// Which foot a footstep belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotSide {
    Left,
    Right,
}

impl RobotSide {
    pub const ALL: [RobotSide; 2] = [RobotSide::Left, RobotSide::Right];

    pub fn opposite(self) -> Self {
        match self {
            RobotSide::Left => RobotSide::Right,
            RobotSide::Right => RobotSide::Left,
        }
    }

    /// +1 for left, -1 for right (left foot sits on +y in the sole frame)
    pub fn sign(self) -> f64 {
        match self {
            RobotSide::Left => 1.0,
            RobotSide::Right => -1.0,
        }
    }
}

impl std::fmt::Display for RobotSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RobotSide::Left => write!(f, "left"),
            RobotSide::Right => write!(f, "right"),
        }
    }
}

/// A value held once per foot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideDependent<T> {
    pub left: T,
    pub right: T,
}

impl<T> SideDependent<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    pub fn get(&self, side: RobotSide) -> &T {
        match side {
            RobotSide::Left => &self.left,
            RobotSide::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, side: RobotSide) -> &mut T {
        match side {
            RobotSide::Left => &mut self.left,
            RobotSide::Right => &mut self.right,
        }
    }
}

//! Foothold snapping
//!
//! Projects a lattice footstep onto the terrain: picks the supporting
//! region, aligns the sole with it and crops the foot outline to the part
//! that is actually supported.
//!
//! The supporting region is chosen from vertical projections: the highest
//! region under the foot center whose outline overlaps the foot in world
//! XY. The foothold itself is cropped in that region's plane, so on inclined
//! regions the foothold fraction is a true share of the sole area.

use std::sync::Arc;

use nalgebra::{Isometry2, Isometry3, Point2, Point3, Translation3, UnitQuaternion, Vector2, Vector3};

use super::config::{FootConfig, LatticeConfig};
use super::lattice::FootstepNode;
use super::polygon::ConvexPolygon2D;
use super::terrain::{PlanarRegion, TerrainModel};

/// Result of snapping one footstep. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapData {
    /// Sole pose in world
    pub transform: Isometry3<f64>,
    /// Supported part of the sole, in the sole frame
    pub cropped_foothold: ConvexPolygon2D,
    /// Supported share of the nominal sole area
    pub foothold_fraction: f64,
    pub valid: bool,
}

impl SnapData {
    pub fn invalid() -> Self {
        Self {
            transform: Isometry3::identity(),
            cropped_foothold: ConvexPolygon2D::new(),
            foothold_fraction: 0.0,
            valid: false,
        }
    }

    /// Fully supported foot at a measured pose
    pub fn from_pose(transform: Isometry3<f64>, foot: &FootConfig) -> Self {
        Self {
            transform,
            cropped_foothold: ConvexPolygon2D::rectangle(foot.length, foot.width),
            foothold_fraction: 1.0,
            valid: true,
        }
    }

    pub fn height(&self) -> f64 {
        self.transform.translation.z
    }
}

/// Snaps footsteps and remembers the most recent result
pub struct FootholdSnapper {
    foot: FootConfig,
    lattice: LatticeConfig,
    foot_polygon: ConvexPolygon2D,
    last: Option<(FootstepNode, u64, Arc<SnapData>)>,
    invalid: Arc<SnapData>,
    computations: usize,
}

impl FootholdSnapper {
    pub fn new(foot: FootConfig, lattice: LatticeConfig) -> Self {
        let foot_polygon = ConvexPolygon2D::rectangle(foot.length, foot.width);
        Self {
            foot,
            lattice,
            foot_polygon,
            last: None,
            invalid: Arc::new(SnapData::invalid()),
            computations: 0,
        }
    }

    /// Snap `node` onto `terrain`
    ///
    /// Returns the cached result when neither the node nor the terrain
    /// version changed since the previous call. Without terrain every node
    /// is invalid.
    pub fn snap(&mut self, node: &FootstepNode, terrain: Option<&dyn TerrainModel>) -> Arc<SnapData> {
        let terrain = match terrain {
            Some(t) => t,
            None => return Arc::clone(&self.invalid),
        };

        let version = terrain.version();
        if let Some((last_node, last_version, data)) = &self.last {
            if last_node == node && *last_version == version {
                return Arc::clone(data);
            }
        }

        let data = Arc::new(self.compute(node, terrain));
        self.computations += 1;
        self.last = Some((*node, version, Arc::clone(&data)));
        data
    }

    /// Number of snaps that actually ran the geometry
    pub fn computations(&self) -> usize {
        self.computations
    }

    pub fn clear_cache(&mut self) {
        self.last = None;
    }

    pub fn foot(&self) -> &FootConfig {
        &self.foot
    }

    fn compute(&self, node: &FootstepNode, terrain: &dyn TerrainModel) -> SnapData {
        let pose = node.pose(&self.lattice);
        let sole_to_world = Isometry2::new(Vector2::new(pose.x, pose.y), pose.yaw);
        let footprint = self.foot_polygon.transformed(&sole_to_world);

        let mut best: Option<(&PlanarRegion, f64)> = None;
        for region in terrain.regions_near(&footprint) {
            if region.incline() > self.foot.max_surface_incline {
                continue;
            }
            let height = match region.height_at(pose.x, pose.y) {
                Some(h) => h,
                None => continue,
            };
            if footprint.intersection(region.world_polygon()).is_empty() {
                continue;
            }
            if best.map_or(true, |(_, h)| height > h) {
                best = Some((region, height));
            }
        }

        let (region, height) = match best {
            Some(b) => b,
            None => return SnapData::invalid(),
        };

        let yaw_rotation = UnitQuaternion::from_euler_angles(0.0, 0.0, pose.yaw);
        let tilt = UnitQuaternion::rotation_between(&Vector3::z(), &region.normal())
            .unwrap_or_else(UnitQuaternion::identity);
        let transform = Isometry3::from_parts(Translation3::new(pose.x, pose.y, height), tilt * yaw_rotation);

        let cropped = self.crop_in_region_plane(region, &transform);
        let fraction = (cropped.area() / self.foot_polygon.area()).min(1.0);
        if fraction < self.foot.min_foothold_fraction {
            return SnapData::invalid();
        }

        SnapData {
            transform,
            cropped_foothold: cropped,
            foothold_fraction: fraction,
            valid: true,
        }
    }

    /// Part of the sole inside the region, measured in the region plane
    ///
    /// The snapped sole lies in the region plane, so sole and region frames
    /// differ by a planar rigid motion and areas are true surface areas.
    fn crop_in_region_plane(&self, region: &PlanarRegion, sole_to_world: &Isometry3<f64>) -> ConvexPolygon2D {
        let sole_to_region = region.transform_to_world().inverse() * sole_to_world;
        let in_region: Vec<Point2<f64>> = self
            .foot_polygon
            .vertices()
            .iter()
            .map(|v| {
                let p = sole_to_region * Point3::new(v.x, v.y, 0.0);
                Point2::new(p.x, p.y)
            })
            .collect();
        let overlap = ConvexPolygon2D::from_points(&in_region).intersection(region.polygon());

        let region_to_sole = sole_to_region.inverse();
        let in_sole: Vec<Point2<f64>> = overlap
            .vertices()
            .iter()
            .map(|v| {
                let p = region_to_sole * Point3::new(v.x, v.y, 0.0);
                Point2::new(p.x, p.y)
            })
            .collect();
        ConvexPolygon2D::from_points(&in_sole)
    }
}

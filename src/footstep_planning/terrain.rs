//! Terrain as a versioned set of planar regions
//!
//! The planner only reads terrain. Versions come from one process-wide
//! counter: every new list and every mutation gets a value no other list
//! has held, so swapping in a freshly received list is seen as a change
//! just like editing the current one.

use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::{Isometry3, Point2, Point3, Translation3, UnitQuaternion, Vector3};

use super::polygon::ConvexPolygon2D;

/// Surface source consumed by the foothold snapper
pub trait TerrainModel: Send + Sync {
    /// Regions whose footprint overlaps `footprint` (world XY)
    fn regions_near(&self, footprint: &ConvexPolygon2D) -> Vec<&PlanarRegion>;

    /// Identifies the current terrain contents
    ///
    /// Must change on every mutation and differ between separately built
    /// terrain handles; [`next_terrain_version`] hands out such values.
    fn version(&self) -> u64;
}

/// Flat convex patch of terrain
#[derive(Debug, Clone)]
pub struct PlanarRegion {
    transform_to_world: Isometry3<f64>,
    polygon: ConvexPolygon2D,
    world_polygon: ConvexPolygon2D,
}

impl PlanarRegion {
    /// `polygon` lies in the region's local XY plane
    pub fn new(transform_to_world: Isometry3<f64>, polygon: ConvexPolygon2D) -> Self {
        let world_points: Vec<Point2<f64>> = polygon
            .vertices()
            .iter()
            .map(|v| {
                let p = transform_to_world * Point3::new(v.x, v.y, 0.0);
                Point2::new(p.x, p.y)
            })
            .collect();
        Self {
            transform_to_world,
            polygon,
            world_polygon: ConvexPolygon2D::from_points(&world_points),
        }
    }

    /// Horizontal rectangle centered at (x, y) at height z
    pub fn horizontal_rectangle(x: f64, y: f64, z: f64, length: f64, width: f64) -> Self {
        Self::new(
            Isometry3::translation(x, y, z),
            ConvexPolygon2D::rectangle(length, width),
        )
    }

    /// Rectangle centered at (x, y, z), tilted by `roll` and `pitch`
    pub fn tilted_rectangle(x: f64, y: f64, z: f64, roll: f64, pitch: f64, length: f64, width: f64) -> Self {
        Self::new(
            Isometry3::from_parts(
                Translation3::new(x, y, z),
                UnitQuaternion::from_euler_angles(roll, pitch, 0.0),
            ),
            ConvexPolygon2D::rectangle(length, width),
        )
    }

    pub fn transform_to_world(&self) -> &Isometry3<f64> {
        &self.transform_to_world
    }

    pub fn polygon(&self) -> &ConvexPolygon2D {
        &self.polygon
    }

    /// Region outline projected onto world XY
    pub fn world_polygon(&self) -> &ConvexPolygon2D {
        &self.world_polygon
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.transform_to_world.rotation * Vector3::z()
    }

    /// Angle between the surface normal and world up [rad]
    pub fn incline(&self) -> f64 {
        self.normal().z.clamp(-1.0, 1.0).acos()
    }

    /// Height of the supporting plane above (x, y); `None` for vertical regions
    pub fn height_at(&self, x: f64, y: f64) -> Option<f64> {
        let n = self.normal();
        if n.z.abs() < 1e-9 {
            return None;
        }
        let origin = self.transform_to_world.translation.vector;
        Some(origin.z - (n.x * (x - origin.x) + n.y * (y - origin.y)) / n.z)
    }

    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        self.world_polygon.contains(&Point2::new(x, y))
    }
}

static NEXT_TERRAIN_VERSION: AtomicU64 = AtomicU64::new(1);

/// Fresh terrain version, unique within the process
pub fn next_terrain_version() -> u64 {
    NEXT_TERRAIN_VERSION.fetch_add(1, Ordering::Relaxed)
}

/// Versioned list of planar regions
///
/// A clone keeps the version of its source until either one is mutated.
#[derive(Debug, Clone)]
pub struct PlanarRegionsList {
    regions: Vec<PlanarRegion>,
    version: u64,
}

impl Default for PlanarRegionsList {
    fn default() -> Self {
        Self::from_regions(Vec::new())
    }
}

impl PlanarRegionsList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_regions(regions: Vec<PlanarRegion>) -> Self {
        Self {
            regions,
            version: next_terrain_version(),
        }
    }

    pub fn add_region(&mut self, region: PlanarRegion) {
        self.regions.push(region);
        self.version = next_terrain_version();
    }

    pub fn clear(&mut self) {
        self.regions.clear();
        self.version = next_terrain_version();
    }

    pub fn regions(&self) -> &[PlanarRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl TerrainModel for PlanarRegionsList {
    fn regions_near(&self, footprint: &ConvexPolygon2D) -> Vec<&PlanarRegion> {
        self.regions
            .iter()
            .filter(|r| r.world_polygon.bounding_boxes_overlap(footprint))
            .collect()
    }

    fn version(&self) -> u64 {
        self.version
    }
}

//! Convex polygons in the plane
//!
//! Used for foot outlines, planar-region boundaries and the cropped
//! foothold left after intersecting the two.

use nalgebra::{Isometry2, Point2, Vector2};

const EPSILON: f64 = 1e-12;

/// Convex polygon with counter-clockwise vertices
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConvexPolygon2D {
    vertices: Vec<Point2<f64>>,
}

fn cross(o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

impl ConvexPolygon2D {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convex hull of arbitrary points (monotone chain)
    pub fn from_points(points: &[Point2<f64>]) -> Self {
        let mut pts: Vec<Point2<f64>> = points.iter().copied().filter(|p| p.x.is_finite() && p.y.is_finite()).collect();
        pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        pts.dedup_by(|a, b| (a.x - b.x).abs() < EPSILON && (a.y - b.y).abs() < EPSILON);
        if pts.len() < 3 {
            return Self { vertices: pts };
        }

        let mut hull: Vec<Point2<f64>> = Vec::with_capacity(pts.len() * 2);
        for p in pts.iter() {
            while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= EPSILON {
                hull.pop();
            }
            hull.push(*p);
        }
        let lower_len = hull.len() + 1;
        for p in pts.iter().rev().skip(1) {
            while hull.len() >= lower_len && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= EPSILON {
                hull.pop();
            }
            hull.push(*p);
        }
        hull.pop();
        Self { vertices: hull }
    }

    pub fn from_xy(points: &[(f64, f64)]) -> Self {
        let pts: Vec<Point2<f64>> = points.iter().map(|&(x, y)| Point2::new(x, y)).collect();
        Self::from_points(&pts)
    }

    /// Axis-aligned rectangle centered on the origin
    pub fn rectangle(length: f64, width: f64) -> Self {
        let hl = length / 2.0;
        let hw = width / 2.0;
        Self::from_xy(&[(-hl, -hw), (hl, -hw), (hl, hw), (-hl, hw)])
    }

    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Fewer than three vertices or no enclosed area
    pub fn is_empty(&self) -> bool {
        self.vertices.len() < 3 || self.area() <= EPSILON
    }

    pub fn area(&self) -> f64 {
        if self.vertices.len() < 3 {
            return 0.0;
        }
        let n = self.vertices.len();
        let twice: f64 = (0..n)
            .map(|i| {
                let a = &self.vertices[i];
                let b = &self.vertices[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum();
        0.5 * twice.abs()
    }

    pub fn centroid(&self) -> Option<Point2<f64>> {
        if self.vertices.is_empty() {
            return None;
        }
        let area = self.area();
        if area <= EPSILON {
            let sum = self.vertices.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords);
            return Some(Point2::from(sum / self.vertices.len() as f64));
        }
        let n = self.vertices.len();
        let (mut cx, mut cy) = (0.0, 0.0);
        for i in 0..n {
            let a = &self.vertices[i];
            let b = &self.vertices[(i + 1) % n];
            let f = a.x * b.y - b.x * a.y;
            cx += (a.x + b.x) * f;
            cy += (a.y + b.y) * f;
        }
        Some(Point2::new(cx / (6.0 * area), cy / (6.0 * area)))
    }

    /// Inside or on the boundary
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        let n = self.vertices.len();
        (0..n).all(|i| cross(&self.vertices[i], &self.vertices[(i + 1) % n], p) >= -1e-9)
    }

    /// (min, max) corners, `None` when there are no vertices
    pub fn bounding_box(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let first = self.vertices.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &self.vertices[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some((min, max))
    }

    pub fn bounding_boxes_overlap(&self, other: &ConvexPolygon2D) -> bool {
        match (self.bounding_box(), other.bounding_box()) {
            (Some((amin, amax)), Some((bmin, bmax))) => {
                amin.x <= bmax.x && bmin.x <= amax.x && amin.y <= bmax.y && bmin.y <= amax.y
            }
            _ => false,
        }
    }

    pub fn transformed(&self, transform: &Isometry2<f64>) -> Self {
        Self {
            vertices: self.vertices.iter().map(|p| transform * p).collect(),
        }
    }

    /// Intersection with another convex polygon (Sutherland-Hodgman)
    pub fn intersection(&self, clip: &ConvexPolygon2D) -> ConvexPolygon2D {
        if self.vertices.len() < 3 || clip.vertices.len() < 3 {
            return ConvexPolygon2D::new();
        }

        let mut output = self.vertices.clone();
        let n = clip.vertices.len();
        for i in 0..n {
            if output.is_empty() {
                break;
            }
            let edge_start = clip.vertices[i];
            let edge_end = clip.vertices[(i + 1) % n];
            let input = std::mem::take(&mut output);

            for j in 0..input.len() {
                let current = input[j];
                let previous = input[(j + input.len() - 1) % input.len()];
                let current_inside = cross(&edge_start, &edge_end, &current) >= 0.0;
                let previous_inside = cross(&edge_start, &edge_end, &previous) >= 0.0;

                if current_inside {
                    if !previous_inside {
                        if let Some(p) = line_intersection(&previous, &current, &edge_start, &edge_end) {
                            output.push(p);
                        }
                    }
                    output.push(current);
                } else if previous_inside {
                    if let Some(p) = line_intersection(&previous, &current, &edge_start, &edge_end) {
                        output.push(p);
                    }
                }
            }
        }

        ConvexPolygon2D::from_points(&output)
    }
}

/// Intersection of segment p1-p2 with the infinite line through a-b
fn line_intersection(p1: &Point2<f64>, p2: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> Option<Point2<f64>> {
    let d1 = p2 - p1;
    let d2 = b - a;
    let denom = d1.x * d2.y - d1.y * d2.x;
    if denom.abs() < EPSILON {
        return None;
    }
    let t = ((a.x - p1.x) * d2.y - (a.y - p1.y) * d2.x) / denom;
    Some(p1 + d1 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_area_and_centroid() {
        let rect = ConvexPolygon2D::rectangle(0.22, 0.11);
        assert_eq!(rect.len(), 4);
        assert!((rect.area() - 0.22 * 0.11).abs() < 1e-12);
        let c = rect.centroid().unwrap();
        assert!(c.x.abs() < 1e-12 && c.y.abs() < 1e-12);
    }

    #[test]
    fn test_hull_drops_interior_points() {
        let poly = ConvexPolygon2D::from_xy(&[(0.0, 0.0), (1.0, 0.0), (0.5, 0.2), (1.0, 1.0), (0.0, 1.0)]);
        assert_eq!(poly.len(), 4);
        assert!((poly.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_contains() {
        let square = ConvexPolygon2D::from_xy(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert!(square.contains(&Point2::new(0.5, 0.5)));
        assert!(square.contains(&Point2::new(1.0, 0.5)));
        assert!(!square.contains(&Point2::new(1.1, 0.5)));
    }

    #[test]
    fn test_intersection_partial_overlap() {
        let a = ConvexPolygon2D::from_xy(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
        let b = ConvexPolygon2D::from_xy(&[(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]);
        let overlap = a.intersection(&b);
        assert!((overlap.area() - 1.0).abs() < 1e-9);
        assert!(overlap.contains(&Point2::new(1.5, 1.5)));
    }

    #[test]
    fn test_intersection_contained_and_disjoint() {
        let big = ConvexPolygon2D::rectangle(4.0, 4.0);
        let small = ConvexPolygon2D::rectangle(1.0, 0.5);
        assert!((small.intersection(&big).area() - 0.5).abs() < 1e-9);

        let far = small.transformed(&Isometry2::translation(10.0, 0.0));
        assert!(small.intersection(&far).is_empty());
        assert!(!small.bounding_boxes_overlap(&far));
    }

    #[test]
    fn test_transformed_keeps_area() {
        let rect = ConvexPolygon2D::rectangle(0.2, 0.1);
        let moved = rect.transformed(&Isometry2::new(Vector2::new(1.0, -2.0), 0.7));
        assert!((moved.area() - rect.area()).abs() < 1e-12);
        let c = moved.centroid().unwrap();
        assert!((c.x - 1.0).abs() < 1e-9 && (c.y + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_polygon_is_empty() {
        let line = ConvexPolygon2D::from_xy(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        assert!(line.is_empty());
        assert_eq!(line.area(), 0.0);
    }
}

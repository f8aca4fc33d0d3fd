//! Planning world
//!
//! A bounded occupancy grid carrying a goal-distance field. The field is an
//! 8-connected Dijkstra expansion from the goal cell over free cells, so
//! footsteps are scored by how far they are from the goal around obstacles
//! rather than in a straight line.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use crate::common::Point2D;

use super::config::PlanningWorldConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Free,
    Occupied,
}

/// Grid used for goal-distance and occupancy scoring
///
/// `origin` is the center of cell (0, 0); cell centers are spaced by
/// `resolution`, so lattice points with the same resolution land on them.
#[derive(Debug, Clone)]
pub struct PlanningWorld {
    origin: Point2D,
    width: f64,
    height: f64,
    resolution: f64,
    goal_margin: f64,
    cols: usize,
    rows: usize,
    grid: Vec<Occupancy>,
    distance_field: Vec<f64>,
    goal: Option<Point2D>,
}

impl PlanningWorld {
    pub fn new(config: &PlanningWorldConfig) -> Self {
        let cols = (config.width / config.resolution).round().max(0.0) as usize + 1;
        let rows = (config.height / config.resolution).round().max(0.0) as usize + 1;
        Self {
            origin: Point2D::new(config.origin[0], config.origin[1]),
            width: config.width,
            height: config.height,
            resolution: config.resolution,
            goal_margin: config.goal_margin,
            cols,
            rows,
            grid: vec![Occupancy::Free; cols * rows],
            distance_field: Vec::new(),
            goal: None,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn origin(&self) -> Point2D {
        self.origin
    }

    pub fn goal_margin(&self) -> f64 {
        self.goal_margin
    }

    pub fn set_goal_margin(&mut self, goal_margin: f64) {
        self.goal_margin = goal_margin;
    }

    pub fn goal(&self) -> Option<Point2D> {
        self.goal
    }

    /// Grid cell (column, row) containing a world point
    pub fn world_to_cell(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }
        let ix = ((x - self.origin.x) / self.resolution).round();
        let iy = ((y - self.origin.y) / self.resolution).round();
        if ix < 0.0 || iy < 0.0 || ix >= self.cols as f64 || iy >= self.rows as f64 {
            return None;
        }
        Some((ix as usize, iy as usize))
    }

    pub fn cell_center(&self, ix: usize, iy: usize) -> Point2D {
        Point2D::new(
            self.origin.x + ix as f64 * self.resolution,
            self.origin.y + iy as f64 * self.resolution,
        )
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.world_to_cell(x, y).is_some()
    }

    fn index(&self, ix: usize, iy: usize) -> usize {
        iy * self.cols + ix
    }

    pub fn occupancy(&self, x: f64, y: f64) -> Option<Occupancy> {
        self.world_to_cell(x, y).map(|(ix, iy)| self.grid[self.index(ix, iy)])
    }

    /// Mark the cell under (x, y); false when the point is outside the world
    ///
    /// The goal field is stale until the next `update_goal`.
    pub fn set_occupancy(&mut self, x: f64, y: f64, occupancy: Occupancy) -> bool {
        match self.world_to_cell(x, y) {
            Some((ix, iy)) => {
                let i = self.index(ix, iy);
                self.grid[i] = occupancy;
                true
            }
            None => false,
        }
    }

    /// Free every cell and drop the goal field
    pub fn clear(&mut self) {
        self.grid.iter_mut().for_each(|c| *c = Occupancy::Free);
        self.distance_field.clear();
        self.goal = None;
    }

    /// Move the window so that `center` lies in its middle
    ///
    /// The origin moves by whole cells, so cell centers stay on the same
    /// lattice. Occupancy inside both windows is kept, newly covered cells
    /// are free. The goal field is dropped until the next `update_goal`.
    pub fn recenter(&mut self, center: Point2D) {
        let half_x = (self.cols - 1) as f64 * self.resolution / 2.0;
        let half_y = (self.rows - 1) as f64 * self.resolution / 2.0;
        let shift_x = ((center.x - half_x - self.origin.x) / self.resolution).round();
        let shift_y = ((center.y - half_y - self.origin.y) / self.resolution).round();
        if !(shift_x.is_finite() && shift_y.is_finite()) || (shift_x == 0.0 && shift_y == 0.0) {
            return;
        }
        let (sx, sy) = (shift_x as i64, shift_y as i64);

        let mut grid = vec![Occupancy::Free; self.cols * self.rows];
        for iy in 0..self.rows {
            for ix in 0..self.cols {
                let ox = ix as i64 + sx;
                let oy = iy as i64 + sy;
                if ox >= 0 && oy >= 0 && ox < self.cols as i64 && oy < self.rows as i64 {
                    grid[self.index(ix, iy)] = self.grid[self.index(ox as usize, oy as usize)];
                }
            }
        }
        self.grid = grid;
        self.origin = Point2D::new(
            self.origin.x + shift_x * self.resolution,
            self.origin.y + shift_y * self.resolution,
        );
        self.distance_field.clear();
    }

    /// Recompute the goal-distance field for a new goal position
    pub fn update_goal(&mut self, goal: Point2D) {
        self.goal = Some(goal);
        self.distance_field = vec![f64::INFINITY; self.cols * self.rows];

        let (gx, gy) = match self.world_to_cell(goal.x, goal.y) {
            Some(cell) => cell,
            None => {
                self.distance_field.clear();
                return;
            }
        };

        let diagonal = self.resolution * std::f64::consts::SQRT_2;
        let motion: [(i64, i64, f64); 8] = [
            (1, 0, self.resolution),
            (0, 1, self.resolution),
            (-1, 0, self.resolution),
            (0, -1, self.resolution),
            (-1, -1, diagonal),
            (-1, 1, diagonal),
            (1, -1, diagonal),
            (1, 1, diagonal),
        ];

        let start = self.index(gx, gy);
        self.distance_field[start] = 0.0;
        let mut open = BinaryHeap::new();
        open.push(Reverse((OrderedFloat(0.0), gx, gy)));

        while let Some(Reverse((OrderedFloat(cost), ix, iy))) = open.pop() {
            if cost > self.distance_field[self.index(ix, iy)] {
                continue;
            }
            for &(dx, dy, step) in motion.iter() {
                let nx = ix as i64 + dx;
                let ny = iy as i64 + dy;
                if nx < 0 || ny < 0 || nx >= self.cols as i64 || ny >= self.rows as i64 {
                    continue;
                }
                let (nx, ny) = (nx as usize, ny as usize);
                let ni = self.index(nx, ny);
                if self.grid[ni] == Occupancy::Occupied {
                    continue;
                }
                let next = cost + step;
                if next < self.distance_field[ni] {
                    self.distance_field[ni] = next;
                    open.push(Reverse((OrderedFloat(next), nx, ny)));
                }
            }
        }
    }

    fn field_value(&self, x: f64, y: f64) -> Option<f64> {
        if self.distance_field.is_empty() {
            return None;
        }
        let (ix, iy) = self.world_to_cell(x, y)?;
        let d = self.distance_field[self.index(ix, iy)];
        if d.is_finite() {
            Some(d)
        } else {
            None
        }
    }

    /// Distance to the goal around obstacles
    ///
    /// Falls back to the straight-line distance where the field has no
    /// value: goal or point outside the world, or the point cut off from
    /// the goal. Zero when no goal was set.
    pub fn goal_distance(&self, x: f64, y: f64) -> f64 {
        let goal = match self.goal {
            Some(g) => g,
            None => return 0.0,
        };
        self.field_value(x, y)
            .unwrap_or_else(|| Point2D::new(x, y).distance(&goal))
    }

    /// Inside the world, on a free cell and connected to the goal
    pub fn is_valid(&self, x: f64, y: f64) -> bool {
        let (ix, iy) = match self.world_to_cell(x, y) {
            Some(cell) => cell,
            None => return false,
        };
        if self.grid[self.index(ix, iy)] == Occupancy::Occupied {
            return false;
        }
        self.distance_field.is_empty() || self.distance_field[self.index(ix, iy)].is_finite()
    }
}

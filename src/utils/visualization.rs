//! Visualization of terrain and footstep plans
//!
//! Layers are collected first and drawn onto a single gnuplot axes when the
//! figure is saved.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{PlannerError, PlannerResult, Point2D, Pose2D, RobotSide};
use crate::footstep_planning::{ConvexPolygon2D, FootstepPlan, PlanarRegion, PlannedFootstep};

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00FF00";
    pub const BLUE: &str = "#0000FF";
    pub const GRAY: &str = "#808080";

    pub const TERRAIN: &str = GRAY;
    pub const START: &str = GREEN;
    pub const GOAL: &str = BLUE;
    pub const LEFT_FOOT: &str = RED;
    pub const RIGHT_FOOT: &str = "#35C788";
    pub const FOOTHOLD: &str = BLACK;
}

/// Style for outline rendering
#[derive(Debug, Clone)]
pub struct OutlineStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: Option<String>,
}

impl OutlineStyle {
    pub fn new(color: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 1.0,
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: &str) -> Self {
        self.caption = Some(caption.to_string());
        self
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

#[derive(Debug, Clone)]
enum Layer {
    Outline {
        x: Vec<f64>,
        y: Vec<f64>,
        style: OutlineStyle,
    },
    Marker {
        point: Point2D,
        color: String,
        caption: String,
    },
}

/// Collects terrain and plan layers and renders them to an image
pub struct FootstepPlotter {
    layers: Vec<Layer>,
    title: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
}

impl FootstepPlotter {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            title: String::new(),
            x_range: None,
            y_range: None,
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_x_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.x_range = Some((min, max));
        self
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.y_range = Some((min, max));
        self
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Closed outline of a world-frame polygon
    pub fn plot_polygon(&mut self, polygon: &ConvexPolygon2D, style: OutlineStyle) -> &mut Self {
        if polygon.len() < 2 {
            return self;
        }
        let mut x: Vec<f64> = polygon.vertices().iter().map(|p| p.x).collect();
        let mut y: Vec<f64> = polygon.vertices().iter().map(|p| p.y).collect();
        x.push(x[0]);
        y.push(y[0]);
        self.layers.push(Layer::Outline { x, y, style });
        self
    }

    pub fn plot_regions(&mut self, regions: &[PlanarRegion]) -> &mut Self {
        for (i, region) in regions.iter().enumerate() {
            let mut style = OutlineStyle::new(colors::TERRAIN);
            if i == 0 {
                style = style.with_caption("Terrain");
            }
            self.plot_polygon(region.world_polygon(), style);
        }
        self
    }

    /// Foot outline and supported foothold of one step
    pub fn plot_footstep(&mut self, step: &PlannedFootstep, foot_length: f64, foot_width: f64) -> &mut Self {
        let pose = step.planar_pose();
        let sole_to_world = nalgebra::Isometry2::new(nalgebra::Vector2::new(pose.x, pose.y), pose.yaw);
        let color = match step.side {
            RobotSide::Left => colors::LEFT_FOOT,
            RobotSide::Right => colors::RIGHT_FOOT,
        };
        let outline = ConvexPolygon2D::rectangle(foot_length, foot_width).transformed(&sole_to_world);
        self.plot_polygon(&outline, OutlineStyle::new(color).with_line_width(2.0));
        let foothold = step.foothold.transformed(&sole_to_world);
        self.plot_polygon(&foothold, OutlineStyle::new(colors::FOOTHOLD))
    }

    pub fn plot_plan(&mut self, plan: &FootstepPlan, foot_length: f64, foot_width: f64) -> &mut Self {
        for step in plan {
            self.plot_footstep(step, foot_length, foot_width);
        }
        self
    }

    pub fn plot_start(&mut self, pose: &Pose2D) -> &mut Self {
        self.layers.push(Layer::Marker {
            point: pose.position(),
            color: colors::START.to_string(),
            caption: "Start".to_string(),
        });
        self
    }

    pub fn plot_goal(&mut self, pose: &Pose2D) -> &mut Self {
        self.layers.push(Layer::Marker {
            point: pose.position(),
            color: colors::GOAL.to_string(),
            caption: "Goal".to_string(),
        });
        self
    }

    fn render(&self) -> Figure {
        let mut figure = Figure::new();
        let axes = figure.axes2d();

        for layer in &self.layers {
            match layer {
                Layer::Outline { x, y, style } => {
                    let mut options = vec![Color(style.color.as_str()), LineWidth(style.line_width)];
                    if let Some(caption) = &style.caption {
                        options.push(Caption(caption.as_str()));
                    }
                    axes.lines(x, y, &options);
                }
                Layer::Marker { point, color, caption } => {
                    axes.points(
                        &[point.x],
                        &[point.y],
                        &[Caption(caption.as_str()), Color(color.as_str()), PointSymbol('O'), PointSize(1.5)],
                    );
                }
            }
        }

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label("X [m]", &[]);
        axes.set_y_label("Y [m]", &[]);
        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        axes.set_aspect_ratio(AutoOption::Fix(1.0));
        figure
    }

    /// Save to PNG file
    pub fn save_png(&self, path: &str, width: u32, height: u32) -> PlannerResult<()> {
        let mut figure = self.render();
        figure
            .save_to_png(path, width, height)
            .map_err(|e| PlannerError::Visualization(e.to_string()))
    }
}

impl Default for FootstepPlotter {
    fn default() -> Self {
        Self::new()
    }
}

//! Interactive controls created by node scripts.
//!
//! A control is identified by its owning node and the call site that created
//! it; that key lives in the [`ViewportScene`](crate::viewport_scene) registry,
//! not on the control itself.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::ControlDefaults;
use crate::drag::Feedback;

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Point,
    Wireframe,
}

/// A draggable point.
#[derive(Debug, Clone)]
pub struct PointControl {
    position: Vec3,
    radius: f32,
    color: Color,
    /// Pass drag deltas (true) or absolute positions (false) to the feedback routine.
    relative: bool,
    feedback: Feedback,
    touched: bool,
    dragging: bool,
}

impl PointControl {
    pub fn new(feedback: Feedback, defaults: &ControlDefaults) -> Self {
        Self {
            position: Vec3::ZERO,
            radius: defaults.point_radius,
            color: defaults.point_color,
            relative: defaults.point_relative,
            feedback,
            touched: false,
            dragging: false,
        }
    }

    /// Apply every script-controlled attribute at once.
    pub fn update(&mut self, position: Vec3, radius: f32, color: Color, relative: bool) {
        self.position = position;
        self.radius = radius;
        self.color = color;
        self.relative = relative;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn relative(&self) -> bool {
        self.relative
    }

    pub fn feedback(&self) -> &Feedback {
        &self.feedback
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// Move the point by `delta` and return the values its feedback routine
    /// should receive.
    pub fn drag_by(&mut self, delta: Vec3) -> Vec3 {
        self.position += delta;
        if self.relative {
            delta
        } else {
            self.position
        }
    }
}

/// A polyline (or loop) through one or more points.
#[derive(Debug, Clone)]
pub struct WireframeControl {
    points: Vec<Vec3>,
    thickness: f32,
    color: Color,
    closed: bool,
    touched: bool,
}

impl WireframeControl {
    pub fn new(defaults: &ControlDefaults) -> Self {
        Self {
            points: Vec::new(),
            thickness: defaults.wireframe_thickness,
            color: defaults.wireframe_color,
            closed: defaults.wireframe_closed,
            touched: false,
        }
    }

    /// Apply every script-controlled attribute at once. Callers validate that
    /// `points` is non-empty.
    pub fn update(&mut self, points: Vec<Vec3>, thickness: f32, color: Color, closed: bool) {
        debug_assert!(!points.is_empty(), "wireframe updated with no points");
        self.points = points;
        self.thickness = thickness;
        self.color = color;
        self.closed = closed;
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn thickness(&self) -> f32 {
        self.thickness
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn closed(&self) -> bool {
        self.closed
    }
}

/// A control living in the viewport.
#[derive(Debug, Clone)]
pub enum Control {
    Point(PointControl),
    Wireframe(WireframeControl),
}

impl Control {
    pub fn kind(&self) -> ControlKind {
        match self {
            Control::Point(_) => ControlKind::Point,
            Control::Wireframe(_) => ControlKind::Wireframe,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Control::Point(p) => p.color,
            Control::Wireframe(w) => w.color,
        }
    }

    /// Mark the control as updated during the current evaluation pass.
    pub fn touch(&mut self) {
        match self {
            Control::Point(p) => p.touched = true,
            Control::Wireframe(w) => w.touched = true,
        }
    }

    pub fn untouch(&mut self) {
        match self {
            Control::Point(p) => p.touched = false,
            Control::Wireframe(w) => w.touched = false,
        }
    }

    pub fn is_touched(&self) -> bool {
        match self {
            Control::Point(p) => p.touched,
            Control::Wireframe(w) => w.touched,
        }
    }

    pub fn is_dragging(&self) -> bool {
        match self {
            Control::Point(p) => p.dragging,
            Control::Wireframe(_) => false,
        }
    }

    pub fn as_point(&self) -> Option<&PointControl> {
        match self {
            Control::Point(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_point_mut(&mut self) -> Option<&mut PointControl> {
        match self {
            Control::Point(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_wireframe(&self) -> Option<&WireframeControl> {
        match self {
            Control::Wireframe(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_wireframe_mut(&mut self) -> Option<&mut WireframeControl> {
        match self {
            Control::Wireframe(w) => Some(w),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::DragPlan;

    fn point() -> PointControl {
        PointControl::new(Feedback::Synthesized(DragPlan::default()), &ControlDefaults::default())
    }

    #[test]
    fn test_point_defaults() {
        let p = point();
        let defaults = ControlDefaults::default();
        assert_eq!(p.radius(), defaults.point_radius);
        assert_eq!(p.color(), defaults.point_color);
        assert!(p.relative());
        assert!(!p.is_dragging());
    }

    #[test]
    fn test_drag_by_relative_and_absolute() {
        let mut p = point();
        p.update(Vec3::new(1.0, 1.0, 1.0), 0.1, Color::WHITE, true);
        assert_eq!(p.drag_by(Vec3::new(2.0, 0.0, 0.0)), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(p.position(), Vec3::new(3.0, 1.0, 1.0));

        p.update(Vec3::new(1.0, 1.0, 1.0), 0.1, Color::WHITE, false);
        assert_eq!(p.drag_by(Vec3::new(0.0, 1.0, 0.0)), Vec3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn test_touch_flags() {
        let mut c = Control::Point(point());
        assert!(!c.is_touched());
        c.touch();
        assert!(c.is_touched());
        c.untouch();
        assert!(!c.is_touched());
    }

    #[test]
    fn test_wireframe_update() {
        let mut w = WireframeControl::new(&ControlDefaults::default());
        w.update(vec![Vec3::ZERO], 2.0, Color::new(1, 2, 3), true);
        assert_eq!(w.points().len(), 1);
        assert_eq!(w.thickness(), 2.0);
        assert!(w.closed());
        let c = Control::Wireframe(w);
        assert_eq!(c.kind(), ControlKind::Wireframe);
        assert!(!c.is_dragging());
    }
}

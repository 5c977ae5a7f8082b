use serde::{Deserialize, Serialize};

/// A point in board millimetres, as produced by the [`normalize`](crate::normalize) module.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate, board millimetres.
    pub x: f64,
    /// Y coordinate, board millimetres.
    pub y: f64,
    /// Whether the pen is down while travelling to this point.
    #[serde(default, rename = "penDown")]
    pub pen_down: bool,
}

impl Point {
    /// Build a point, defaulting `pen_down` to `false`.
    pub fn new(x: f64, y: f64, pen_down: bool) -> Self {
        Self { x, y, pen_down }
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A point expressed as cable lengths from the two motors, the wire shape
/// the controller actually consumes. Never constructed by callers directly —
/// produced by [`crate::geometry::Geometry::to_cable`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CablePoint {
    /// Length of the left motor's cable to the pen carriage, millimetres.
    pub l1: f64,
    /// Length of the right motor's cable to the pen carriage, millimetres.
    pub l2: f64,
    /// Whether the pen is down while travelling to this point.
    #[serde(default, rename = "penDown")]
    pub pen_down: bool,
}

//! Kinematic transform between board coordinates and cable lengths.

use crate::point::{CablePoint, Point};

/// Device calibration for a polargraph board.
///
/// `carriage_offset` is half the distance between the two cable attachment
/// points on the pen carriage; the values here are device-specific and are
/// never hardcoded into the transform itself. The `Default` impl carries the
/// calibration of the reference device this crate was developed against —
/// callers with a different board should always supply their own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// Horizontal distance between the two motors, millimetres.
    pub board_width_mm: f64,
    /// Vertical offset of the motors above the drawable area, millimetres.
    pub motor_offset_y_mm: f64,
    /// Half the distance between the two cable attachment points on the carriage, millimetres.
    pub carriage_offset_mm: f64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            board_width_mm: 1150.0,
            motor_offset_y_mm: 60.0,
            carriage_offset_mm: 29.0,
        }
    }
}

impl Geometry {
    /// Map a board point to cable lengths. Pure, total, deterministic.
    pub fn to_cable(&self, point: Point) -> CablePoint {
        let dx_left = point.x - self.carriage_offset_mm;
        let dx_right = self.board_width_mm - (point.x + self.carriage_offset_mm);
        let y_rel = point.y + self.motor_offset_y_mm;

        let l1 = (dx_left * dx_left + y_rel * y_rel).sqrt();
        let l2 = (dx_right * dx_right + y_rel * y_rel).sqrt();

        CablePoint {
            l1,
            l2,
            pen_down: point.pen_down,
        }
    }

    /// Inverse of [`to_cable`](Self::to_cable): recover `(x, y)` from cable
    /// lengths by intersecting the two circles centered at the motors.
    ///
    /// Test-only diagnostic, grounded in the original project's
    /// `Polargraph.xy_from_lengths`; not part of the production API since
    /// the core never needs to invert a cable length back to a point.
    #[cfg(test)]
    fn xy_from_lengths(&self, l1: f64, l2: f64) -> Option<(f64, f64)> {
        // Motors sit at (carriage_offset, -motor_offset_y) and
        // (board_width - carriage_offset, -motor_offset_y) in the same frame
        // `to_cable` measures from, so the carriage offset and y shift cancel
        // out when we translate the intersection back to board coordinates.
        let x0 = self.carriage_offset_mm;
        let x1 = self.board_width_mm - self.carriage_offset_mm;
        let y0 = -self.motor_offset_y_mm;
        let y1 = -self.motor_offset_y_mm;

        let dx = x1 - x0;
        let dy = y1 - y0;
        let d = (dx * dx + dy * dy).sqrt();
        if d == 0.0 {
            return None;
        }

        if l1 + l2 < d - 1e-9 || (l1 - l2).abs() > d + 1e-9 {
            return None;
        }

        let a = (l1 * l1 - l2 * l2 + d * d) / (2.0 * d);
        let h_sq = (l1 * l1 - a * a).max(0.0);
        let h = h_sq.sqrt();

        let xm = x0 + a * dx / d;
        let ym = y0 + a * dy / d;

        let rx = -dy * (h / d);
        let ry = dx * (h / d);

        let (xi1, yi1) = (xm + rx, ym + ry);
        let (xi2, yi2) = (xm - rx, ym - ry);

        // The transform's y axis grows downward from the motor baseline, so
        // the physically relevant solution is the one with the larger y.
        if yi1 >= yi2 {
            Some((xi1, yi1))
        } else {
            Some((xi2, yi2))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_cable_is_finite_for_in_bounds_points() {
        let geometry = Geometry::default();
        for x in [0.0, 100.0, 575.0, 1000.0, 1150.0] {
            for y in [0.0, 200.0, 900.0] {
                let cable = geometry.to_cable(Point::new(x, y, false));
                assert!(cable.l1.is_finite());
                assert!(cable.l2.is_finite());
                assert!(cable.l1 >= 0.0);
                assert!(cable.l2 >= 0.0);
            }
        }
    }

    #[test]
    fn to_cable_is_finite_outside_motor_baseline() {
        let geometry = Geometry::default();
        let cable = geometry.to_cable(Point::new(-50.0, -10.0, true));
        assert!(cable.l1.is_finite());
        assert!(cable.l2.is_finite());
    }

    #[test]
    fn round_trip_through_inverse_geometry() {
        let geometry = Geometry::default();
        let points = [(50.0, 50.0), (575.0, 400.0), (1000.0, 800.0), (300.0, 10.0)];
        for (x, y) in points {
            let cable = geometry.to_cable(Point::new(x, y, false));
            let (rx, ry) = geometry
                .xy_from_lengths(cable.l1, cable.l2)
                .expect("in-bounds point must invert");
            assert!((rx - x).abs() < 1e-6, "x: {rx} vs {x}");
            assert!((ry - y).abs() < 1e-6, "y: {ry} vs {y}");
        }
    }

    #[test]
    fn pen_down_flag_is_preserved() {
        let geometry = Geometry::default();
        let cable = geometry.to_cable(Point::new(10.0, 10.0, true));
        assert!(cable.pen_down);
    }
}

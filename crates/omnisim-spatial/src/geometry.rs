//! Planar geometry kernel.
//!
//! Pure functions over [`Point`]s and [`Shape`]s: Euclidean distance, the
//! classic orientation / on-segment / segment-intersection tests, world-frame
//! outlines of node footprints, and angle normalization.
//!
//! # Example
//!
//! ```rust
//! use omnisim_spatial::geometry::{distance, segments_intersect};
//! use omnisim_types::Point;
//!
//! let a = Point::new(0.0, 0.0);
//! let b = Point::new(3.0, 4.0);
//! assert!((distance(a, b) - 5.0).abs() < 1e-9);
//!
//! // The diagonals of a square cross.
//! assert!(segments_intersect(
//!     Point::new(0.0, 0.0), Point::new(2.0, 2.0),
//!     Point::new(0.0, 2.0), Point::new(2.0, 0.0),
//! ));
//! ```

use std::f64::consts::{PI, TAU};

use omnisim_types::{Point, Pose, Shape, SimError};

use crate::transform::Transform2D;

/// Cross products smaller than this are treated as collinear.
const COLLINEAR_EPS: f64 = 1e-12;

// ────────────────────────────────────────────────────────────────────────────
// Points & segments
// ────────────────────────────────────────────────────────────────────────────

pub fn distance(p1: Point, p2: Point) -> f64 {
    (p2.x - p1.x).hypot(p2.y - p1.y)
}

/// Turn direction of the ordered triple `(p, q, r)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Collinear,
    Clockwise,
    CounterClockwise,
}

/// Sign of the cross product `(q - p) × (r - q)`.
pub fn orientation(p: Point, q: Point, r: Point) -> Orientation {
    let val = (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y);
    if val.abs() < COLLINEAR_EPS {
        Orientation::Collinear
    } else if val > 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::CounterClockwise
    }
}

/// `true` when `q` lies inside the axis-aligned bounding box of `p` and `r`.
///
/// Only meaningful when the three points are already known to be collinear.
pub fn on_segment(p: Point, q: Point, r: Point) -> bool {
    q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
}

/// Does segment `p1–q1` intersect segment `p2–q2`?
///
/// Touching endpoints and collinear overlaps count as intersections.
/// Zero-length segments never intersect anything.
pub fn segments_intersect(p1: Point, q1: Point, p2: Point, q2: Point) -> bool {
    if p1 == q1 || p2 == q2 {
        return false;
    }

    let o1 = orientation(p1, q1, p2);
    let o2 = orientation(p1, q1, q2);
    let o3 = orientation(p2, q2, p1);
    let o4 = orientation(p2, q2, q1);

    if o1 != o2 && o3 != o4 {
        return true;
    }

    (o1 == Orientation::Collinear && on_segment(p1, p2, q1))
        || (o2 == Orientation::Collinear && on_segment(p1, q2, q1))
        || (o3 == Orientation::Collinear && on_segment(p2, p1, q2))
        || (o4 == Orientation::Collinear && on_segment(p2, q1, q2))
}

// ────────────────────────────────────────────────────────────────────────────
// Shapes
// ────────────────────────────────────────────────────────────────────────────

/// Local-frame outline of `shape`, or `None` for unsupported kinds.
fn local_points(shape: &Shape) -> Option<Vec<Point>> {
    let rect = |w: f64, l: f64| {
        let (hw, hl) = (w / 2.0, l / 2.0);
        vec![
            Point::new(-hw, -hl),
            Point::new(hw, -hl),
            Point::new(hw, hl),
            Point::new(-hw, hl),
        ]
    };

    match shape {
        Shape::Rectangle { width, length } => Some(rect(*width, *length)),
        Shape::Square { length } => Some(rect(*length, *length)),
        Shape::Circle { radius } => Some(
            (0..8)
                .map(|i| {
                    let a = f64::from(i) * PI / 4.0;
                    Point::new(radius * a.cos(), radius * a.sin())
                })
                .collect(),
        ),
        Shape::ArbitraryPolygon { points } => Some(points.clone()),
        Shape::Line { start, end } => Some(vec![*start, *end]),
        Shape::Unsupported => None,
    }
}

/// World-frame vertices of `shape` placed at `pose`.
///
/// Rectangles and squares yield 4 corners, circles an 8-point polygon,
/// lines their two endpoints.
///
/// # Errors
///
/// [`SimError::InvalidGeometry`] for shape kinds that cannot be evaluated.
pub fn shape_world_points(pose: &Pose, shape: &Shape) -> Result<Vec<Point>, SimError> {
    let local = local_points(shape).ok_or_else(|| SimError::InvalidGeometry {
        node: format!("({}, {})", pose.x, pose.y),
        details: "unsupported shape kind".to_string(),
    })?;
    let tf = Transform2D::from_pose(pose);
    Ok(local.into_iter().map(|p| tf.apply(p)).collect())
}

/// Edge list of the polygon through `points`.
///
/// Polygons are closed (last vertex joins the first).  Two points yield the
/// single segment between them; fewer yield nothing.
pub fn polygon_edges(points: &[Point]) -> Vec<(Point, Point)> {
    match points.len() {
        0 | 1 => Vec::new(),
        2 => vec![(points[0], points[1])],
        n => (0..n).map(|i| (points[i], points[(i + 1) % n])).collect(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Angles
// ────────────────────────────────────────────────────────────────────────────

/// Wrap an angle in degrees into `(-180, 180]`.
pub fn normalize_angle_deg(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    a
}

/// Wrap an angle in radians into `(-π, π]`.
pub fn normalize_angle_rad(angle: f64) -> f64 {
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

//! 2-D rigid-body transforms.
//!
//! A [`Transform2D`] is the 3×3 homogeneous matrix of a [`Pose`].  Composing
//! a parent's absolute transform with a child's relative transform yields the
//! child's absolute transform:
//!
//! ```text
//! T_child_abs = T_parent_abs · T_child_rel
//! ```
//!
//! # Example
//!
//! ```rust
//! use omnisim_spatial::transform::compose;
//! use omnisim_types::Pose;
//!
//! // A robot at (5, 5) facing +Y carries a sensor 1 m ahead of its origin.
//! let robot = Pose::new(5.0, 5.0, 90.0);
//! let mount = Pose::new(1.0, 0.0, 0.0);
//! let sensor = compose(&robot, &mount);
//! assert!((sensor.x - 5.0).abs() < 1e-9);
//! assert!((sensor.y - 6.0).abs() < 1e-9);
//! assert!((sensor.theta - 90.0).abs() < 1e-9);
//! ```

use omnisim_types::{Point, Pose};

use crate::geometry::normalize_angle_deg;

/// Homogeneous 2-D transform: rotation by `theta` followed by translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    m: [[f64; 3]; 3],
}

impl Transform2D {
    pub fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Build the transform of `pose` (theta in degrees).
    pub fn from_pose(pose: &Pose) -> Self {
        let (s, c) = pose.theta.to_radians().sin_cos();
        Self {
            m: [[c, -s, pose.x], [s, c, pose.y], [0.0, 0.0, 1.0]],
        }
    }

    /// Matrix product `self · other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &Self) -> Self {
        let mut m = [[0.0; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        Self { m }
    }

    /// Recover the pose.  Theta comes from `atan2` of the rotation block and
    /// is normalized to `(-180, 180]`.
    pub fn to_pose(&self) -> Pose {
        let theta = self.m[1][0].atan2(self.m[0][0]).to_degrees();
        Pose::new(self.m[0][2], self.m[1][2], normalize_angle_deg(theta))
    }

    /// Map a point from this transform's local frame into its parent frame.
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.m[0][0] * p.x + self.m[0][1] * p.y + self.m[0][2],
            self.m[1][0] * p.x + self.m[1][1] * p.y + self.m[1][2],
        )
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

/// Absolute pose of a child given its parent's absolute pose and its own
/// pose relative to the parent.
pub fn compose(parent: &Pose, relative: &Pose) -> Pose {
    Transform2D::from_pose(parent)
        .compose(&Transform2D::from_pose(relative))
        .to_pose()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

//! Hierarchical pose store.
//!
//! [`PoseGraph`] mirrors the catalog tree and caches, per node, a **local**
//! pose (the world pose for roots, the mount offset for mounted devices), an
//! optional pan angle, and the derived **absolute** world pose.  After every
//! write the invariant
//!
//! ```text
//! absolute(n) = compose(absolute(parent(n)), local(n) ⊕ pan(n))
//! ```
//!
//! holds for every descendant of the written node.  Interior absolute poses
//! are never written directly; [`PoseGraph::propagate`] is the single
//! recomputation path.
//!
//! # Example
//!
//! ```rust
//! use omnisim_spatial::catalog::Catalog;
//! use omnisim_spatial::pose_graph::PoseGraph;
//! use omnisim_types::{CatalogEntry, MountOffset, NodeClass, NodeId, Pose};
//!
//! let robot = CatalogEntry::new(NodeClass::Composite, "rb_1")
//!     .with_type("robot")
//!     .with_child(
//!         CatalogEntry::new(NodeClass::Sensor, "so_1")
//!             .with_mount(MountOffset::new(1.0, 0.0, 0.0)),
//!     );
//! let catalog = Catalog::from_entries(vec![robot]).unwrap();
//! let mut poses = PoseGraph::from_catalog(&catalog);
//!
//! poses.update_root_pose(NodeId(0), Pose::new(5.0, 5.0, 90.0)).unwrap();
//! let sonar = poses.absolute(NodeId(1)).unwrap();
//! assert!((sonar.x - 5.0).abs() < 1e-9);
//! assert!((sonar.y - 6.0).abs() < 1e-9);
//! ```

use omnisim_types::{NodeId, Pose, SimError};
use tracing::debug;

use crate::catalog::{Catalog, NodeQuery};
use crate::geometry::normalize_angle_deg;
use crate::transform::compose;

#[derive(Debug, Clone, PartialEq)]
struct PoseEntry {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Pose,
    pan_tilt: bool,
    /// Degrees; only non-zero on pan-tilt units.
    pan: f64,
    absolute: Pose,
}

impl PoseEntry {
    /// Local pose with the pan angle folded into the heading.
    fn effective_local(&self) -> Pose {
        Pose::new(self.local.x, self.local.y, self.local.theta + self.pan)
    }
}

/// Tree of cached relative and absolute poses, indexed by [`NodeId`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseGraph {
    entries: Vec<PoseEntry>,
}

impl PoseGraph {
    /// Build the graph for `catalog`: roots start at their initial pose,
    /// mounted nodes at their mount offset, then every tree is propagated.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let entries = catalog
            .nodes()
            .map(|node| {
                let local = if node.is_root() {
                    node.initial_pose
                } else {
                    node.mount.as_pose()
                };
                PoseEntry {
                    parent: node.parent,
                    children: node.children.clone(),
                    local,
                    pan_tilt: node.pan_tilt,
                    pan: 0.0,
                    absolute: local,
                }
            })
            .collect();

        let mut graph = Self { entries };
        for root in catalog.roots() {
            graph.propagate(*root);
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, id: NodeId) -> Result<&PoseEntry, SimError> {
        self.entries
            .get(id.0)
            .ok_or_else(|| SimError::NotFound(format!("pose of node {id}")))
    }

    fn entry_mut(&mut self, id: NodeId) -> Result<&mut PoseEntry, SimError> {
        self.entries
            .get_mut(id.0)
            .ok_or_else(|| SimError::NotFound(format!("pose of node {id}")))
    }

    /// World pose of `id`.
    pub fn absolute(&self, id: NodeId) -> Option<Pose> {
        self.entries.get(id.0).map(|e| e.absolute)
    }

    pub fn pan(&self, id: NodeId) -> Option<f64> {
        self.entries.get(id.0).map(|e| e.pan)
    }

    /// An entity reports its own local pose.
    ///
    /// For a root the pose is its world pose.  For a mounted node it replaces
    /// the cached pose relative to the host.  Either way the node and every
    /// descendant are recomputed.
    pub fn update_root_pose(&mut self, id: NodeId, local: Pose) -> Result<(), SimError> {
        self.entry_mut(id)?.local = local;
        self.propagate(id);
        debug!(node = %id, x = local.x, y = local.y, theta = local.theta, "pose updated");
        Ok(())
    }

    /// A pan-tilt unit reports its pan angle (degrees).  The unit's heading
    /// becomes `host.theta + mount.dtheta + pan` and every mounted device is
    /// re-derived.  A unit without a host pans in the world frame.
    pub fn update_pan_tilt(&mut self, device: NodeId, pan: f64) -> Result<(), SimError> {
        let entry = self.entry_mut(device)?;
        if !entry.pan_tilt {
            return Err(SimError::NotFound(format!("pan-tilt unit {device}")));
        }
        entry.pan = pan;
        self.propagate(device);
        debug!(device = %device, pan, "pan-tilt updated");
        Ok(())
    }

    /// Recompute the absolute pose of `id` and of all its descendants,
    /// parents before children.
    pub fn propagate(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(entry) = self.entries.get(current.0) else {
                continue;
            };
            let local = entry.effective_local();
            let absolute = match entry.parent.and_then(|p| self.absolute(p)) {
                Some(parent_abs) => compose(&parent_abs, &local),
                None => Pose::new(local.x, local.y, normalize_angle_deg(local.theta)),
            };
            let children = entry.children.clone();

            self.entries[current.0].absolute = absolute;
            stack.extend(children.into_iter().rev());
        }
    }

    /// World pose of the first node matching `query` in declaration order.
    /// Not finding one is a normal outcome.
    pub fn lookup(&self, catalog: &Catalog, query: &NodeQuery) -> Option<(NodeId, Pose)> {
        let id = catalog.find(query)?;
        self.absolute(id).map(|pose| (id, pose))
    }

    /// `true` when every cached absolute pose agrees with its parent chain.
    pub fn is_consistent(&self, tolerance: f64) -> bool {
        self.entries.iter().all(|entry| {
            let expected = match entry.parent.and_then(|p| self.absolute(p)) {
                Some(parent_abs) => compose(&parent_abs, &entry.effective_local()),
                None => entry.effective_local(),
            };
            let dtheta = normalize_angle_deg(expected.theta - entry.absolute.theta);
            (expected.x - entry.absolute.x).abs() < tolerance
                && (expected.y - entry.absolute.y).abs() < tolerance
                && dtheta.abs() < tolerance
        })
    }

    /// Parent of `id` as recorded in the graph.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, SimError> {
        Ok(self.entry(id)?.parent)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

//! [`World`] – catalog plus pose graph, the single mutable state of a
//! simulation.
//!
//! All mutation goes through [`World::apply`], which dispatches a
//! [`WorldEvent`] to the pose graph or the catalog.  Readers resolve a node's
//! identity, properties and world pose in one call with [`World::resolve`].
//!
//! When the catalog declares an environment floor, motion that carries a
//! node off it is applied anyway and logged at `warn`.

use omnisim_types::{NodeId, Pose, SimError, WorldEvent};
use tracing::warn;

use crate::catalog::{Catalog, Node, NodeQuery};
use crate::pose_graph::PoseGraph;
use crate::validation::footprint_within;

/// A node together with its current world pose.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub node: &'a Node,
    pub pose: Pose,
}

#[derive(Debug, Clone, PartialEq)]
pub struct World {
    catalog: Catalog,
    poses: PoseGraph,
}

impl World {
    pub fn new(catalog: Catalog) -> Self {
        let poses = PoseGraph::from_catalog(&catalog);
        Self { catalog, poses }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn poses(&self) -> &PoseGraph {
        &self.poses
    }

    /// Apply one event.
    ///
    /// # Errors
    ///
    /// [`SimError::NotFound`] when the event names an unknown node (or a
    /// node that is not a pan-tilt unit, for pan events).  Nothing is
    /// modified in that case.
    pub fn apply(&mut self, event: &WorldEvent) -> Result<(), SimError> {
        match event {
            WorldEvent::Pose(update) => {
                self.poses.update_root_pose(update.node, update.pose())?;
                self.warn_out_of_bounds(update.node);
                Ok(())
            }
            WorldEvent::PanTilt(update) => {
                self.poses.update_pan_tilt(update.device, update.pan)?;
                self.warn_out_of_bounds(update.device);
                Ok(())
            }
            WorldEvent::Property(update) => {
                self.catalog
                    .set_property(update.node, &update.name, update.value)
            }
        }
    }

    /// Nodes of the subtree rooted at `id` whose footprint is off the
    /// environment floor.  Always empty when the catalog declares no floor.
    pub fn out_of_bounds(&self, id: NodeId) -> Vec<NodeId> {
        let Some(bounds) = self.catalog.bounds() else {
            return Vec::new();
        };
        std::iter::once(id)
            .chain(self.catalog.descendants(id))
            .filter(|n| {
                self.resolve(*n).is_some_and(|r| {
                    let shape = r.node.properties.shape.as_ref();
                    matches!(footprint_within(&r.pose, shape, &bounds), Ok(false))
                })
            })
            .collect()
    }

    fn warn_out_of_bounds(&self, id: NodeId) {
        for n in self.out_of_bounds(id) {
            if let Some(node) = self.catalog.get(n) {
                warn!(node = %node.identity, "node moved outside the environment bounds");
            }
        }
    }

    /// Apply a batch in order.  Failing events are logged and skipped; the
    /// number of applied events is returned.
    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a WorldEvent>) -> usize {
        let mut applied = 0;
        for event in events {
            match self.apply(event) {
                Ok(()) => applied += 1,
                Err(e) => warn!(error = %e, "world event dropped"),
            }
        }
        applied
    }

    pub fn pose(&self, id: NodeId) -> Option<Pose> {
        self.poses.absolute(id)
    }

    /// Node and world pose, or `None` (with a warning) when either is missing.
    pub fn resolve(&self, id: NodeId) -> Option<Resolved<'_>> {
        match (self.catalog.get(id), self.poses.absolute(id)) {
            (Some(node), Some(pose)) => Some(Resolved { node, pose }),
            _ => {
                warn!(node = %id, "node has no resolvable pose");
                None
            }
        }
    }

    /// World pose of the first node matching `query`.
    pub fn lookup(&self, query: &NodeQuery) -> Option<(NodeId, Pose)> {
        self.poses.lookup(&self.catalog, query)
    }
}

#[cfg(test)]
mod tests {
    use omnisim_types::{
        CatalogEntry, CatalogFile, EnvironmentBounds, MountOffset, NodeClass, PanTiltUpdate,
        PoseUpdate, PropertyUpdate, Shape,
    };

    use super::*;

    fn world() -> World {
        let robot = CatalogEntry::new(NodeClass::Composite, "rb_1")
            .with_type("robot")
            .with_child(
                CatalogEntry::new(NodeClass::Sensor, "so_1")
                    .with_type("distance")
                    .with_mount(MountOffset::new(1.0, 0.0, 0.0)),
            );
        let fire = CatalogEntry::new(NodeClass::Actor, "fi_1")
            .with_type("fire")
            .with_pose(Pose::new(3.0, 3.0, 0.0));
        World::new(Catalog::from_entries(vec![robot, fire]).unwrap())
    }

    #[test]
    fn pose_event_moves_subtree() {
        let mut w = world();
        w.apply(&WorldEvent::Pose(PoseUpdate {
            node: NodeId(0),
            x: 5.0,
            y: 5.0,
            theta: 90.0,
        }))
        .unwrap();
        let sonar = w.pose(NodeId(1)).unwrap();
        assert!((sonar.x - 5.0).abs() < 1e-9);
        assert!((sonar.y - 6.0).abs() < 1e-9);
    }

    #[test]
    fn property_event_updates_catalog() {
        let mut w = world();
        w.apply(&WorldEvent::Property(PropertyUpdate {
            node: NodeId(2),
            name: "temperature".to_string(),
            value: 400.0,
        }))
        .unwrap();
        let fire = w.resolve(NodeId(2)).unwrap();
        assert_eq!(fire.node.properties.number("temperature"), Some(400.0));
        assert_eq!(fire.pose, Pose::new(3.0, 3.0, 0.0));
    }

    #[test]
    fn batch_skips_bad_events() {
        let mut w = world();
        let events = vec![
            WorldEvent::PanTilt(PanTiltUpdate {
                device: NodeId(1),
                pan: 10.0,
            }),
            WorldEvent::Pose(PoseUpdate {
                node: NodeId(2),
                x: 0.0,
                y: 0.0,
                theta: 0.0,
            }),
        ];
        assert_eq!(w.apply_all(&events), 1);
        assert_eq!(w.pose(NodeId(2)), Some(Pose::origin()));
    }

    #[test]
    fn lookup_and_resolve_missing() {
        let w = world();
        assert!(w
            .lookup(&NodeQuery::new(NodeClass::Actor, "fi_1").with_type("fire"))
            .is_some());
        assert!(w.resolve(NodeId(9)).is_none());
    }

    fn floored_world() -> World {
        let robot = CatalogEntry::new(NodeClass::Composite, "rb_1")
            .with_type("robot")
            .with_pose(Pose::new(5.0, 5.0, 0.0))
            .with_child(
                CatalogEntry::new(NodeClass::Sensor, "so_1")
                    .with_type("distance")
                    .with_mount(MountOffset::new(1.0, 0.0, 0.0)),
            );
        let file = CatalogFile {
            environment: Some(EnvironmentBounds::new(10.0, 10.0)),
            nodes: vec![robot],
        };
        World::new(Catalog::from_file(file).unwrap())
    }

    fn move_robot(w: &mut World, x: f64, y: f64) {
        w.apply(&WorldEvent::Pose(PoseUpdate {
            node: NodeId(0),
            x,
            y,
            theta: 0.0,
        }))
        .unwrap();
    }

    #[test]
    fn motion_on_the_floor_is_in_bounds() {
        let mut w = floored_world();
        move_robot(&mut w, 8.0, 2.0);
        assert!(w.out_of_bounds(NodeId(0)).is_empty());
    }

    #[test]
    fn motion_off_the_floor_is_applied_and_reported() {
        let mut w = floored_world();
        // The robot stays on the floor; its sonar, one metre ahead, does not.
        move_robot(&mut w, 9.5, 2.0);
        assert!((w.pose(NodeId(1)).unwrap().x - 10.5).abs() < 1e-9);
        assert_eq!(w.out_of_bounds(NodeId(0)), vec![NodeId(1)]);

        move_robot(&mut w, -1.0, 2.0);
        assert_eq!(w.out_of_bounds(NodeId(0)), vec![NodeId(0)]);
    }

    #[test]
    fn footprint_counts_not_just_centre() {
        let pallet = CatalogEntry::new(NodeClass::Obstacle, "cr_1")
            .with_pose(Pose::new(2.0, 2.0, 0.0))
            .with_properties(omnisim_types::Properties {
                shape: Some(Shape::Square { length: 2.0 }),
                ..Default::default()
            });
        let file = CatalogFile {
            environment: Some(EnvironmentBounds::new(10.0, 10.0)),
            nodes: vec![pallet],
        };
        let mut w = World::new(Catalog::from_file(file).unwrap());
        w.apply(&WorldEvent::Pose(PoseUpdate {
            node: NodeId(0),
            x: 0.5,
            y: 5.0,
            theta: 0.0,
        }))
        .unwrap();
        assert_eq!(w.out_of_bounds(NodeId(0)), vec![NodeId(0)]);
    }

    #[test]
    fn unbounded_world_never_reports() {
        let mut w = world();
        move_robot(&mut w, -100.0, -100.0);
        assert!(w.out_of_bounds(NodeId(0)).is_empty());
    }
}

use omnisim_affection::primitives::{arced_affection, ranged_affection};
use omnisim_spatial::{Catalog, World};
use omnisim_types::{CatalogEntry, NodeClass, NodeId, Pose, Properties};
use proptest::prelude::*;

fn two_node_world(sensor: Properties, target_at: Pose, target: Properties) -> World {
    let entries = vec![
        CatalogEntry::new(NodeClass::Sensor, "s")
            .with_pose(Pose::origin())
            .with_properties(sensor),
        CatalogEntry::new(NodeClass::Actor, "t")
            .with_pose(target_at)
            .with_properties(target),
    ];
    World::new(Catalog::from_entries(entries).unwrap())
}

fn source(range: f64) -> Properties {
    Properties {
        range: Some(range),
        value: Some(10.0),
        ..Properties::default()
    }
}

#[test]
fn linear_weight_is_bounded() {
    proptest!(|(x in -50.0..50.0f64, y in -50.0..50.0f64, range in 0.1..100.0f64)| {
        let world = two_node_world(Properties::default(), Pose::new(x, y, 0.0), source(range));
        if let Some(hit) = ranged_affection(&world, NodeId(0), NodeId(1)) {
            prop_assert!(hit.distance <= range);
            prop_assert!((0.0..=1.0).contains(&hit.weight));
            prop_assert!((hit.attenuated_value - 10.0 * hit.weight).abs() < 1e-9);
        } else {
            prop_assert!(x.hypot(y) > range);
        }
    });
}

#[test]
fn ranged_weight_is_monotone_in_distance() {
    proptest!(|(near in 0.0..10.0f64, extra in 0.0..10.0f64, range in 20.0..40.0f64)| {
        let far = near + extra;
        let w_near = ranged_affection(
            &two_node_world(Properties::default(), Pose::new(near, 0.0, 0.0), source(range)),
            NodeId(0),
            NodeId(1),
        )
        .unwrap()
        .weight;
        let w_far = ranged_affection(
            &two_node_world(Properties::default(), Pose::new(far, 0.0, 0.0), source(range)),
            NodeId(0),
            NodeId(1),
        )
        .unwrap()
        .weight;
        prop_assert!(w_near >= w_far);
    });
}

#[test]
fn arced_detection_respects_cone() {
    proptest!(|(heading in -180.0..180.0f64, bearing in -180.0..180.0f64, fov in 1.0..359.0f64)| {
        let sensor = Properties {
            range: Some(5.0),
            fov: Some(fov),
            ..Properties::default()
        };
        let b = bearing.to_radians();
        let world = World::new(
            Catalog::from_entries(vec![
                CatalogEntry::new(NodeClass::Sensor, "s")
                    .with_pose(Pose::new(0.0, 0.0, heading))
                    .with_properties(sensor),
                CatalogEntry::new(NodeClass::Actor, "t")
                    .with_pose(Pose::new(2.0 * b.cos(), 2.0 * b.sin(), 0.0)),
            ])
            .unwrap(),
        );
        let off = omnisim_spatial::geometry::normalize_angle_deg(bearing - heading).abs();
        // Stay clear of the cone edge where rounding decides.
        prop_assume!((off - fov / 2.0).abs() > 1e-6);
        let seen = arced_affection(&world, NodeId(0), NodeId(1)).is_some();
        prop_assert_eq!(seen, off < fov / 2.0);
    });
}

#[test]
fn ranged_edge_is_inside_on_both_axes() {
    // 3-4-5 triangle: the target sits exactly at its range.
    let at_edge = two_node_world(Properties::default(), Pose::new(3.0, 4.0, 0.0), source(5.0));
    let hit = ranged_affection(&at_edge, NodeId(0), NodeId(1)).unwrap();
    assert_eq!(hit.distance, 5.0);
    assert_eq!(hit.weight, 0.0);

    let past_edge = two_node_world(Properties::default(), Pose::new(3.0, 4.0 + 1e-9, 0.0), source(5.0));
    assert!(ranged_affection(&past_edge, NodeId(0), NodeId(1)).is_none());
}

fn eye(heading: f64, fov: f64, range: f64, target_at: Pose) -> World {
    let sensor = Properties {
        range: Some(range),
        fov: Some(fov),
        ..Properties::default()
    };
    World::new(
        Catalog::from_entries(vec![
            CatalogEntry::new(NodeClass::Sensor, "s")
                .with_pose(Pose::new(0.0, 0.0, heading))
                .with_properties(sensor),
            CatalogEntry::new(NodeClass::Actor, "t").with_pose(target_at),
        ])
        .unwrap(),
    )
}

#[test]
fn arced_edge_is_inside() {
    let at_edge = eye(0.0, 60.0, 5.0, Pose::new(5.0, 0.0, 0.0));
    let hit = arced_affection(&at_edge, NodeId(0), NodeId(1)).unwrap();
    assert_eq!(hit.distance, 5.0);
    assert_eq!(hit.weight, 0.0);

    let past_edge = eye(0.0, 60.0, 5.0, Pose::new(5.0 + 1e-9, 0.0, 0.0));
    assert!(arced_affection(&past_edge, NodeId(0), NodeId(1)).is_none());
}

#[test]
fn narrow_camera_facing_negative_x() {
    let ahead = eye(180.0, 10.0, 10.0, Pose::new(-1.0, 0.0, 0.0));
    let hit = arced_affection(&ahead, NodeId(0), NodeId(1)).unwrap();
    assert!((hit.distance - 1.0).abs() < 1e-9);
    let arc = hit.arc.unwrap();
    assert!((arc.angle.abs() - 180.0).abs() < 1e-9);
    assert!((arc.fov - 10.0).abs() < 1e-12);

    let beside = eye(180.0, 10.0, 10.0, Pose::new(0.0, 1.0, 0.0));
    assert!(arced_affection(&beside, NodeId(0), NodeId(1)).is_none());

    let behind = eye(180.0, 10.0, 10.0, Pose::new(1.0, 0.0, 0.0));
    assert!(arced_affection(&behind, NodeId(0), NodeId(1)).is_none());
}

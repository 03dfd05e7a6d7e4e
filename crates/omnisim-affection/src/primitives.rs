//! Affection primitives: does a target influence (or get seen by) a sensor,
//! and how strongly?
//!
//! - [`ranged_affection`] – omnidirectional, limited by the **target's**
//!   range (a heater warms everything within its reach).
//! - [`arced_affection`] – directional, limited by the **sensor's** range
//!   and field of view (a camera sees only what is in front of it).
//!
//! Both return `None` for "no influence", including when a pose cannot be
//! resolved.  The range boundary is inclusive: a target exactly at `range`
//! is affected with linear weight 0.

use omnisim_spatial::World;
use omnisim_spatial::catalog::Node;
use omnisim_spatial::geometry::{distance, normalize_angle_deg};
use omnisim_types::{AffectionResult, ArcInfo, NodeId};
use tracing::debug;

use crate::dispersion;

/// Value a target emits: the property named `key` when given and present,
/// else `value`, else `target_value`, else 0.
pub fn emitted_value(target: &Node, key: Option<&str>) -> f64 {
    key.and_then(|k| target.properties.number(k))
        .or_else(|| target.properties.base_value())
        .unwrap_or(0.0)
}

/// Attenuation weight of `target` at distance `d` within `range`.
fn weight(target: &Node, d: f64, range: f64) -> f64 {
    let proximity = 1.0 - d / range;
    match &target.properties.dispersion {
        Some(spec) => dispersion::apply(spec, proximity),
        None => proximity.max(0.0),
    }
}

/// `true` when bearing `angle` falls in the cone `[min, max]`, which may wrap
/// across ±180°.  Bounds are inclusive.
pub fn in_cone(angle: f64, min: f64, max: f64) -> bool {
    if min <= max {
        min <= angle && angle <= max
    } else {
        angle >= min || angle <= max
    }
}

/// Omnidirectional influence of `target` on `sensor`, using the target's
/// `range`, `dispersion` and emitted `value`.
///
/// ```rust
/// use omnisim_affection::primitives::ranged_affection;
/// use omnisim_spatial::{Catalog, World};
/// use omnisim_types::{CatalogEntry, NodeClass, NodeId, Pose, Properties};
///
/// let sensor = CatalogEntry::new(NodeClass::Sensor, "te_1")
///     .with_subtype("temperature")
///     .with_pose(Pose::new(520.0, 415.0, -180.0));
/// let thermostat = CatalogEntry::new(NodeClass::Actuator, "th_1")
///     .with_subtype("thermostat")
///     .with_pose(Pose::new(500.0, 415.0, 0.0))
///     .with_properties(Properties { range: Some(50.0), target_value: Some(25.0), ..Default::default() });
///
/// let world = World::new(Catalog::from_entries(vec![sensor, thermostat]).unwrap());
/// let hit = ranged_affection(&world, NodeId(0), NodeId(1)).unwrap();
/// assert!((hit.distance - 20.0).abs() < 1e-9);
/// assert!((hit.weight - 0.6).abs() < 1e-9);
/// ```
pub fn ranged_affection(world: &World, sensor: NodeId, target: NodeId) -> Option<AffectionResult> {
    ranged_affection_for(world, sensor, target, None)
}

/// [`ranged_affection`] reading the emitted value from property `key` first.
pub fn ranged_affection_for(
    world: &World,
    sensor: NodeId,
    target: NodeId,
    key: Option<&str>,
) -> Option<AffectionResult> {
    let s = world.resolve(sensor)?;
    let t = world.resolve(target)?;

    let d = distance(s.pose.position(), t.pose.position());
    let range = t.node.properties.range.unwrap_or(0.0);
    if range <= 0.0 || d > range {
        return None;
    }

    let w = weight(t.node, d, range);
    let raw_value = emitted_value(t.node, key);
    let result = AffectionResult {
        target,
        identity: t.node.identity.clone(),
        distance: d,
        range,
        raw_value,
        weight: w,
        attenuated_value: raw_value * w,
        arc: None,
    };
    debug!(
        sensor = %sensor,
        target = %result.identity,
        distance = d,
        weight = w,
        "ranged affection"
    );
    Some(result)
}

/// Directional detection of `target` by `sensor`, using the sensor's
/// `range` and `fov` (degrees).  A sensor without `fov`, or with
/// `fov >= 360`, sees every bearing.
pub fn arced_affection(world: &World, sensor: NodeId, target: NodeId) -> Option<AffectionResult> {
    arced_affection_for(world, sensor, target, None)
}

/// [`arced_affection`] reading the emitted value from property `key` first.
pub fn arced_affection_for(
    world: &World,
    sensor: NodeId,
    target: NodeId,
    key: Option<&str>,
) -> Option<AffectionResult> {
    let s = world.resolve(sensor)?;
    let t = world.resolve(target)?;

    let d = distance(s.pose.position(), t.pose.position());
    let range = s.node.properties.range.unwrap_or(0.0);
    if range <= 0.0 || d > range {
        return None;
    }

    let angle = normalize_angle_deg((t.pose.y - s.pose.y).atan2(t.pose.x - s.pose.x).to_degrees());
    let fov = s.node.properties.fov.unwrap_or(360.0);
    let min = normalize_angle_deg(s.pose.theta - fov / 2.0);
    let max = normalize_angle_deg(s.pose.theta + fov / 2.0);
    if fov < 360.0 && !in_cone(angle, min, max) {
        return None;
    }

    let w = weight(t.node, d, range);
    let raw_value = emitted_value(t.node, key);
    let result = AffectionResult {
        target,
        identity: t.node.identity.clone(),
        distance: d,
        range,
        raw_value,
        weight: w,
        attenuated_value: raw_value * w,
        arc: Some(ArcInfo {
            angle,
            min_sensor_angle: min,
            max_sensor_angle: max,
            fov,
        }),
    };
    debug!(
        sensor = %sensor,
        target = %result.identity,
        distance = d,
        angle,
        "arced affection"
    );
    Some(result)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

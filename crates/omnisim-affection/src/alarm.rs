//! Robot alarms.
//!
//! - **Area alarm** – triggered while any robot is within the alarm's range.
//!   The robot plays the "sensor" role and the alarm the "target", so the
//!   alarm's own range is the one checked.
//! - **Linear alarm** – a tripwire beam between the two points of the
//!   alarm's `line` shape.  Every tick every edge of every robot footprint is
//!   tested against the beam.  Detection is stateless; the tracker only
//!   remembers where each robot was on the previous tick.  A robot that
//!   crosses the beam entirely between two ticks is not detected.

use omnisim_spatial::geometry::{polygon_edges, segments_intersect, shape_world_points};
use omnisim_types::{Reading, Shape, TripwireHit};
use tracing::warn;

use crate::handler::{HandlerContext, SensorHandler, SensorKind};
use crate::primitives::ranged_affection;
use crate::tripwire::TripwireState;

// ────────────────────────────────────────────────────────────────────────────
// AreaAlarmHandler
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct AreaAlarmHandler;

impl SensorHandler for AreaAlarmHandler {
    fn kind(&self) -> SensorKind {
        SensorKind::AreaAlarm
    }

    fn evaluate(&self, ctx: &mut HandlerContext<'_>) -> Option<Reading> {
        let alarm = ctx.sensor_id();
        let triggered_by: Vec<_> = ctx
            .candidates(|n| n.is_robot())
            .into_iter()
            .filter(|robot| ranged_affection(ctx.world, *robot, alarm).is_some())
            .filter_map(|robot| ctx.world.catalog().get(robot))
            .map(|node| node.identity.clone())
            .collect();

        Some(Reading::AreaAlarm {
            triggered: !triggered_by.is_empty(),
            robots: triggered_by,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LinearAlarmHandler
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct LinearAlarmHandler;

impl SensorHandler for LinearAlarmHandler {
    fn kind(&self) -> SensorKind {
        SensorKind::LinearAlarm
    }

    fn evaluate(&self, ctx: &mut HandlerContext<'_>) -> Option<Reading> {
        let alarm = ctx.sensor_id();
        let Some(alarm_pose) = ctx.world.pose(alarm) else {
            warn!(alarm = %alarm, "linear alarm has no pose");
            return None;
        };
        let beam = match &ctx.sensor.properties.shape {
            Some(shape @ Shape::Line { .. }) => shape_world_points(&alarm_pose, shape).ok()?,
            _ => {
                warn!(alarm = %ctx.sensor.identity, "linear alarm needs a line shape");
                return None;
            }
        };
        let &[start, end] = beam.as_slice() else {
            return None;
        };

        let robots = ctx.candidates(|n| n.is_robot());
        let mut tracker = ctx.tracker();
        let mut hits = Vec::new();
        for robot in robots {
            let Some(resolved) = ctx.world.resolve(robot) else {
                continue;
            };
            let state = tracker.observe(alarm, robot, resolved.pose.position(), ctx.tick);

            let Some(shape) = &resolved.node.properties.shape else {
                warn!(robot = %resolved.node.identity, "robot has no shape, skipped");
                continue;
            };
            let outline = match shape_world_points(&resolved.pose, shape) {
                Ok(points) => points,
                Err(e) => {
                    warn!(robot = %resolved.node.identity, error = %e, "robot skipped");
                    continue;
                }
            };
            let crossed = polygon_edges(&outline)
                .into_iter()
                .any(|(a, b)| segments_intersect(start, end, a, b));

            if crossed
                && let TripwireState::Tracked {
                    previous, current, ..
                } = state
            {
                hits.push(TripwireHit {
                    robot,
                    identity: resolved.node.identity.clone(),
                    previous,
                    current,
                });
            }
        }

        Some(Reading::LinearAlarm {
            triggered: !hits.is_empty(),
            hits,
        })
    }
}

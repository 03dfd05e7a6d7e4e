//! Distance sensors (sonar, IR): nearest arced hit among robots, obstacles
//! and actors; the sensor's maximum range when nothing is in view.

use omnisim_types::{NodeClass, Reading};

use crate::handler::{HandlerContext, SensorHandler, SensorKind};
use crate::primitives::arced_affection;

#[derive(Debug, Clone, Default)]
pub struct DistanceHandler;

impl SensorHandler for DistanceHandler {
    fn kind(&self) -> SensorKind {
        SensorKind::Distance
    }

    fn evaluate(&self, ctx: &mut HandlerContext<'_>) -> Option<Reading> {
        let max_range = ctx.sensor.properties.range.unwrap_or(0.0);
        let nearest = ctx
            .candidates(|n| {
                n.is_robot() || matches!(n.identity.class, NodeClass::Obstacle | NodeClass::Actor)
            })
            .into_iter()
            .filter_map(|t| arced_affection(ctx.world, ctx.sensor_id(), t))
            .min_by(|a, b| a.distance.total_cmp(&b.distance));

        let raw = nearest.as_ref().map_or(max_range, |hit| hit.distance);
        Some(Reading::Distance {
            value: ctx.apply_noise(raw),
            nearest,
        })
    }
}

//! Directional identification sensors: cameras and RFID readers.
//!
//! Both use [`arced_affection`] with the sensor's own range and field of
//! view.  Cameras additionally degrade in low light: below
//! [`LOW_LIGHT_THRESHOLD`] each detection is lost with probability
//! `(threshold - luminosity) / threshold`.

use std::collections::BTreeMap;

use omnisim_types::{Detection, Reading, RfidTag};
use rand::Rng;
use tracing::debug;

use crate::environmental::ScalarHandler;
use crate::handler::{HandlerContext, SensorHandler, SensorKind, is_any_kind};
use crate::primitives::arced_affection;

/// Luminosity under which camera detections start to fail.
pub const LOW_LIGHT_THRESHOLD: f64 = 30.0;

/// Node kinds a camera can recognise.
const VISIBLE: &[&str] = &[
    "human",
    "qrcode",
    "barcode",
    "plaintext",
    "color",
    "led",
    "robot",
];

const TAGS: &[&str] = &["rfidtag", "rfid_tag"];

// ────────────────────────────────────────────────────────────────────────────
// CameraHandler
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CameraHandler {
    light: ScalarHandler,
}

impl Default for CameraHandler {
    fn default() -> Self {
        Self {
            light: ScalarHandler::luminosity(),
        }
    }
}

/// Probability that a single detection survives at `luminosity`.
pub fn detection_probability(luminosity: f64) -> f64 {
    if luminosity >= LOW_LIGHT_THRESHOLD {
        1.0
    } else {
        (luminosity / LOW_LIGHT_THRESHOLD).clamp(0.0, 1.0)
    }
}

impl SensorHandler for CameraHandler {
    fn kind(&self) -> SensorKind {
        SensorKind::Camera
    }

    fn evaluate(&self, ctx: &mut HandlerContext<'_>) -> Option<Reading> {
        let (luminosity, _) = self.light.measure(ctx);
        let keep = detection_probability(luminosity);

        let hits: Vec<_> = ctx
            .candidates(|n| is_any_kind(n, VISIBLE))
            .into_iter()
            .filter_map(|t| arced_affection(ctx.world, ctx.sensor_id(), t))
            .collect();

        let mut detections = BTreeMap::new();
        let mut dropped = 0;
        for hit in hits {
            if keep < 1.0 && ctx.rng.random::<f64>() >= keep {
                dropped += 1;
                continue;
            }
            let angle = hit.arc.map_or(0.0, |a| a.angle);
            detections.insert(
                hit.target,
                Detection {
                    target: hit.target,
                    identity: hit.identity,
                    distance: hit.distance,
                    angle,
                },
            );
        }

        if dropped > 0 {
            debug!(sensor = %ctx.sensor_id(), luminosity, dropped, "low light dropped detections");
        }
        Some(Reading::Camera {
            detections,
            luminosity,
            dropped,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RfidHandler
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RfidHandler;

impl SensorHandler for RfidHandler {
    fn kind(&self) -> SensorKind {
        SensorKind::Rfid
    }

    fn evaluate(&self, ctx: &mut HandlerContext<'_>) -> Option<Reading> {
        let tags = ctx
            .candidates(|n| is_any_kind(n, TAGS))
            .into_iter()
            .filter_map(|t| arced_affection(ctx.world, ctx.sensor_id(), t))
            .map(|hit| RfidTag {
                target: hit.target,
                identity: hit.identity,
                distance: hit.distance,
                signal_strength: hit.weight * 100.0,
            })
            .collect();
        Some(Reading::Rfid { tags })
    }
}

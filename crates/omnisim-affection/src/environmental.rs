//! Scalar environmental sensors: temperature, humidity, gas, sound,
//! luminosity, the three-in-one `envcombo`, and the generic fallback.
//!
//! | Sensor | Influencers | Combination |
//! |---|---|---|
//! | temperature | thermostat, fire | ambient + mean |
//! | humidity | humidifier, water | ambient + mean |
//! | gas | human, fire | ambient + mean |
//! | sound | speaker, human (while `sound` is set), soundsource | max(ambient, mean) |
//! | luminosity | led, light, fire | ambient + sum, 10% blend, clamped to [0, 100] |
//! | generic | nodes whose `affects` names the sensor kind | ambient + mean |
//!
//! All influence is ranged (omnidirectional, target range).  A target
//! contributes its phenomenon-named property (e.g. `temperature`) when it
//! has one, otherwise its `value` / `target_value`.

use omnisim_types::{AffectionResult, Phenomenon, Reading};

use crate::handler::{HandlerContext, SensorHandler, SensorKind, is_any_kind};
use crate::primitives::ranged_affection_for;

/// How contributions and ambient fold into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    AmbientPlusMean,
    MaxOfAmbientAndMean,
    Luminosity,
}

/// Arithmetic mean of attenuated values, `None` when empty.
pub fn mean(contributions: &[AffectionResult]) -> Option<f64> {
    if contributions.is_empty() {
        return None;
    }
    let total: f64 = contributions.iter().map(|c| c.attenuated_value).sum();
    Some(total / contributions.len() as f64)
}

/// Light at a point lit by `contributed` on top of `ambient`, clamped to
/// `[0, 100]`.
///
/// The raw level is `ambient + contributed`; whichever of raw and ambient
/// is weaker adds 10% of itself to the stronger.  Ambient 60 with an LED
/// contributing 40 gives raw 100, blended `60 · 0.1 + 100 = 106`, read as
/// 100.
pub fn combine_luminosity(ambient: f64, contributed: f64) -> f64 {
    let raw = ambient + contributed;
    let lum = if raw < ambient {
        raw * 0.1 + ambient
    } else {
        ambient * 0.1 + raw
    };
    lum.clamp(0.0, 100.0)
}

pub fn combine(rule: Combine, ambient: f64, contributions: &[AffectionResult]) -> f64 {
    match rule {
        Combine::AmbientPlusMean => mean(contributions).map_or(ambient, |m| ambient + m),
        Combine::MaxOfAmbientAndMean => mean(contributions).map_or(ambient, |m| ambient.max(m)),
        Combine::Luminosity if contributions.is_empty() => ambient.clamp(0.0, 100.0),
        Combine::Luminosity => {
            let contributed = contributions.iter().map(|c| c.attenuated_value).sum();
            combine_luminosity(ambient, contributed)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ScalarHandler
// ────────────────────────────────────────────────────────────────────────────

/// Handler for a single built-in phenomenon.
#[derive(Debug, Clone)]
pub struct ScalarHandler {
    kind: SensorKind,
    phenomenon: Phenomenon,
    influencers: &'static [&'static str],
    combine: Combine,
}

impl ScalarHandler {
    pub fn temperature() -> Self {
        Self {
            kind: SensorKind::Temperature,
            phenomenon: Phenomenon::Temperature,
            influencers: &["thermostat", "fire"],
            combine: Combine::AmbientPlusMean,
        }
    }

    pub fn humidity() -> Self {
        Self {
            kind: SensorKind::Humidity,
            phenomenon: Phenomenon::Humidity,
            influencers: &["humidifier", "water"],
            combine: Combine::AmbientPlusMean,
        }
    }

    pub fn gas() -> Self {
        Self {
            kind: SensorKind::Gas,
            phenomenon: Phenomenon::Gas,
            influencers: &["human", "fire"],
            combine: Combine::AmbientPlusMean,
        }
    }

    pub fn sound() -> Self {
        Self {
            kind: SensorKind::Sound,
            phenomenon: Phenomenon::Sound,
            influencers: &["speaker", "human", "soundsource"],
            combine: Combine::MaxOfAmbientAndMean,
        }
    }

    pub fn luminosity() -> Self {
        Self {
            kind: SensorKind::Luminosity,
            phenomenon: Phenomenon::Luminosity,
            influencers: &["led", "light", "fire"],
            combine: Combine::Luminosity,
        }
    }

    pub fn phenomenon(&self) -> Phenomenon {
        self.phenomenon
    }

    /// Ranged contributions of every influencer of this phenomenon.
    pub fn contributions(&self, ctx: &HandlerContext<'_>) -> Vec<AffectionResult> {
        let key = self.phenomenon.as_str();
        let silent_human = |n: &omnisim_spatial::Node| {
            self.phenomenon == Phenomenon::Sound
                && n.identity.is_kind("human")
                && !n.properties.flag("sound")
        };
        ctx.candidates(|n| is_any_kind(n, self.influencers) && !silent_human(n))
            .into_iter()
            .filter_map(|t| ranged_affection_for(ctx.world, ctx.sensor_id(), t, Some(key)))
            .collect()
    }

    /// Combined value before noise, plus what went into it.
    pub fn measure(&self, ctx: &HandlerContext<'_>) -> (f64, Vec<AffectionResult>) {
        let contributions = self.contributions(ctx);
        let ambient = ctx.baseline.ambient(self.phenomenon);
        (combine(self.combine, ambient, &contributions), contributions)
    }
}

impl SensorHandler for ScalarHandler {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn evaluate(&self, ctx: &mut HandlerContext<'_>) -> Option<Reading> {
        let (value, contributions) = self.measure(ctx);
        let mut value = ctx.apply_noise(value);
        if self.combine == Combine::Luminosity {
            value = value.clamp(0.0, 100.0);
        }
        Some(Reading::Scalar {
            phenomenon: self.phenomenon,
            value,
            contributions,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// EnvComboHandler
// ────────────────────────────────────────────────────────────────────────────

/// Temperature, humidity and gas measured at one point.
#[derive(Debug, Clone)]
pub struct EnvComboHandler {
    temperature: ScalarHandler,
    humidity: ScalarHandler,
    gas: ScalarHandler,
}

impl Default for EnvComboHandler {
    fn default() -> Self {
        Self {
            temperature: ScalarHandler::temperature(),
            humidity: ScalarHandler::humidity(),
            gas: ScalarHandler::gas(),
        }
    }
}

impl SensorHandler for EnvComboHandler {
    fn kind(&self) -> SensorKind {
        SensorKind::EnvCombo
    }

    fn evaluate(&self, ctx: &mut HandlerContext<'_>) -> Option<Reading> {
        let (t, _) = self.temperature.measure(ctx);
        let (h, _) = self.humidity.measure(ctx);
        let (g, _) = self.gas.measure(ctx);
        Some(Reading::Combo {
            temperature: ctx.apply_noise(t),
            humidity: ctx.apply_noise(h),
            gas: ctx.apply_noise(g),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// GenericHandler
// ────────────────────────────────────────────────────────────────────────────

/// Fallback for sensor kinds without a dedicated handler.
#[derive(Debug, Clone, Default)]
pub struct GenericHandler;

impl SensorHandler for GenericHandler {
    fn kind(&self) -> SensorKind {
        SensorKind::Generic
    }

    fn evaluate(&self, ctx: &mut HandlerContext<'_>) -> Option<Reading> {
        let phenomenon = ctx.sensor.identity.kind_name()?.to_string();
        let contributions: Vec<_> = ctx
            .candidates(|n| n.properties.affects.contains(&phenomenon))
            .into_iter()
            .filter_map(|t| {
                ranged_affection_for(ctx.world, ctx.sensor_id(), t, Some(&phenomenon))
            })
            .collect();
        let ambient = ctx.baseline.ambient_named(&phenomenon);
        let value = combine(Combine::AmbientPlusMean, ambient, &contributions);
        Some(Reading::Generic {
            value: ctx.apply_noise(value),
            phenomenon,
            contributions,
        })
    }
}

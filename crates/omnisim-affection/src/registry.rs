//! [`AffectionEngine`] – sensor handler registry and query dispatcher.
//!
//! The engine owns one [`SensorHandler`] per [`SensorKind`] and the shared
//! [`TripwireTracker`].  A query resolves the sensor node, picks the handler
//! for its kind (falling back to the generic handler), seeds a fresh RNG from
//! `(seed, tick, sensor)` and lets the handler produce the reading.
//!
//! The engine holds no world state: callers pass a `&World` (typically under
//! a read lock), so any number of queries may run concurrently.

use std::collections::HashMap;
use std::sync::Mutex;

use omnisim_spatial::{Catalog, World};
use omnisim_types::{
    AffectionQuery, EnvironmentBaseline, NodeClass, NodeId, Reading, SimError,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, instrument, warn};

use crate::alarm::{AreaAlarmHandler, LinearAlarmHandler};
use crate::camera::{CameraHandler, RfidHandler};
use crate::environmental::{EnvComboHandler, GenericHandler, ScalarHandler};
use crate::handler::{HandlerContext, SensorHandler, SensorKind};
use crate::ranging::DistanceHandler;
use crate::tripwire::{TripwireState, TripwireTracker};
use crate::{dispersion, noise};

/// Derive a per-(tick, sensor) RNG seed (SplitMix64 finalizer).
fn mix_seed(seed: u64, tick: u64, sensor: NodeId) -> u64 {
    let mut z = seed
        ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (sensor.0 as u64).wrapping_mul(0xD6E8_FEB8_6659_FD93);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Reject catalogs whose noise or dispersion parameters cannot be evaluated.
///
/// # Errors
///
/// [`SimError::InvalidConfiguration`] naming the offending node.
pub fn validate_models(catalog: &Catalog) -> Result<(), SimError> {
    for node in catalog.nodes() {
        let props = &node.properties;
        props
            .noise
            .as_ref()
            .map_or(Ok(()), noise::validate)
            .and_then(|()| props.dispersion.as_ref().map_or(Ok(()), dispersion::validate))
            .map_err(|e| match e {
                SimError::InvalidConfiguration(msg) => {
                    SimError::InvalidConfiguration(format!("{}: {msg}", node.identity))
                }
                other => other,
            })?;
    }
    Ok(())
}

/// Sensor handler registry and query dispatcher.
///
/// # Example
///
/// ```rust
/// use omnisim_affection::AffectionEngine;
/// use omnisim_spatial::{Catalog, World};
/// use omnisim_types::{CatalogEntry, EnvironmentBaseline, NodeClass, NodeId, Pose, Properties};
///
/// let sensor = CatalogEntry::new(NodeClass::Sensor, "te_1").with_subtype("temperature");
/// let fire = CatalogEntry::new(NodeClass::Actor, "fi_1")
///     .with_type("fire")
///     .with_pose(Pose::new(1.0, 0.0, 0.0))
///     .with_properties(Properties { range: Some(2.0), value: Some(40.0), ..Default::default() });
/// let catalog = Catalog::from_entries(vec![sensor, fire]).unwrap();
///
/// let engine = AffectionEngine::for_catalog(&catalog, 42).unwrap();
/// let world = World::new(catalog);
/// let reading = engine
///     .evaluate(&world, NodeId(0), &EnvironmentBaseline::default(), 0, 0.0)
///     .unwrap();
/// // 20 °C ambient + 40 · (1 - 1/2)
/// assert_eq!(reading.scalar(), Some(40.0));
/// ```
pub struct AffectionEngine {
    handlers: HashMap<SensorKind, Box<dyn SensorHandler>>,
    seed: u64,
    tracker: Mutex<TripwireTracker>,
}

impl AffectionEngine {
    /// Engine with every built-in handler registered.
    pub fn new(seed: u64) -> Self {
        let mut engine = Self::empty(seed);
        engine.register_handler(Box::new(ScalarHandler::temperature()));
        engine.register_handler(Box::new(ScalarHandler::humidity()));
        engine.register_handler(Box::new(ScalarHandler::gas()));
        engine.register_handler(Box::new(ScalarHandler::sound()));
        engine.register_handler(Box::new(ScalarHandler::luminosity()));
        engine.register_handler(Box::new(EnvComboHandler::default()));
        engine.register_handler(Box::new(CameraHandler::default()));
        engine.register_handler(Box::new(DistanceHandler));
        engine.register_handler(Box::new(RfidHandler));
        engine.register_handler(Box::new(AreaAlarmHandler));
        engine.register_handler(Box::new(LinearAlarmHandler));
        engine.register_handler(Box::new(GenericHandler));
        engine
    }

    /// Engine with no handlers; every query yields `None` until handlers are
    /// registered.
    pub fn empty(seed: u64) -> Self {
        Self {
            handlers: HashMap::new(),
            seed,
            tracker: Mutex::new(TripwireTracker::new()),
        }
    }

    /// Validate `catalog`'s noise and dispersion models, then build the
    /// default engine.
    pub fn for_catalog(catalog: &Catalog, seed: u64) -> Result<Self, SimError> {
        validate_models(catalog)?;
        let engine = Self::new(seed);
        info!(seed, handlers = engine.handlers.len(), "affection engine ready");
        Ok(engine)
    }

    /// Register a handler.  Any previously registered handler for the same
    /// kind is replaced.
    pub fn register_handler(&mut self, handler: Box<dyn SensorHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Evaluate one sensor against the current world.
    ///
    /// Returns `None` (with a warning) when `sensor` is unknown or is not a
    /// sensor, and whenever the handler has nothing to report.
    #[instrument(skip(self, world, baseline), fields(sensor = %sensor))]
    pub fn evaluate(
        &self,
        world: &World,
        sensor: NodeId,
        baseline: &EnvironmentBaseline,
        tick: u64,
        time: f64,
    ) -> Option<Reading> {
        let node = match world.catalog().node(sensor) {
            Ok(node) => node,
            Err(e) => {
                warn!(error = %e, "affection query skipped");
                return None;
            }
        };
        if node.identity.class != NodeClass::Sensor {
            warn!(node = %node.identity, "affection query on a non-sensor node");
            return None;
        }

        let kind = SensorKind::from_identity(&node.identity);
        let handler = self
            .handlers
            .get(&kind)
            .or_else(|| self.handlers.get(&SensorKind::Generic))?;

        let rng = StdRng::seed_from_u64(mix_seed(self.seed, tick, sensor));
        let mut ctx = HandlerContext::new(world, node, baseline, tick, time, rng, &self.tracker);
        handler.evaluate(&mut ctx)
    }

    /// [`AffectionEngine::evaluate`] driven by an [`AffectionQuery`].
    pub fn query(
        &self,
        world: &World,
        query: &AffectionQuery,
        tick: u64,
        time: f64,
    ) -> Option<Reading> {
        self.evaluate(world, query.sensor, &query.baseline, tick, time)
    }

    /// Tripwire memory for one (alarm, robot) pair.
    pub fn tripwire_state(&self, alarm: NodeId, robot: NodeId) -> TripwireState {
        self.tracker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .state(alarm, robot)
    }
}

#[cfg(test)]
mod tests {
    use omnisim_types::{CatalogEntry, NoiseSpec, Pose, Properties};

    use super::*;

    struct Fixed;

    impl SensorHandler for Fixed {
        fn kind(&self) -> SensorKind {
            SensorKind::Temperature
        }

        fn evaluate(&self, _ctx: &mut HandlerContext<'_>) -> Option<Reading> {
            Some(Reading::Generic {
                phenomenon: "fixed".to_string(),
                value: 1.0,
                contributions: Vec::new(),
            })
        }
    }

    fn temperature_world() -> World {
        let sensor = CatalogEntry::new(NodeClass::Sensor, "te_1").with_subtype("temperature");
        World::new(Catalog::from_entries(vec![sensor]).unwrap())
    }

    #[test]
    fn mix_seed_varies_with_each_input() {
        let base = mix_seed(1, 1, NodeId(1));
        assert_ne!(base, mix_seed(2, 1, NodeId(1)));
        assert_ne!(base, mix_seed(1, 2, NodeId(1)));
        assert_ne!(base, mix_seed(1, 1, NodeId(2)));
        assert_eq!(base, mix_seed(1, 1, NodeId(1)));
    }

    #[test]
    fn custom_handler_replaces_builtin() {
        let mut engine = AffectionEngine::new(0);
        engine.register_handler(Box::new(Fixed));
        let reading = engine
            .evaluate(&temperature_world(), NodeId(0), &EnvironmentBaseline::default(), 0, 0.0)
            .unwrap();
        assert_eq!(reading.scalar(), Some(1.0));
    }

    #[test]
    fn empty_engine_yields_nothing() {
        let engine = AffectionEngine::empty(0);
        assert!(engine
            .evaluate(&temperature_world(), NodeId(0), &EnvironmentBaseline::default(), 0, 0.0)
            .is_none());
    }

    #[test]
    fn unknown_and_non_sensor_nodes_yield_nothing() {
        let fire = CatalogEntry::new(NodeClass::Actor, "fi_1").with_type("fire");
        let world = World::new(Catalog::from_entries(vec![fire]).unwrap());
        let engine = AffectionEngine::new(0);
        let baseline = EnvironmentBaseline::default();
        assert!(engine.evaluate(&world, NodeId(0), &baseline, 0, 0.0).is_none());
        assert!(engine.evaluate(&world, NodeId(5), &baseline, 0, 0.0).is_none());
    }

    #[test]
    fn invalid_noise_is_fatal_at_setup() {
        let sensor = CatalogEntry::new(NodeClass::Sensor, "te_1")
            .with_subtype("temperature")
            .with_properties(Properties {
                noise: Some(NoiseSpec::Gaussian {
                    mean: 0.0,
                    std: -2.0,
                }),
                ..Properties::default()
            });
        let catalog = Catalog::from_entries(vec![sensor]).unwrap();
        let err = AffectionEngine::for_catalog(&catalog, 0).err().unwrap();
        assert!(err.to_string().contains("te_1"));
    }

    #[test]
    fn same_seed_tick_sensor_is_reproducible() {
        let sensor = CatalogEntry::new(NodeClass::Sensor, "te_1")
            .with_subtype("temperature")
            .with_pose(Pose::origin())
            .with_properties(Properties {
                noise: Some(NoiseSpec::Gaussian {
                    mean: 0.0,
                    std: 2.0,
                }),
                ..Properties::default()
            });
        let world = World::new(Catalog::from_entries(vec![sensor]).unwrap());
        let baseline = EnvironmentBaseline::default();
        let a = AffectionEngine::new(9).evaluate(&world, NodeId(0), &baseline, 3, 0.3);
        let b = AffectionEngine::new(9).evaluate(&world, NodeId(0), &baseline, 3, 0.3);
        let c = AffectionEngine::new(9).evaluate(&world, NodeId(0), &baseline, 4, 0.4);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

//! Sensor handler abstraction.
//!
//! Every sensor kind has one [`SensorHandler`] that decides which catalog
//! nodes are candidates, which primitive evaluates them, and how the results
//! fold into a [`Reading`].  Handlers share a per-query [`HandlerContext`].

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use omnisim_spatial::World;
use omnisim_spatial::catalog::Node;
use omnisim_types::{EnvironmentBaseline, NodeId, NodeIdentity, Reading};
use rand::rngs::StdRng;

use crate::noise;
use crate::tripwire::TripwireTracker;

// ────────────────────────────────────────────────────────────────────────────
// SensorKind
// ────────────────────────────────────────────────────────────────────────────

/// Sensor interpretation policy, derived from a node's subtype (falling back
/// to its type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Temperature,
    Humidity,
    Gas,
    Sound,
    Luminosity,
    EnvCombo,
    Camera,
    Distance,
    Rfid,
    AreaAlarm,
    LinearAlarm,
    Generic,
}

impl SensorKind {
    fn from_label(label: &str) -> Option<Self> {
        let kind = match label.to_ascii_lowercase().as_str() {
            "temperature" => SensorKind::Temperature,
            "humidity" => SensorKind::Humidity,
            "gas" => SensorKind::Gas,
            "sound" | "microphone" => SensorKind::Sound,
            "luminosity" | "light" => SensorKind::Luminosity,
            "envcombo" => SensorKind::EnvCombo,
            "camera" => SensorKind::Camera,
            "distance" | "sonar" | "ir" => SensorKind::Distance,
            "rfid" | "rfid_reader" => SensorKind::Rfid,
            "areaalarm" | "area_alarm" => SensorKind::AreaAlarm,
            "linearalarm" | "linear_alarm" => SensorKind::LinearAlarm,
            _ => return None,
        };
        Some(kind)
    }

    /// Subtype wins over type; anything unrecognised is [`SensorKind::Generic`].
    pub fn from_identity(identity: &NodeIdentity) -> Self {
        identity
            .subtype
            .as_deref()
            .and_then(Self::from_label)
            .or_else(|| identity.type_.as_deref().and_then(Self::from_label))
            .unwrap_or(SensorKind::Generic)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Gas => "gas",
            SensorKind::Sound => "sound",
            SensorKind::Luminosity => "luminosity",
            SensorKind::EnvCombo => "envcombo",
            SensorKind::Camera => "camera",
            SensorKind::Distance => "distance",
            SensorKind::Rfid => "rfid",
            SensorKind::AreaAlarm => "area_alarm",
            SensorKind::LinearAlarm => "linear_alarm",
            SensorKind::Generic => "generic",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HandlerContext
// ────────────────────────────────────────────────────────────────────────────

/// Everything a handler may read (and the little it may mutate) during one
/// query.
pub struct HandlerContext<'a> {
    pub world: &'a World,
    pub sensor: &'a Node,
    pub baseline: &'a EnvironmentBaseline,
    pub tick: u64,
    /// Simulation time in seconds.
    pub time: f64,
    /// Seeded from `(seed, tick, sensor)`.
    pub rng: StdRng,
    tracker: &'a Mutex<TripwireTracker>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        world: &'a World,
        sensor: &'a Node,
        baseline: &'a EnvironmentBaseline,
        tick: u64,
        time: f64,
        rng: StdRng,
        tracker: &'a Mutex<TripwireTracker>,
    ) -> Self {
        Self {
            world,
            sensor,
            baseline,
            tick,
            time,
            rng,
            tracker,
        }
    }

    pub fn sensor_id(&self) -> NodeId {
        self.sensor.id
    }

    /// Catalog nodes accepted by `filter`, in declaration order, never
    /// including the sensor itself or any of its hosts.
    pub fn candidates(&self, filter: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        let catalog = self.world.catalog();
        catalog
            .nodes()
            .filter(|n| !catalog.is_self_or_ancestor(self.sensor.id, n.id))
            .filter(|n| filter(n))
            .map(|n| n.id)
            .collect()
    }

    /// Apply the sensor's own noise model, if it has one.
    pub fn apply_noise(&mut self, value: f64) -> f64 {
        match &self.sensor.properties.noise {
            Some(spec) => noise::apply(spec, value, self.time, &mut self.rng),
            None => value,
        }
    }

    /// Exclusive access to the tripwire memory.  A poisoned lock is
    /// recovered; the tracker holds plain positions only.
    pub fn tracker(&self) -> MutexGuard<'a, TripwireTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SensorHandler trait
// ────────────────────────────────────────────────────────────────────────────

/// One interpretation policy per [`SensorKind`].
pub trait SensorHandler: Send + Sync {
    fn kind(&self) -> SensorKind;

    /// Produce the sensor's reading, or `None` when nothing can be said.
    fn evaluate(&self, ctx: &mut HandlerContext<'_>) -> Option<Reading>;
}

/// `true` when the node's subtype or type is one of `kinds`.
pub fn is_any_kind(node: &Node, kinds: &[&str]) -> bool {
    kinds.iter().any(|k| node.identity.is_kind(k))
}

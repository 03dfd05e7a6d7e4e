//! `omnisim-types` – shared data model for the OmniSim core.
//!
//! Everything that crosses a crate boundary lives here: the node catalog
//! input format, poses and shapes, noise/dispersion specifications, the
//! events pushed into the world, the readings produced by sensor handlers,
//! and the workspace-wide [`SimError`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Identity
// ────────────────────────────────────────────────────────────────────────────

/// Top-level classification of every entity in the catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum NodeClass {
    Sensor,
    Actuator,
    Actor,
    /// Hosts other nodes at fixed mount offsets (e.g. a robot chassis).
    Composite,
    Obstacle,
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeClass::Sensor => "sensor",
            NodeClass::Actuator => "actuator",
            NodeClass::Actor => "actor",
            NodeClass::Composite => "composite",
            NodeClass::Obstacle => "obstacle",
        };
        f.write_str(s)
    }
}

/// Stable arena index of a node.  Assigned in catalog declaration order
/// (pre-order), so ids never change once a catalog is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural identity of a node: `class / type / subtype / name`.
///
/// `name` is unique within the parent scope only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct NodeIdentity {
    pub class: NodeClass,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    pub name: String,
}

impl NodeIdentity {
    pub fn new(class: NodeClass, name: impl Into<String>) -> Self {
        Self {
            class,
            type_: None,
            subtype: None,
            name: name.into(),
        }
    }

    /// The most specific kind label available: the subtype, else the type.
    pub fn kind_name(&self) -> Option<&str> {
        self.subtype.as_deref().or(self.type_.as_deref())
    }

    /// `true` when either the subtype or the type equals `kind`.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.subtype.as_deref() == Some(kind) || self.type_.as_deref() == Some(kind)
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.class)?;
        if let Some(t) = &self.type_ {
            write!(f, ".{t}")?;
        }
        if let Some(s) = &self.subtype {
            write!(f, ".{s}")?;
        }
        write!(f, ".{}", self.name)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry primitives
// ────────────────────────────────────────────────────────────────────────────

/// A 2-D point in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A 2-D pose.  `theta` is the heading in **degrees**, counter-clockwise
/// from +X.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub theta: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    pub const fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub const fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Rigid offset of a mounted node relative to its host's frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct MountOffset {
    #[serde(default)]
    pub dx: f64,
    #[serde(default)]
    pub dy: f64,
    /// Heading offset in degrees.
    #[serde(default)]
    pub dtheta: f64,
}

impl MountOffset {
    pub const fn new(dx: f64, dy: f64, dtheta: f64) -> Self {
        Self { dx, dy, dtheta }
    }

    /// The offset expressed as a relative pose.
    pub const fn as_pose(&self) -> Pose {
        Pose::new(self.dx, self.dy, self.dtheta)
    }
}

/// Footprint of a node, expressed in the node's local frame.
///
/// Shape kinds this core cannot evaluate deserialize to
/// [`Shape::Unsupported`] instead of failing the whole catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// `width` spans local X, `length` spans local Y.
    Rectangle { width: f64, length: f64 },
    Square { length: f64 },
    Circle { radius: f64 },
    ArbitraryPolygon { points: Vec<Point> },
    /// Two shape-local points; used for tripwire beams.
    Line { start: Point, end: Point },
    #[serde(other)]
    Unsupported,
}

// ────────────────────────────────────────────────────────────────────────────
// Noise & dispersion specifications
// ────────────────────────────────────────────────────────────────────────────

fn one() -> f64 {
    1.0
}

fn euler() -> f64 {
    std::f64::consts::E
}

/// Declarative dispersion function `f(x)` applied to normalized proximity.
///
/// Unknown `kind` values are rejected at deserialization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind")]
pub enum DispersionSpec {
    /// `x + value`
    Constant {
        #[serde(default)]
        value: f64,
    },
    /// `start + step * x`
    Linear {
        #[serde(default, rename = "startingPoint", alias = "start")]
        start: f64,
        #[serde(default = "one")]
        step: f64,
    },
    /// `a * x^2 + b * x + c`
    Quadratic {
        #[serde(default)]
        a: f64,
        #[serde(default)]
        b: f64,
        #[serde(default)]
        c: f64,
    },
    /// `y_intercept + base^x`
    Exponential {
        #[serde(default = "euler")]
        base: f64,
        #[serde(default, rename = "yIntercept", alias = "y_intercept")]
        y_intercept: f64,
    },
    /// `alpha * log_base(x + 1)`
    Logarithmic {
        #[serde(default = "euler")]
        base: f64,
        #[serde(default = "one")]
        alpha: f64,
    },
}

/// Declarative noise model applied to a sensed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NoiseSpec {
    Gaussian {
        #[serde(default)]
        mean: f64,
        #[serde(default = "one")]
        std: f64,
    },
    Uniform {
        min: f64,
        max: f64,
    },
    /// Open-ended extension point.  Known subtypes are `sine`
    /// (`amplitude`, `frequency`) and `step` (`step`); anything else is a
    /// no-op.
    Custom {
        subtype: String,
        #[serde(default)]
        params: BTreeMap<String, f64>,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Properties
// ────────────────────────────────────────────────────────────────────────────

/// A free-form property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PropertyValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl PropertyValue {
    /// Numeric payload; flags and text are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::Flag(_) | PropertyValue::Text(_) => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            PropertyValue::Flag(b) => *b,
            PropertyValue::Number(n) => *n != 0.0,
            PropertyValue::Text(s) => !s.is_empty(),
        }
    }
}

/// Static properties of a node.  Well-known keys are typed fields; anything
/// else lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Properties {
    /// Influence range (targets) or sensing range (sensors), metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<f64>,
    /// Field of view in degrees, `[0, 360]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fov: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise: Option<NoiseSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispersion: Option<DispersionSpec>,
    /// Phenomena this entity influences (used by the generic handler).
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub affects: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Shape>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, PropertyValue>,
}

impl Properties {
    /// `value`, falling back to `target_value`.
    pub fn base_value(&self) -> Option<f64> {
        self.value.or(self.target_value)
    }

    /// Look up a numeric property by name, including the typed fields.
    pub fn number(&self, name: &str) -> Option<f64> {
        match name {
            "range" => self.range,
            "fov" => self.fov,
            "value" => self.value,
            "target_value" => self.target_value,
            _ => self.extra.get(name).and_then(PropertyValue::as_f64),
        }
    }

    /// Overwrite a numeric property (external actuation).
    pub fn set_number(&mut self, name: &str, value: f64) {
        match name {
            "range" => self.range = Some(value),
            "fov" => self.fov = Some(value),
            "value" => self.value = Some(value),
            "target_value" => self.target_value = Some(value),
            _ => {
                self.extra
                    .insert(name.to_string(), PropertyValue::Number(value));
            }
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        self.extra.get(name).is_some_and(PropertyValue::is_truthy)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Environment
// ────────────────────────────────────────────────────────────────────────────

/// Physical quantity a scalar sensor measures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Phenomenon {
    Temperature,
    Humidity,
    Gas,
    Sound,
    Luminosity,
}

impl Phenomenon {
    pub const fn as_str(self) -> &'static str {
        match self {
            Phenomenon::Temperature => "temperature",
            Phenomenon::Humidity => "humidity",
            Phenomenon::Gas => "gas",
            Phenomenon::Sound => "sound",
            Phenomenon::Luminosity => "luminosity",
        }
    }
}

/// Ambient values used when nothing influences a sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EnvironmentBaseline {
    pub temperature: f64,
    pub humidity: f64,
    pub gas: f64,
    pub sound: f64,
    pub luminosity: f64,
    /// Ambient values for phenomena outside the built-in set.
    pub extra: BTreeMap<String, f64>,
}

impl Default for EnvironmentBaseline {
    fn default() -> Self {
        Self {
            temperature: 20.0,
            humidity: 50.0,
            gas: 0.0,
            sound: 0.0,
            luminosity: 50.0,
            extra: BTreeMap::new(),
        }
    }
}

impl EnvironmentBaseline {
    pub fn ambient(&self, phenomenon: Phenomenon) -> f64 {
        match phenomenon {
            Phenomenon::Temperature => self.temperature,
            Phenomenon::Humidity => self.humidity,
            Phenomenon::Gas => self.gas,
            Phenomenon::Sound => self.sound,
            Phenomenon::Luminosity => self.luminosity,
        }
    }

    /// Ambient value for an arbitrary phenomenon name; unknown names are 0.
    pub fn ambient_named(&self, name: &str) -> f64 {
        match name {
            "temperature" => self.temperature,
            "humidity" => self.humidity,
            "gas" => self.gas,
            "sound" => self.sound,
            "luminosity" => self.luminosity,
            other => self.extra.get(other).copied().unwrap_or(0.0),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Catalog input
// ────────────────────────────────────────────────────────────────────────────

/// One node of the static catalog, as supplied by the modeling front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CatalogEntry {
    pub class: NodeClass,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    pub name: String,
    #[serde(default)]
    pub properties: Properties,
    /// Offset relative to the host.  Ignored for root nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount: Option<MountOffset>,
    /// Initial world pose.  Only meaningful for root nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<Pose>,
    /// `true` for pan-tilt units that re-orient the devices mounted on them.
    #[serde(default)]
    pub pan_tilt: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CatalogEntry>,
}

impl CatalogEntry {
    pub fn new(class: NodeClass, name: impl Into<String>) -> Self {
        Self {
            class,
            type_: None,
            subtype: None,
            name: name.into(),
            properties: Properties::default(),
            mount: None,
            pose: None,
            pan_tilt: false,
            children: Vec::new(),
        }
    }

    pub fn with_type(mut self, type_: impl Into<String>) -> Self {
        self.type_ = Some(type_.into());
        self
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Some(pose);
        self
    }

    pub fn with_mount(mut self, mount: MountOffset) -> Self {
        self.mount = Some(mount);
        self
    }

    pub fn with_child(mut self, child: CatalogEntry) -> Self {
        self.children.push(child);
        self
    }

    pub fn as_pan_tilt(mut self) -> Self {
        self.pan_tilt = true;
        self
    }

    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity {
            class: self.class,
            type_: self.type_.clone(),
            subtype: self.subtype.clone(),
            name: self.name.clone(),
        }
    }
}

/// Rectangular floor of the environment, spanning `[0, width] × [0, height]`
/// from the world origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnvironmentBounds {
    pub width: f64,
    pub height: f64,
}

impl EnvironmentBounds {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Inclusive on every edge.
    pub fn contains(&self, p: Point) -> bool {
        (0.0..=self.width).contains(&p.x) && (0.0..=self.height).contains(&p.y)
    }
}

/// Top-level catalog document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CatalogFile {
    /// When present, every placed node must lie on this floor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentBounds>,
    #[serde(default)]
    pub nodes: Vec<CatalogEntry>,
}

/// JSON Schema of [`CatalogFile`], for external model tooling.
pub fn catalog_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(CatalogFile)
}

// ────────────────────────────────────────────────────────────────────────────
// World events & queries
// ────────────────────────────────────────────────────────────────────────────

/// An entity reports its own new local pose (theta in degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseUpdate {
    pub node: NodeId,
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl PoseUpdate {
    pub const fn pose(&self) -> Pose {
        Pose::new(self.x, self.y, self.theta)
    }
}

/// A pan-tilt unit reports its current pan angle (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanTiltUpdate {
    pub device: NodeId,
    pub pan: f64,
}

/// External actuation changed a numeric property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyUpdate {
    pub node: NodeId,
    pub name: String,
    pub value: f64,
}

/// Everything that can mutate the world between ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorldEvent {
    Pose(PoseUpdate),
    PanTilt(PanTiltUpdate),
    Property(PropertyUpdate),
}

/// Request for one sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectionQuery {
    pub sensor: NodeId,
    #[serde(default)]
    pub baseline: EnvironmentBaseline,
}

// ────────────────────────────────────────────────────────────────────────────
// Affection results & readings
// ────────────────────────────────────────────────────────────────────────────

/// Bearing information attached to arced detections.  Angles in degrees,
/// normalized to `(-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcInfo {
    pub angle: f64,
    pub min_sensor_angle: f64,
    pub max_sensor_angle: f64,
    pub fov: f64,
}

/// Effect of one target on one sensor.  Transient, produced per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectionResult {
    pub target: NodeId,
    #[serde(flatten)]
    pub identity: NodeIdentity,
    pub distance: f64,
    pub range: f64,
    pub raw_value: f64,
    pub weight: f64,
    pub attenuated_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arc: Option<ArcInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub target: NodeId,
    #[serde(flatten)]
    pub identity: NodeIdentity,
    pub distance: f64,
    pub angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfidTag {
    pub target: NodeId,
    #[serde(flatten)]
    pub identity: NodeIdentity,
    pub distance: f64,
    /// `weight * 100`.
    pub signal_strength: f64,
}

/// A robot whose footprint crosses a tripwire beam this tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripwireHit {
    pub robot: NodeId,
    #[serde(flatten)]
    pub identity: NodeIdentity,
    pub previous: Point,
    pub current: Point,
}

/// Structured output of one sensor tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reading {
    Scalar {
        phenomenon: Phenomenon,
        value: f64,
        contributions: Vec<AffectionResult>,
    },
    /// Multi-phenomenon environmental sensor.
    Combo {
        temperature: f64,
        humidity: f64,
        gas: f64,
    },
    Camera {
        detections: BTreeMap<NodeId, Detection>,
        luminosity: f64,
        /// Detections lost to the low-light failure model.
        dropped: usize,
    },
    Distance {
        value: f64,
        nearest: Option<AffectionResult>,
    },
    AreaAlarm {
        triggered: bool,
        robots: Vec<NodeIdentity>,
    },
    LinearAlarm {
        triggered: bool,
        hits: Vec<TripwireHit>,
    },
    Rfid {
        tags: Vec<RfidTag>,
    },
    Generic {
        phenomenon: String,
        value: f64,
        contributions: Vec<AffectionResult>,
    },
}

impl Reading {
    /// The scalar carried by this reading, if it folds to one.
    pub fn scalar(&self) -> Option<f64> {
        match self {
            Reading::Scalar { value, .. }
            | Reading::Distance { value, .. }
            | Reading::Generic { value, .. } => Some(*value),
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Event envelope
// ────────────────────────────────────────────────────────────────────────────

/// Envelope for everything the core hands to the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub tick: u64,
    /// e.g. `"omnisim-runtime::simulation"`
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(tick: u64, source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            tick,
            source: source.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Reading { sensor: NodeId, reading: Reading },
    Fault { component: String, message: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Workspace-wide error type.
///
/// Only [`SimError::InvalidConfiguration`] is fatal (at setup); the other
/// variants describe conditions that callers downgrade to "no detection".
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid geometry on {node}: {details}")]
    InvalidGeometry { node: String, details: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Channel error: {0}")]
    Channel(String),
}

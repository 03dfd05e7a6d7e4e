//! [`Simulation`] – the tick loop.
//!
//! Each call to [`Simulation::tick`]:
//!
//! 1. **Drain** – every [`WorldEvent`] queued since the previous tick is taken
//!    from the queue.
//! 2. **Apply** – the batch is applied to the [`SharedWorld`] under one write
//!    lock, pose propagation included.  Rejected events become
//!    [`EventPayload::Fault`] events.
//! 3. **Evaluate** – every sensor in the catalog is evaluated by the
//!    [`AffectionEngine`] under the read lock; each reading becomes an
//!    [`EventPayload::Reading`] event.
//!
//! Ad-hoc queries from other threads go through a [`QueryHandle`], which only
//! ever takes the read lock.
//!
//! # Example
//!
//! ```rust
//! use omnisim_runtime::config::SimConfig;
//! use omnisim_runtime::simulation::Simulation;
//! use omnisim_spatial::Catalog;
//! use omnisim_types::{CatalogEntry, NodeClass, NodeId, Pose, PoseUpdate, WorldEvent};
//!
//! let catalog = Catalog::from_entries(vec![
//!     CatalogEntry::new(NodeClass::Sensor, "te_1").with_subtype("temperature"),
//!     CatalogEntry::new(NodeClass::Actor, "fi_1").with_type("fire"),
//! ])
//! .unwrap();
//! let mut sim = Simulation::new(catalog, &SimConfig::default()).unwrap();
//!
//! sim.push(WorldEvent::Pose(PoseUpdate { node: NodeId(1), x: 3.0, y: 0.0, theta: 0.0 }))
//!     .unwrap();
//! let events = sim.tick();
//! assert_eq!(sim.current_tick(), 1);
//! assert_eq!(events.len(), 1);
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;

use omnisim_affection::AffectionEngine;
use omnisim_spatial::{Catalog, NodeQuery, World};
use omnisim_types::{
    AffectionQuery, EnvironmentBaseline, Event, EventPayload, NodeId, Pose, Reading, SimError,
    WorldEvent,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::{self, SimConfig};
use crate::shared::SharedWorld;

/// `source` of every event the simulation emits.
pub const EVENT_SOURCE: &str = "omnisim-runtime::simulation";

// ────────────────────────────────────────────────────────────────────────────
// Event queue
// ────────────────────────────────────────────────────────────────────────────

/// Producer side of the world-event queue.  Cheap to clone; usable from any
/// thread or task.
#[derive(Debug, Clone)]
pub struct EventSender(mpsc::UnboundedSender<WorldEvent>);

impl EventSender {
    /// Queue `event` for the next tick.
    ///
    /// # Errors
    ///
    /// [`SimError::Channel`] once the simulation has been dropped.
    pub fn send(&self, event: WorldEvent) -> Result<(), SimError> {
        self.0
            .send(event)
            .map_err(|_| SimError::Channel("simulation is gone".to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulation
// ────────────────────────────────────────────────────────────────────────────

pub struct Simulation {
    world: SharedWorld,
    engine: Arc<AffectionEngine>,
    baseline: EnvironmentBaseline,
    sender: EventSender,
    queue: mpsc::UnboundedReceiver<WorldEvent>,
    tick: Arc<AtomicU64>,
    tick_period: Duration,
}

impl Simulation {
    /// Build a simulation over `catalog`.  Fails when the configuration or
    /// the catalog's noise/dispersion models are invalid.
    pub fn new(catalog: Catalog, config: &SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let engine = AffectionEngine::for_catalog(&catalog, config.seed)?;
        let (tx, rx) = mpsc::unbounded_channel();
        info!(
            nodes = catalog.len(),
            sensors = catalog.sensors().count(),
            tick_hz = config.tick_hz,
            "simulation ready"
        );
        Ok(Self {
            world: SharedWorld::new(World::new(catalog)),
            engine: Arc::new(engine),
            baseline: config.baseline.clone(),
            sender: EventSender(tx),
            queue: rx,
            tick: Arc::new(AtomicU64::new(0)),
            tick_period: config.tick_period(),
        })
    }

    /// Build a simulation from the catalog named by `config.catalog_path`.
    pub fn from_config(config: &SimConfig) -> Result<Self, SimError> {
        let path = config.catalog_path.as_deref().ok_or_else(|| {
            SimError::InvalidConfiguration("catalog_path is not set".to_string())
        })?;
        Self::new(config::load_catalog(path)?, config)
    }

    /// Replace the affection engine, e.g. one with extra handlers registered.
    pub fn with_engine(mut self, engine: AffectionEngine) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn baseline(&self) -> &EnvironmentBaseline {
        &self.baseline
    }

    pub fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Simulated seconds elapsed at the current tick.
    pub fn time(&self) -> f64 {
        self.current_tick() as f64 * self.tick_period.as_secs_f64()
    }

    /// A producer for the world-event queue.
    pub fn event_sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Queue `event` for the next tick.
    pub fn push(&self, event: WorldEvent) -> Result<(), SimError> {
        self.sender.send(event)
    }

    pub fn query_handle(&self) -> QueryHandle {
        QueryHandle {
            world: self.world.clone(),
            engine: Arc::clone(&self.engine),
            baseline: self.baseline.clone(),
            tick: Arc::clone(&self.tick),
            tick_period: self.tick_period,
        }
    }

    /// Advance one tick: apply the queued events, then evaluate every sensor.
    pub fn tick(&mut self) -> Vec<Event> {
        let mut batch = Vec::new();
        while let Ok(event) = self.queue.try_recv() {
            batch.push(event);
        }
        let faults = self.world.apply_batch(&batch);

        let tick = self.tick.fetch_add(1, Ordering::AcqRel) + 1;
        let time = self.time();

        let mut events: Vec<Event> = faults
            .into_iter()
            .map(|e| {
                Event::new(
                    tick,
                    EVENT_SOURCE,
                    EventPayload::Fault {
                        component: "world".to_string(),
                        message: e.to_string(),
                    },
                )
            })
            .collect();

        let world = self.world.read();
        let sensors: Vec<NodeId> = world.catalog().sensors().map(|n| n.id).collect();
        for sensor in sensors {
            if let Some(reading) =
                self.engine
                    .evaluate(&world, sensor, &self.baseline, tick, time)
            {
                events.push(Event::new(
                    tick,
                    EVENT_SOURCE,
                    EventPayload::Reading { sensor, reading },
                ));
            }
        }
        debug!(tick, applied = batch.len(), events = events.len(), "tick complete");
        events
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Query handle
// ────────────────────────────────────────────────────────────────────────────

/// Read-only view for concurrent ad-hoc queries.  Cheap to clone and `Send`.
#[derive(Clone)]
pub struct QueryHandle {
    world: SharedWorld,
    engine: Arc<AffectionEngine>,
    baseline: EnvironmentBaseline,
    tick: Arc<AtomicU64>,
    tick_period: Duration,
}

impl QueryHandle {
    /// Evaluate one sensor against the world as of the latest tick, using the
    /// baseline carried by `query`.
    pub fn query(&self, query: &AffectionQuery) -> Option<Reading> {
        let tick = self.tick.load(Ordering::Acquire);
        let time = tick as f64 * self.tick_period.as_secs_f64();
        let world = self.world.read();
        self.engine.query(&world, query, tick, time)
    }

    /// [`QueryHandle::query`] with the simulation's configured baseline.
    pub fn evaluate(&self, sensor: NodeId) -> Option<Reading> {
        self.query(&AffectionQuery {
            sensor,
            baseline: self.baseline.clone(),
        })
    }

    /// Absolute pose of the first node matching `query`.
    pub fn lookup(&self, query: &NodeQuery) -> Option<(NodeId, Pose)> {
        self.world.read().lookup(query)
    }
}

//! [`Driver`] – runs a [`Simulation`] in real time.
//!
//! The driver ticks the simulation on a `tokio` interval of
//! [`Simulation::tick_period`] and publishes every resulting event on a
//! [`ReadingBus`].  It stops when the shutdown flag is raised or after an
//! optional tick limit.
//!
//! # Example
//!
//! ```rust,no_run
//! use omnisim_runtime::bus::ReadingBus;
//! use omnisim_runtime::config::{self, SimConfig};
//! use omnisim_runtime::driver::Driver;
//! use omnisim_runtime::simulation::Simulation;
//!
//! # async fn run() -> Result<(), omnisim_types::SimError> {
//! let cfg = config::load_or_default(std::path::Path::new("omnisim.toml"))?;
//! let sim = Simulation::from_config(&cfg)?;
//! let bus = ReadingBus::new(cfg.bus_capacity);
//! let mut readings = bus.subscribe();
//!
//! let driver = Driver::new(sim, bus);
//! let shutdown = driver.shutdown_handle();
//! tokio::spawn(driver.run());
//!
//! let first = readings.recv().await?;
//! println!("{first:?}");
//! shutdown.store(true, std::sync::atomic::Ordering::Relaxed);
//! # Ok(())
//! # }
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::time::{self, MissedTickBehavior};
use tracing::info;

use crate::bus::ReadingBus;
use crate::simulation::Simulation;

pub struct Driver {
    sim: Simulation,
    bus: ReadingBus,
    shutdown: Arc<AtomicBool>,
    max_ticks: Option<u64>,
}

impl Driver {
    pub fn new(sim: Simulation, bus: ReadingBus) -> Self {
        Self {
            sim,
            bus,
            shutdown: Arc::new(AtomicBool::new(false)),
            max_ticks: None,
        }
    }

    /// Stop after `ticks` ticks even if shutdown is never requested.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Raising this flag stops the loop before its next tick.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn bus(&self) -> &ReadingBus {
        &self.bus
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Run until shutdown; returns the simulation for inspection.
    pub async fn run(mut self) -> Simulation {
        let mut interval = time::interval(self.sim.tick_period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ran = 0u64;

        info!(period = ?self.sim.tick_period(), "simulation driver started");
        while !self.shutdown.load(Ordering::Relaxed)
            && self.max_ticks.is_none_or(|max| ran < max)
        {
            interval.tick().await;
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
            for event in self.sim.tick() {
                self.bus.publish(event);
            }
            ran += 1;
        }
        info!(ticks = ran, "simulation driver stopped");
        self.sim
    }
}

//! `omnisim-affection` – what each sensor perceives.
//!
//! # Modules
//!
//! - [`dispersion`] / [`noise`] – pure value transforms configured per node.
//! - [`primitives`] – ranged (target-range) and arced (sensor range + FOV)
//!   affection between two nodes.
//! - [`handler`] – the [`SensorHandler`][handler::SensorHandler] trait,
//!   [`SensorKind`][handler::SensorKind] dispatch and the per-query context.
//! - [`environmental`], [`camera`], [`ranging`], [`alarm`] – built-in
//!   handlers.
//! - [`tripwire`] – per (alarm, robot) position memory across ticks.
//! - [`registry`] – [`AffectionEngine`][registry::AffectionEngine]: handler
//!   registry and query entry point.

pub mod alarm;
pub mod camera;
pub mod dispersion;
pub mod environmental;
pub mod handler;
pub mod noise;
pub mod primitives;
pub mod ranging;
pub mod registry;
pub mod tripwire;

pub use handler::{HandlerContext, SensorHandler, SensorKind};
pub use registry::AffectionEngine;
pub use tripwire::{TripwireState, TripwireTracker};

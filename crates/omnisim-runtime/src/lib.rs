//! `omnisim-runtime` – runs the simulation core.
//!
//! # Modules
//!
//! - [`config`] – [`SimConfig`][config::SimConfig]: `omnisim.toml` with
//!   environment overrides, plus catalog loading from TOML or JSON and the
//!   catalog JSON Schema export.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: the global
//!   `tracing` subscriber with an optional OTLP span exporter.  Set
//!   `OTEL_EXPORTER_OTLP_ENDPOINT` to export affection-query spans to any
//!   OTLP-compatible collector.
//! - [`shared`] – [`SharedWorld`][shared::SharedWorld]: the world behind a
//!   reader–writer lock; event batches apply under one write lock.
//! - [`simulation`] – [`Simulation`][simulation::Simulation]: drains queued
//!   world events once per tick, then evaluates every sensor.
//!   [`QueryHandle`][simulation::QueryHandle] serves concurrent ad-hoc
//!   queries.
//! - [`bus`] – [`ReadingBus`][bus::ReadingBus]: in-process broadcast of
//!   reading and fault events.
//! - [`driver`] – [`Driver`][driver::Driver]: real-time tick loop on a
//!   `tokio` interval, stopped by a shutdown flag.

pub mod bus;
pub mod config;
pub mod driver;
pub mod shared;
pub mod simulation;
pub mod telemetry;

pub use bus::{ReadingBus, ReadingSubscriber};
pub use config::{LogFormat, SimConfig, TelemetryConfig};
pub use driver::Driver;
pub use shared::SharedWorld;
pub use simulation::{EventSender, QueryHandle, Simulation};
pub use telemetry::{TracerProviderGuard, init_tracing};

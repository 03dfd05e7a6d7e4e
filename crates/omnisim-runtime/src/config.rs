//! Simulation configuration – `omnisim.toml` – and catalog file loading.
//!
//! ```toml
//! tick_hz = 10.0
//! seed = 42
//! catalog_path = "catalog.toml"
//!
//! [baseline]
//! temperature = 22.0
//! luminosity = 70.0
//!
//! [telemetry]
//! log_format = "json"
//! ```
//!
//! # Environment overrides
//!
//! | Variable | Config field |
//! |---|---|
//! | `OMNISIM_SEED` | `seed` |
//! | `OMNISIM_TICK_HZ` | `tick_hz` |
//! | `OMNISIM_LOG_FORMAT` | `telemetry.log_format` (`json` / `compact`) |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | `telemetry.otlp_endpoint` |

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use omnisim_spatial::Catalog;
use omnisim_types::{CatalogFile, EnvironmentBaseline, SimError, catalog_schema};
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// OTLP/HTTP collector base URL.  Span export is off when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otlp_endpoint: Option<String>,
}

fn default_service_name() -> String {
    "omnisim".to_string()
}
fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_filter: default_log_filter(),
            log_format: LogFormat::default(),
            otlp_endpoint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Simulation ticks per second.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f64,

    /// Seed of every random draw (noise, low-light camera failures).
    #[serde(default)]
    pub seed: u64,

    #[serde(default)]
    pub baseline: EnvironmentBaseline,

    /// Node catalog, `.json` or `.toml`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    /// Capacity of the reading bus before slow subscribers lag.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_tick_hz() -> f64 {
    10.0
}
fn default_bus_capacity() -> usize {
    256
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            seed: 0,
            baseline: EnvironmentBaseline::default(),
            catalog_path: None,
            bus_capacity: default_bus_capacity(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl SimConfig {
    /// Wall-clock period of one tick.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !self.tick_hz.is_finite() || self.tick_hz <= 0.0 {
            return Err(SimError::InvalidConfiguration(format!(
                "tick_hz must be positive, got {}",
                self.tick_hz
            )));
        }
        if self.bus_capacity == 0 {
            return Err(SimError::InvalidConfiguration(
                "bus_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Loading
// ────────────────────────────────────────────────────────────────────────────

/// Load the config at `path`.  Returns `Ok(None)` when the file does not
/// exist.  Environment overrides are applied to the loaded value.
pub fn load_from(path: &Path) -> Result<Option<SimConfig>, SimError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        SimError::InvalidConfiguration(format!("failed to read {}: {e}", path.display()))
    })?;
    let mut cfg: SimConfig = toml::from_str(&raw)
        .map_err(|e| SimError::Serialization(format!("failed to parse config: {e}")))?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(Some(cfg))
}

/// [`load_from`], falling back to defaults (plus overrides) when the file is
/// missing.
pub fn load_or_default(path: &Path) -> Result<SimConfig, SimError> {
    match load_from(path)? {
        Some(cfg) => Ok(cfg),
        None => {
            let mut cfg = SimConfig::default();
            apply_env_overrides(&mut cfg);
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

/// Apply `OMNISIM_*` / `OTEL_*` environment overrides to `cfg`.
pub fn apply_env_overrides(cfg: &mut SimConfig) {
    apply_overrides_from(cfg, |key| std::env::var(key).ok());
}

/// Apply overrides using `lookup` as the variable source.  Unparseable
/// values are ignored.
pub fn apply_overrides_from(cfg: &mut SimConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("OMNISIM_SEED")
        && let Ok(seed) = v.parse::<u64>()
    {
        cfg.seed = seed;
    }
    if let Some(v) = lookup("OMNISIM_TICK_HZ")
        && let Ok(hz) = v.parse::<f64>()
    {
        cfg.tick_hz = hz;
    }
    if let Some(v) = lookup("OMNISIM_LOG_FORMAT") {
        match v.to_ascii_lowercase().as_str() {
            "json" => cfg.telemetry.log_format = LogFormat::Json,
            "compact" => cfg.telemetry.log_format = LogFormat::Compact,
            _ => {}
        }
    }
    if let Some(v) = lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
        && !v.is_empty()
    {
        cfg.telemetry.otlp_endpoint = Some(v);
    }
}

/// Parse a catalog document.  `json` selects JSON; anything else is TOML.
pub fn parse_catalog(raw: &str, json: bool) -> Result<Catalog, SimError> {
    let file: CatalogFile = if json {
        serde_json::from_str(raw)
            .map_err(|e| SimError::Serialization(format!("invalid catalog JSON: {e}")))?
    } else {
        toml::from_str(raw)
            .map_err(|e| SimError::Serialization(format!("invalid catalog TOML: {e}")))?
    };
    Catalog::from_file(file)
}

/// Load and validate a catalog file, choosing the format by extension.
pub fn load_catalog(path: &Path) -> Result<Catalog, SimError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        SimError::NotFound(format!("catalog {}: {e}", path.display()))
    })?;
    let json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    parse_catalog(&raw, json)
}

/// Write the JSON Schema of the catalog file format to `path`.
pub fn write_catalog_schema(path: &Path) -> Result<(), SimError> {
    let schema = serde_json::to_string_pretty(&catalog_schema())
        .map_err(|e| SimError::Serialization(e.to_string()))?;
    fs::write(path, schema).map_err(|e| {
        SimError::InvalidConfiguration(format!("failed to write {}: {e}", path.display()))
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

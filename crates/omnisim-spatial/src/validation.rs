//! [`CatalogVerifier`] – load-time validation of the node catalog.
//!
//! Every registered [`CatalogRule`] is evaluated against every node, in
//! registration order; the first violation aborts the load with
//! [`SimError::InvalidConfiguration`].
//!
//! Built-in rules:
//! - [`RangeRule`] – `range` must be finite and `>= 0`.
//! - [`FovRule`] – `fov` must lie in `[0, 360]`.
//! - [`HostRule`] – only composites and pan-tilt units may have children.
//! - [`UniqueNameRule`] – names are unique among siblings (and among roots).
//!
//! [`BoundsRule`] is added by [`Catalog::from_file`] when the document
//! declares an environment floor.

use std::collections::HashSet;

use omnisim_types::{EnvironmentBounds, Pose, Shape, SimError};
use tracing::warn;

use crate::catalog::{Catalog, Node};
use crate::geometry::shape_world_points;

// ────────────────────────────────────────────────────────────────────────────
// Rule trait
// ────────────────────────────────────────────────────────────────────────────

/// A structural invariant every catalog node must satisfy.
pub trait CatalogRule: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(())` when `node` satisfies the invariant.
    fn check(&self, node: &Node, catalog: &Catalog) -> Result<(), SimError>;
}

fn violation(rule: &str, node: &Node, details: impl std::fmt::Display) -> SimError {
    SimError::InvalidConfiguration(format!("[{rule}] {}: {details}", node.identity))
}

// ────────────────────────────────────────────────────────────────────────────
// CatalogVerifier
// ────────────────────────────────────────────────────────────────────────────

/// Rule engine run by [`Catalog::from_entries`].
///
/// # Example
///
/// ```
/// use omnisim_spatial::catalog::Catalog;
/// use omnisim_spatial::validation::{CatalogVerifier, FovRule};
/// use omnisim_types::{CatalogEntry, NodeClass, Properties};
///
/// let mut verifier = CatalogVerifier::new();
/// verifier.add_rule(Box::new(FovRule));
///
/// let camera = CatalogEntry::new(NodeClass::Sensor, "ca_1").with_properties(Properties {
///     fov: Some(400.0),
///     ..Properties::default()
/// });
/// assert!(Catalog::with_verifier(vec![camera], &verifier).is_err());
/// ```
#[derive(Default)]
pub struct CatalogVerifier {
    rules: Vec<Box<dyn CatalogRule>>,
}

impl CatalogVerifier {
    /// Empty verifier; accepts any catalog.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_rules() -> Self {
        let mut verifier = Self::new();
        verifier.add_rule(Box::new(RangeRule));
        verifier.add_rule(Box::new(FovRule));
        verifier.add_rule(Box::new(HostRule));
        verifier.add_rule(Box::new(UniqueNameRule));
        verifier
    }

    pub fn add_rule(&mut self, rule: Box<dyn CatalogRule>) {
        self.rules.push(rule);
    }

    pub fn verify(&self, catalog: &Catalog) -> Result<(), SimError> {
        for node in catalog.nodes() {
            for rule in &self.rules {
                rule.check(node, catalog)?;
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in rules
// ────────────────────────────────────────────────────────────────────────────

pub struct RangeRule;

impl CatalogRule for RangeRule {
    fn name(&self) -> &str {
        "range"
    }

    fn check(&self, node: &Node, _catalog: &Catalog) -> Result<(), SimError> {
        match node.properties.range {
            Some(r) if !r.is_finite() || r < 0.0 => {
                Err(violation(self.name(), node, format!("range {r} must be >= 0")))
            }
            _ => Ok(()),
        }
    }
}

pub struct FovRule;

impl CatalogRule for FovRule {
    fn name(&self) -> &str {
        "fov"
    }

    fn check(&self, node: &Node, _catalog: &Catalog) -> Result<(), SimError> {
        match node.properties.fov {
            Some(f) if !(0.0..=360.0).contains(&f) => Err(violation(
                self.name(),
                node,
                format!("fov {f} outside [0, 360]"),
            )),
            _ => Ok(()),
        }
    }
}

pub struct HostRule;

impl CatalogRule for HostRule {
    fn name(&self) -> &str {
        "host"
    }

    fn check(&self, node: &Node, _catalog: &Catalog) -> Result<(), SimError> {
        if !node.children.is_empty() && !node.can_host() {
            return Err(violation(
                self.name(),
                node,
                "only composites and pan-tilt units may host devices",
            ));
        }
        Ok(())
    }
}

pub struct UniqueNameRule;

impl UniqueNameRule {
    fn check_scope<'a>(
        &self,
        owner: &Node,
        names: impl Iterator<Item = &'a str>,
    ) -> Result<(), SimError> {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name) {
                return Err(violation(
                    self.name(),
                    owner,
                    format!("duplicate name '{name}' in scope"),
                ));
            }
        }
        Ok(())
    }
}

impl CatalogRule for UniqueNameRule {
    fn name(&self) -> &str {
        "unique_name"
    }

    fn check(&self, node: &Node, catalog: &Catalog) -> Result<(), SimError> {
        let children = node
            .children
            .iter()
            .filter_map(|id| catalog.get(*id))
            .map(Node::name);
        self.check_scope(node, children)?;

        // Roots share the implicit world scope; check it once, from the first root.
        if catalog.roots().first() == Some(&node.id) {
            let roots = catalog
                .roots()
                .iter()
                .filter_map(|id| catalog.get(*id))
                .map(Node::name);
            self.check_scope(node, roots)?;
        }
        Ok(())
    }
}

/// `true` when the footprint of a node at `pose` lies on `bounds`.  A
/// shapeless node is checked by its position alone.
///
/// # Errors
///
/// [`SimError::InvalidGeometry`] when the shape cannot be evaluated.
pub fn footprint_within(
    pose: &Pose,
    shape: Option<&Shape>,
    bounds: &EnvironmentBounds,
) -> Result<bool, SimError> {
    let points = match shape {
        Some(shape) => shape_world_points(pose, shape)?,
        None => vec![pose.position()],
    };
    Ok(points.into_iter().all(|p| bounds.contains(p)))
}

/// Top-level nodes must be placed inside the environment floor.  Mounted
/// nodes follow their host and are checked at run time by
/// [`World`](crate::world::World).
pub struct BoundsRule {
    bounds: EnvironmentBounds,
}

impl BoundsRule {
    pub fn new(bounds: EnvironmentBounds) -> Self {
        Self { bounds }
    }
}

impl CatalogRule for BoundsRule {
    fn name(&self) -> &str {
        "bounds"
    }

    fn check(&self, node: &Node, _catalog: &Catalog) -> Result<(), SimError> {
        if !node.is_root() {
            return Ok(());
        }
        match footprint_within(&node.initial_pose, node.properties.shape.as_ref(), &self.bounds) {
            Ok(true) => Ok(()),
            Ok(false) => Err(violation(
                self.name(),
                node,
                format!(
                    "placed outside the {} x {} environment",
                    self.bounds.width, self.bounds.height
                ),
            )),
            Err(e) => {
                warn!(node = %node.identity, error = %e, "bounds check skipped");
                Ok(())
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

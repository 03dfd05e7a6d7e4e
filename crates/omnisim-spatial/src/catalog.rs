//! Node catalog arena.
//!
//! The catalog is loaded once from a tree of [`CatalogEntry`] values and
//! flattened into a `Vec<Node>` in **pre-order**, so a node's [`NodeId`] is
//! its declaration position and a linear scan is a depth-first search in
//! declaration order.  Parent/child links are ids, never references.
//!
//! After load only numeric properties change (external actuation); identity
//! and hierarchy are fixed.
//!
//! # Example
//!
//! ```rust
//! use omnisim_spatial::catalog::{Catalog, NodeQuery};
//! use omnisim_types::{CatalogEntry, MountOffset, NodeClass, Pose};
//!
//! let robot = CatalogEntry::new(NodeClass::Composite, "rb_1")
//!     .with_type("robot")
//!     .with_pose(Pose::new(1.0, 1.0, 0.0))
//!     .with_child(
//!         CatalogEntry::new(NodeClass::Sensor, "so_1")
//!             .with_type("distance")
//!             .with_mount(MountOffset::new(0.5, 0.0, 0.0)),
//!     );
//!
//! let catalog = Catalog::from_entries(vec![robot]).unwrap();
//! let sonar = catalog.find(&NodeQuery::new(NodeClass::Sensor, "so_1")).unwrap();
//! assert_eq!(catalog.ancestors(sonar).len(), 1);
//! ```

use omnisim_types::{
    CatalogEntry, CatalogFile, EnvironmentBounds, MountOffset, NodeClass, NodeId, NodeIdentity,
    Pose, Properties, SimError,
};
use tracing::info;

use crate::validation::{BoundsRule, CatalogVerifier};

// ────────────────────────────────────────────────────────────────────────────
// Node
// ────────────────────────────────────────────────────────────────────────────

/// One entity of the simulated environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub identity: NodeIdentity,
    pub properties: Properties,
    /// Offset in the host's frame; zero for roots.
    pub mount: MountOffset,
    pub pan_tilt: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// World pose at load time.  Only used for roots.
    pub initial_pose: Pose,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Robots are composites typed (or subtyped) `robot`.
    pub fn is_robot(&self) -> bool {
        self.identity.class == NodeClass::Composite && self.identity.is_kind("robot")
    }

    /// Only composites and pan-tilt units carry mounted devices.
    pub fn can_host(&self) -> bool {
        self.identity.class == NodeClass::Composite || self.pan_tilt
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }
}

// ────────────────────────────────────────────────────────────────────────────
// NodeQuery
// ────────────────────────────────────────────────────────────────────────────

/// Lookup key `(class, type?, subtype?, name)`.  Unset type/subtype match
/// anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeQuery {
    pub class: NodeClass,
    pub type_: Option<String>,
    pub subtype: Option<String>,
    pub name: String,
}

impl NodeQuery {
    pub fn new(class: NodeClass, name: impl Into<String>) -> Self {
        Self {
            class,
            type_: None,
            subtype: None,
            name: name.into(),
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

    pub fn matches(&self, identity: &NodeIdentity) -> bool {
        identity.class == self.class
            && identity.name == self.name
            && self.type_.as_ref().is_none_or(|t| identity.type_.as_ref() == Some(t))
            && self
                .subtype
                .as_ref()
                .is_none_or(|s| identity.subtype.as_ref() == Some(s))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Catalog
// ────────────────────────────────────────────────────────────────────────────

/// Flattened, validated node hierarchy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    bounds: Option<EnvironmentBounds>,
}

impl Catalog {
    /// Flatten and validate a list of top-level entries with the default
    /// rule set.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidConfiguration`] when any catalog rule is violated.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self, SimError> {
        Self::with_verifier(entries, &CatalogVerifier::with_default_rules())
    }

    /// Load a catalog document.  A declared environment floor adds a
    /// [`BoundsRule`] and is kept for run-time checks.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidConfiguration`] when any catalog rule is violated.
    pub fn from_file(file: CatalogFile) -> Result<Self, SimError> {
        let mut verifier = CatalogVerifier::with_default_rules();
        if let Some(bounds) = file.environment {
            verifier.add_rule(Box::new(BoundsRule::new(bounds)));
        }
        let mut catalog = Self::with_verifier(file.nodes, &verifier)?;
        catalog.bounds = file.environment;
        Ok(catalog)
    }

    /// Environment floor, when the catalog declares one.
    pub fn bounds(&self) -> Option<EnvironmentBounds> {
        self.bounds
    }

    /// Flatten `entries` and validate them against `verifier`.
    pub fn with_verifier(
        entries: Vec<CatalogEntry>,
        verifier: &CatalogVerifier,
    ) -> Result<Self, SimError> {
        let mut catalog = Self::default();
        for entry in entries {
            let id = catalog.insert(entry, None);
            catalog.roots.push(id);
        }
        verifier.verify(&catalog)?;
        info!(
            nodes = catalog.nodes.len(),
            roots = catalog.roots.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    fn insert(&mut self, entry: CatalogEntry, parent: Option<NodeId>) -> NodeId {
        let identity = entry.identity();
        let CatalogEntry {
            properties,
            mount,
            pose,
            pan_tilt,
            children,
            ..
        } = entry;

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            identity,
            properties,
            mount: if parent.is_some() {
                mount.unwrap_or_default()
            } else {
                MountOffset::default()
            },
            pan_tilt,
            parent,
            children: Vec::new(),
            initial_pose: pose.unwrap_or_default(),
        });

        for child in children {
            let child_id = self.insert(child, Some(id));
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Like [`Catalog::get`] but reports a missing node as an error.
    pub fn node(&self, id: NodeId) -> Result<&Node, SimError> {
        self.get(id)
            .ok_or_else(|| SimError::NotFound(format!("node {id}")))
    }

    /// All nodes in declaration (pre-)order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Sensors in declaration order.
    pub fn sensors(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|n| n.identity.class == NodeClass::Sensor)
    }

    /// First node matching `query` in depth-first declaration order.
    pub fn find(&self, query: &NodeQuery) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| query.matches(&n.identity))
            .map(|n| n.id)
    }

    /// Chain of hosts from the direct parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            out.push(parent);
            current = self.get(parent).and_then(|n| n.parent);
        }
        out
    }

    /// `true` when `candidate` is `id` itself or one of its hosts.
    pub fn is_self_or_ancestor(&self, id: NodeId, candidate: NodeId) -> bool {
        id == candidate || self.ancestors(id).contains(&candidate)
    }

    /// Every node below `id`, pre-order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.get(id) {
            Some(n) => n.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(n) = self.get(next) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        out
    }

    /// Apply an external numeric property change.
    pub fn set_property(&mut self, id: NodeId, name: &str, value: f64) -> Result<(), SimError> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or_else(|| SimError::NotFound(format!("node {id}")))?;
        node.properties.set_number(name, value);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

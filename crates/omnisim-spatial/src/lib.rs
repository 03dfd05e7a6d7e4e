//! `omnisim-spatial` – where everything is.
//!
//! # Modules
//!
//! - [`geometry`] – distance, segment orientation and intersection, shape
//!   outlines in world frame, angle normalization.
//! - [`transform`] – [`Transform2D`][transform::Transform2D]: 3×3 homogeneous
//!   rigid transforms and pose composition.
//! - [`catalog`] – [`Catalog`][catalog::Catalog]: arena of nodes flattened
//!   from the catalog tree in declaration order.
//! - [`validation`] – [`CatalogVerifier`][validation::CatalogVerifier]: rule
//!   engine run when a catalog is loaded.
//! - [`pose_graph`] – [`PoseGraph`][pose_graph::PoseGraph]: cached relative
//!   and absolute poses with mount and pan-tilt propagation.
//! - [`world`] – [`World`][world::World]: catalog + pose graph behind one
//!   event-application entry point.

pub mod catalog;
pub mod geometry;
pub mod pose_graph;
pub mod transform;
pub mod validation;
pub mod world;

pub use catalog::{Catalog, Node, NodeQuery};
pub use pose_graph::PoseGraph;
pub use world::{Resolved, World};

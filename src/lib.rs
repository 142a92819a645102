//! Moving-mesh hydrodynamics on Voronoi cells built from a Delaunay dual.
//!
//! Every step, the cells of the active generators are rebuilt by walking the
//! ring of Delaunay triangles around them. The faces between the cells are
//! deduplicated and classified by the partition (or boundary) on their far
//! side, after which fluxes are exchanged conservatively across them.

pub use config::Config;
pub use delaunay::DelaunayTessellation;
pub use generator::{Generator, PipelineStage};
pub use initial_conditions::{Boundary, Halo, InitialConditions};
pub use space::Space;
pub use voronoi::Voronoi;

pub mod config;
pub mod connectivity;
pub mod delaunay;
pub mod errors;
pub mod face_registry;
pub mod flux;
pub mod gas_law;
pub mod generator;
pub mod geometry;
pub mod gradients;
pub mod initial_conditions;
pub mod physical_quantities;
pub mod relation;
pub mod riemann_solver;
mod space;
pub mod utils;
pub mod voronoi;

use thiserror::Error;

use crate::{generator::PipelineStage, relation::RelationClass};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required parameter in configuration: {0}")]
    MissingParameter(String),
    #[error("Unknown type of Riemann solver configured: {0}")]
    UnknownRiemannSolver(String),
    #[error("Unknown type of equation of state configured: {0}")]
    UnknownEOS(String),
    #[error("Unknown type of boundary condition configured: {0}")]
    UnknownBoundaryConditions(String),
    #[error("Unknown type of initial conditions configured: {0}")]
    UnknownICs(String),
    #[error("Illegal value for {name}: {value}")]
    IllegalValue { name: String, value: String },
    #[error("Failed to parse configuration")]
    Yaml(#[from] yaml_rust::ScanError),
}

/// Fatal conditions of a tessellation rebuild or a flux pass.
///
/// None of these can be recovered from locally: partially built mesh state is
/// discarded and the owner of the partition is expected to abort.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error(
        "Generator {generator} is part of triangle {triangle} with placeholder vertex {vertex}! \
         This could mean that a neighbouring region is empty or the halo is incomplete."
    )]
    PlaceholderInRing {
        generator: usize,
        triangle: usize,
        vertex: usize,
    },
    #[error("Broken adjacency around generator {generator} at triangle {triangle}: {details}")]
    BrokenAdjacency {
        generator: usize,
        triangle: usize,
        details: String,
    },
    #[error("Invalid Delaunay vertex ranges: {0}")]
    InvalidVertexRanges(String),
    #[error("Failed to insert vertex {vertex} in the triangulation: {details}")]
    InsertionFailed { vertex: usize, details: String },
    #[error("Foreign index {index} out of range (halo has {len} generators) for {relation:?} face")]
    ForeignIndexOutOfRange {
        index: usize,
        len: usize,
        relation: RelationClass,
    },
    #[error("Flux exchange is not conservative: net {quantity} imbalance {imbalance:e}")]
    NonConservation { quantity: &'static str, imbalance: f64 },
    #[error("Cannot open connectivity span for {requested} while span of {open} is still open")]
    OverlappingSpan { requested: usize, open: usize },
    #[error("Generator {generator} cannot move from {from:?} to {to:?}")]
    StageViolation {
        generator: usize,
        from: PipelineStage,
        to: PipelineStage,
    },
    #[error("Invalid relation class code: {0}")]
    InvalidRelationCode(u8),
    #[error("Generator count mismatch: expected {expected}, found {found}")]
    CountMismatch { expected: usize, found: usize },
}

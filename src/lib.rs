#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
use thiserror::Error;

pub mod annotations;
pub mod enrichment;
pub mod graph;
pub mod ontology;
pub mod parser;
pub mod resolver;
pub mod stats;

pub use annotations::{GeneAnnotation, TermAssociation};
pub use enrichment::{
    AttrValue, Enrichment, EnrichmentEntry, EnrichmentFinder, GseaEnrichmentFinder, GseaParams,
    Method, PrefixSeries, RankedParentChildEnrichmentFinder, Side,
};
pub use graph::{DiGraph, NodeIndex};
pub use ontology::{OntologyGraph, OntologyTerm};
pub use resolver::{FirstOneResolver, IdResolver, IdentityResolver, ResolverKind};
pub use stats::Correction;

/// Label of the only relationship that does not need a `Typedef`
pub const IS_A: &str = "is_a";

const DEFAULT_NUM_EDGES: usize = 4;
const DEFAULT_NUM_TERMS: usize = 20_000;
const DEFAULT_PERMUTATIONS: usize = 1000;

/// Error type of the `goenrich` crate
#[derive(Error, Debug, PartialEq)]
pub enum OntologyError {
    /// A node with this id is already part of a strict graph
    #[error("node {0} already exists")]
    DuplicateNode(String),
    /// Neither a node nor a synonym with this id exists
    #[error("node {0} does not exist")]
    NodeNotFound(String),
    /// A required field of a `Term` or `Typedef` record is missing
    #[error("record without required field `{0}`")]
    MissingField(&'static str),
    /// A `relationship` value is not `<relation> <target-id>`
    #[error("malformed relationship: {0}")]
    MalformedRelationship(String),
    /// Relationship types are used on edges but never declared as `Typedef`
    #[error("undefined relations: {}", .0.join(", "))]
    UndefinedRelation(Vec<String>),
    /// Malformed OBO or GAF input
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Unknown enrichment method name
    #[error("unknown enrichment method: {0}")]
    UnknownMethod(String),
    /// Unknown multiple-testing correction name
    #[error("unknown correction: {0}")]
    UnknownCorrection(String),
    /// Unknown side of a ranked gene list
    #[error("unknown side: {0}")]
    UnknownSide(String),
    /// A parameter is outside of its valid range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Source file cannot be read
    #[error("cannot open file {0}")]
    CannotOpenFile(String),
}

/// Shortcut for `Result<T, OntologyError>`
pub type OntologyResult<T> = Result<T, OntologyError>;

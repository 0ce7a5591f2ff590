// src/core/call_graph/mod.rs
//! Function-dependency graph for one lexical scope
//!
//! Units are extracted from the direct children of a scope, their bodies are
//! searched for calls to siblings, and the resulting graph is ordered so that
//! callers read above the functions they call.

mod unit;
mod syntax;
mod extractor;
mod resolver;
mod call_graph;
mod orderer;

pub use unit::{ByteRange, CallableUnit, UnitKind};
pub use syntax::{ExpressionKind, ScopeKind, StatementKind};
pub use extractor::{CallableUnitExtractor, ExtractedUnit, Scope};
pub use resolver::CallEdgeResolver;
pub use call_graph::{build_graph, DependencyGraph, GraphStats};
pub use orderer::{compute_readable_order, ReadabilityOrderer};

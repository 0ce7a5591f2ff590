// src/core/mod.rs
mod engine;
mod parser;
mod analyzer;
mod rewriter;

// Callable units, call edges and the readable order
mod call_graph;

// Language-specific parsers
mod languages;

pub use parser::{SourceParser, ParsedSource, calculate_hash};
pub use analyzer::{ScopeAnalyzer, ScopeReport, FileOutcome, reorder_source, line_of};
pub use rewriter::{render, RenderOutcome, SourceRewriter, Splice};
pub use languages::{LanguageParser, JavaScriptParser, TypeScriptParser};

pub use call_graph::{
    ByteRange, CallableUnit, UnitKind,
    ScopeKind, StatementKind, ExpressionKind,
    CallableUnitExtractor, ExtractedUnit, Scope,
    CallEdgeResolver,
    DependencyGraph, GraphStats, build_graph,
    ReadabilityOrderer, compute_readable_order,
};

// Export the main engine
pub use engine::{Engine, FileReport, FixSummary};

// src/core/analyzer.rs
use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tree_sitter::{Node, Tree};

use crate::config::OrderingConfig;
use super::call_graph::{
    build_graph, compute_readable_order, ByteRange, CallEdgeResolver, CallableUnit,
    CallableUnitExtractor, ExpressionKind, ExtractedUnit, GraphStats, Scope, ScopeKind,
};
use super::rewriter::{SourceRewriter, Splice};

/// Ordering analysis of one scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeReport {
    pub kind: ScopeKind,
    pub class_name: Option<String>,
    /// Range of the scope node
    pub span: ByteRange,
    /// 1-based line where the scope starts
    pub line: usize,
    /// Units kept in the graph, in source order, with resolved calls
    pub units: Vec<CallableUnit>,
    pub duplicates: Vec<String>,
    pub cycles: Vec<Vec<String>>,
    pub stats: GraphStats,
    pub source_order: Vec<String>,
    pub order: Vec<String>,
    /// Edit that puts the scope in readable order, if it is not already
    pub splice: Option<Splice>,
}

impl ScopeReport {
    pub fn needs_reorder(&self) -> bool {
        self.splice.is_some()
    }
}

/// Analysis of every scope of one parse, plus the text after applying the
/// non-overlapping rewrites
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub reports: Vec<ScopeReport>,
    pub new_text: Option<String>,
    /// Rewrites left for a later pass because they overlap an applied one
    pub deferred: usize,
}

impl FileOutcome {
    pub fn changed(&self) -> bool {
        self.new_text.is_some()
    }
}

/// Runs extraction, resolution, ordering and rewriting over the scopes of a
/// parsed file
pub struct ScopeAnalyzer {
    options: OrderingConfig,
}

/// Reorder every eligible scope of `source` in one pass
pub fn reorder_source(source: &str, tree: &Tree, options: &OrderingConfig) -> FileOutcome {
    ScopeAnalyzer::new(options).reorder(source, tree)
}

impl ScopeAnalyzer {
    pub fn new(options: &OrderingConfig) -> Self {
        Self {
            options: options.clone(),
        }
    }

    /// Scopes to analyze, outermost first
    pub fn scopes<'tree>(&self, source: &str, tree: &'tree Tree) -> Vec<Scope<'tree>> {
        let root = tree.root_node();
        let mut scopes = vec![Scope::new(ScopeKind::Program, root)];

        if !self.options.class_bodies && !self.options.nested_scopes {
            return scopes;
        }

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "class_body" if self.options.class_bodies => {
                    let class_name = node
                        .parent()
                        .and_then(|class| class.child_by_field_name("name"))
                        .map(|name| source[name.byte_range()].to_string());
                    scopes.push(Scope::new(ScopeKind::ClassBody, node).with_class_name(class_name));
                }
                "statement_block" if self.options.nested_scopes && is_function_body(node) => {
                    scopes.push(Scope::new(ScopeKind::Block, node));
                }
                _ => {}
            }

            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }

        scopes
    }

    /// Build the graph of one scope, order it and plan its rewrite
    pub fn analyze_scope(&self, source: &str, scope: &Scope) -> ScopeReport {
        let extracted = CallableUnitExtractor::new(source).extract(scope);

        let siblings: HashSet<String> = extracted
            .iter()
            .map(|extracted| extracted.unit.name.clone())
            .collect();
        let resolver = CallEdgeResolver::new(source, siblings, scope.kind)
            .with_class_name(scope.class_name.clone());

        let units: Vec<CallableUnit> = extracted
            .into_iter()
            .map(|ExtractedUnit { mut unit, bodies }| {
                for body in bodies {
                    for callee in resolver.resolve(body) {
                        unit.add_call(&callee);
                    }
                }
                unit
            })
            .collect();

        let graph = build_graph(units);
        let order = compute_readable_order(&graph);

        let splice = match SourceRewriter::new(source).plan(graph.units(), &order) {
            Ok(splice) => splice,
            Err(e) => {
                warn!("Skipping rewrite of {:?} scope at byte {}: {}", scope.kind, scope.node.start_byte(), e);
                None
            }
        };

        let span = scope.span();
        debug!(
            "{:?} scope at byte {}: {} units, order {:?}",
            scope.kind,
            span.start,
            graph.len(),
            order
        );

        ScopeReport {
            kind: scope.kind,
            class_name: scope.class_name.clone(),
            span,
            line: line_of(source, span.start),
            source_order: graph.names(),
            cycles: graph.detect_cycles(),
            stats: graph.get_statistics(),
            duplicates: graph.duplicates.clone(),
            units: graph.into_units(),
            order,
            splice,
        }
    }

    /// Analyze every scope of a parse
    pub fn analyze(&self, source: &str, tree: &Tree) -> Vec<ScopeReport> {
        self.scopes(source, tree)
            .iter()
            .map(|scope| self.analyze_scope(source, scope))
            .collect()
    }

    /// Analyze every scope and apply the rewrites that do not overlap
    pub fn reorder(&self, source: &str, tree: &Tree) -> FileOutcome {
        let reports = self.analyze(source, tree);

        // Outer scopes come first, so they win over scopes nested inside them
        let mut accepted: Vec<&Splice> = Vec::new();
        let mut deferred = 0;
        for splice in reports.iter().filter_map(|report| report.splice.as_ref()) {
            if accepted.iter().any(|taken| taken.range.overlaps(&splice.range)) {
                deferred += 1;
            } else {
                accepted.push(splice);
            }
        }

        let new_text = if accepted.is_empty() {
            None
        } else {
            // Back to front keeps earlier offsets valid
            accepted.sort_by(|a, b| b.range.start.cmp(&a.range.start));
            let mut text = source.to_string();
            for splice in accepted {
                text = splice.apply(&text);
            }
            Some(text)
        };

        FileOutcome {
            reports,
            new_text,
            deferred,
        }
    }
}

/// Whether a statement block is the body of a function-like node
fn is_function_body(block: Node) -> bool {
    block
        .parent()
        .filter(|parent| ExpressionKind::classify(parent.kind()) == ExpressionKind::FunctionBoundary)
        .and_then(|parent| parent.child_by_field_name("body"))
        .map_or(false, |body| body == block)
}

/// 1-based line number of a byte offset
pub fn line_of(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}

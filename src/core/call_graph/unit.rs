// src/core/call_graph/unit.rs
use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` into a source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &ByteRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl From<std::ops::Range<usize>> for ByteRange {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// How a callable unit is written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// `function name() {}`
    Declaration,
    /// `const name = () => {}` or `const name = function () {}`
    Expression,
    /// A method inside a class body
    Method,
}

/// One function-like definition at a given scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableUnit {
    /// Binding identifier (declaration name, variable name or method name)
    pub name: String,
    pub kind: UnitKind,
    /// Exact source range of the definition, header through closing brace
    pub range: ByteRange,
    /// Comments attached above the unit, in source order
    pub leading_comments: Vec<ByteRange>,
    /// Sibling units this unit's body invokes, in order of first discovery
    pub calls: Vec<String>,
}

impl CallableUnit {
    pub fn new(name: impl Into<String>, kind: UnitKind, range: ByteRange) -> Self {
        Self {
            name: name.into(),
            kind,
            range,
            leading_comments: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Start of the unit including its attached comments
    pub fn full_start(&self) -> usize {
        self.leading_comments
            .first()
            .map(|comment| comment.start.min(self.range.start))
            .unwrap_or(self.range.start)
    }

    /// Comment-inclusive range of the unit
    pub fn full_range(&self) -> ByteRange {
        ByteRange::new(self.full_start(), self.range.end)
    }

    /// Record a call edge, keeping first-discovery order and no duplicates
    pub fn add_call(&mut self, callee: &str) {
        if !self.calls.iter().any(|existing| existing == callee) {
            self.calls.push(callee.to_string());
        }
    }

    pub fn calls_itself(&self) -> bool {
        self.calls.iter().any(|callee| callee == &self.name)
    }
}

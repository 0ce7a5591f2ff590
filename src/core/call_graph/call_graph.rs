// src/core/call_graph/call_graph.rs
use std::collections::{HashMap, HashSet};
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use super::unit::CallableUnit;

/// Call graph over the sibling units of one scope
///
/// Units keep their source order. Every name in a unit's `calls` is a key of
/// the graph; edges to anything else are dropped when the graph is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    /// Units in original source order
    units: Vec<CallableUnit>,
    /// Name -> position in `units`
    index: HashMap<String, usize>,
    /// Outgoing edges by position, in call discovery order
    adjacency_list: Vec<Vec<usize>>,
    /// Incoming edges by position (who calls this unit), in source order
    reverse_adjacency: Vec<Vec<usize>>,
    /// Names rejected because an earlier unit already used them
    pub duplicates: Vec<String>,
}

/// Build the dependency graph for one scope
pub fn build_graph(units: Vec<CallableUnit>) -> DependencyGraph {
    DependencyGraph::build(units)
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from units in source order
    pub fn build(units: Vec<CallableUnit>) -> Self {
        let mut graph = Self::new();

        // First pass: register units, skipping duplicate names
        for unit in units {
            graph.add_unit(unit);
        }

        // Second pass: drop edges to names outside the graph
        let index = &graph.index;
        for unit in &mut graph.units {
            unit.calls.retain(|callee| index.contains_key(callee));
        }

        graph.build_adjacency_lists();

        debug!(
            "Built dependency graph with {} units and {} edges",
            graph.units.len(),
            graph.edge_count()
        );

        graph
    }

    /// Add a unit; a unit whose name is already taken is reported and skipped
    fn add_unit(&mut self, unit: CallableUnit) -> bool {
        if self.index.contains_key(&unit.name) {
            warn!(
                "Duplicate definition of `{}` at byte {}; excluding it from ordering",
                unit.name, unit.range.start
            );
            self.duplicates.push(unit.name);
            return false;
        }

        self.index.insert(unit.name.clone(), self.units.len());
        self.units.push(unit);
        true
    }

    /// Units in source order
    pub fn units(&self) -> &[CallableUnit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<CallableUnit> {
        self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&CallableUnit> {
        self.index.get(name).map(|&position| &self.units[position])
    }

    /// Position of a unit in source order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Unit names in source order
    pub fn names(&self) -> Vec<String> {
        self.units.iter().map(|unit| unit.name.clone()).collect()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency_list.iter().map(Vec::len).sum()
    }

    /// Positions called by the unit at `position`, in discovery order
    pub(crate) fn callee_positions(&self, position: usize) -> &[usize] {
        &self.adjacency_list[position]
    }

    /// Units that this unit calls (outgoing edges)
    pub fn get_callees(&self, name: &str) -> Vec<&str> {
        self.position(name)
            .map(|position| {
                self.adjacency_list[position]
                    .iter()
                    .map(|&callee| self.units[callee].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Units that call this unit (incoming edges), self-calls included
    pub fn get_callers(&self, name: &str) -> Vec<&str> {
        self.position(name)
            .map(|position| {
                self.reverse_adjacency[position]
                    .iter()
                    .map(|&caller| self.units[caller].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of distinct other units calling the unit at `position`
    pub(crate) fn in_degree_at(&self, position: usize) -> usize {
        self.reverse_adjacency[position]
            .iter()
            .filter(|&&caller| caller != position)
            .count()
    }

    /// Number of distinct other units calling this unit
    pub fn in_degree(&self, name: &str) -> usize {
        self.position(name)
            .map(|position| self.in_degree_at(position))
            .unwrap_or(0)
    }

    /// Number of distinct other units this unit calls
    pub fn out_degree(&self, name: &str) -> usize {
        self.position(name)
            .map(|position| {
                self.adjacency_list[position]
                    .iter()
                    .filter(|&&callee| callee != position)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Units nobody else calls, in source order
    pub fn roots(&self) -> Vec<&str> {
        (0..self.units.len())
            .filter(|&position| self.in_degree_at(position) == 0)
            .map(|position| self.units[position].name.as_str())
            .collect()
    }

    /// Get statistics about the graph
    pub fn get_statistics(&self) -> GraphStats {
        GraphStats {
            total_units: self.units.len(),
            total_calls: self.edge_count(),
            roots: self.roots().len(),
            self_calls: self.units.iter().filter(|unit| unit.calls_itself()).count(),
            cycles: self.detect_cycles().len(),
            duplicates: self.duplicates.len(),
            max_in_degree: (0..self.units.len())
                .map(|position| self.in_degree_at(position))
                .max()
                .unwrap_or(0),
        }
    }

    /// Build adjacency lists for efficient traversal
    fn build_adjacency_lists(&mut self) {
        self.adjacency_list = vec![Vec::new(); self.units.len()];
        self.reverse_adjacency = vec![Vec::new(); self.units.len()];

        for (caller, unit) in self.units.iter().enumerate() {
            for callee_name in &unit.calls {
                if let Some(&callee) = self.index.get(callee_name) {
                    // Forward adjacency (caller -> callee)
                    self.adjacency_list[caller].push(callee);
                    // Reverse adjacency (callee -> caller)
                    self.reverse_adjacency[callee].push(caller);
                }
            }
        }
    }

    /// Detect cycles of two or more units using DFS
    ///
    /// Self-calls are not reported. Used for reporting only; ordering
    /// tolerates cycles on its own.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut current_path = Vec::new();

        for node in 0..self.units.len() {
            if !visited.contains(&node) {
                self.dfs_cycle_detection(
                    node,
                    &mut visited,
                    &mut rec_stack,
                    &mut current_path,
                    &mut cycles,
                );
            }
        }

        cycles
    }

    /// DFS helper for cycle detection
    fn dfs_cycle_detection(
        &self,
        node: usize,
        visited: &mut HashSet<usize>,
        rec_stack: &mut HashSet<usize>,
        current_path: &mut Vec<usize>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        visited.insert(node);
        rec_stack.insert(node);
        current_path.push(node);

        for &callee in &self.adjacency_list[node] {
            if callee == node {
                continue;
            }
            if !visited.contains(&callee) {
                self.dfs_cycle_detection(callee, visited, rec_stack, current_path, cycles);
            } else if rec_stack.contains(&callee) {
                if let Some(cycle_start) = current_path.iter().position(|&n| n == callee) {
                    let cycle = current_path[cycle_start..]
                        .iter()
                        .map(|&position| self.units[position].name.clone())
                        .collect();
                    cycles.push(cycle);
                }
            }
        }

        rec_stack.remove(&node);
        current_path.pop();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_units: usize,
    pub total_calls: usize,
    pub roots: usize,
    pub self_calls: usize,
    pub cycles: usize,
    pub duplicates: usize,
    pub max_in_degree: usize,
}

// src/core/call_graph/orderer.rs
use tracing::trace;

use super::DependencyGraph;

/// Computes a "callers before callees" order over the units of a graph
///
/// DFS pre-order from the roots (units no other unit calls), in source order.
/// Units on cycles that no root reaches start their own traversal from the
/// earliest of them.
/// A callee reached again by a later caller keeps the position its first
/// caller gave it. Back-edges to units still on the DFS stack are skipped,
/// which is what breaks cycles.
pub struct ReadabilityOrderer<'g> {
    graph: &'g DependencyGraph,
    visited: Vec<bool>,
    in_progress: Vec<bool>,
    output: Vec<usize>,
}

/// Compute the readable order of a graph's unit names
pub fn compute_readable_order(graph: &DependencyGraph) -> Vec<String> {
    ReadabilityOrderer::new(graph).run()
}

impl<'g> ReadabilityOrderer<'g> {
    pub fn new(graph: &'g DependencyGraph) -> Self {
        Self {
            graph,
            visited: vec![false; graph.len()],
            in_progress: vec![false; graph.len()],
            output: Vec::with_capacity(graph.len()),
        }
    }

    /// Consume the orderer and produce the ordered unit names
    pub fn run(mut self) -> Vec<String> {
        let roots: Vec<bool> = (0..self.graph.len())
            .map(|position| self.graph.in_degree_at(position) == 0)
            .collect();
        let reachable = self.reachable_from(&roots);

        // A component no root reaches is entered at its earliest unit, at that
        // unit's place in source order
        for position in 0..self.graph.len() {
            if roots[position] || !reachable[position] {
                self.emit(position);
            }
        }

        let units = self.graph.units();
        self.output
            .into_iter()
            .map(|position| units[position].name.clone())
            .collect()
    }

    /// Units reachable from any of the flagged roots
    fn reachable_from(&self, roots: &[bool]) -> Vec<bool> {
        let mut reachable = roots.to_vec();
        let mut pending: Vec<usize> = (0..roots.len()).filter(|&p| roots[p]).collect();

        while let Some(node) = pending.pop() {
            for &callee in self.graph.callee_positions(node) {
                if !reachable[callee] {
                    reachable[callee] = true;
                    pending.push(callee);
                }
            }
        }

        reachable
    }

    /// Emit `root` and everything reachable from it, pre-order
    fn emit(&mut self, root: usize) {
        if self.visited[root] {
            return;
        }

        let graph = self.graph;
        // Frames are (unit, index of the next callee to look at)
        let mut stack: Vec<(usize, usize)> = Vec::new();
        self.enter(root);
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            let callees = graph.callee_positions(node);

            if cursor >= callees.len() {
                self.in_progress[node] = false;
                stack.pop();
                continue;
            }

            frame.1 += 1;
            let callee = callees[cursor];

            if self.in_progress[callee] {
                // Back-edge; a self-call lands here too
                trace!(
                    "Skipping back-edge {} -> {}",
                    graph.units()[node].name,
                    graph.units()[callee].name
                );
                continue;
            }
            if self.visited[callee] {
                continue;
            }

            self.enter(callee);
            stack.push((callee, 0));
        }
    }

    fn enter(&mut self, position: usize) {
        self.in_progress[position] = true;
        self.visited[position] = true;
        self.output.push(position);
    }
}

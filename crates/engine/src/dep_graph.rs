//! Dependency graph for formula cells.
//!
//! Tracks which positions each formula reads (references) and, in the
//! reverse direction, which formulas read a given position (dependents).
//! The reverse index is what makes cache invalidation cheap: when a cell
//! changes, follow `dependents` to find everything downstream.
//!
//! # Invariants
//!
//! 1. **Bidirectional consistency:** if A ∈ preds[B] then B ∈ succs[A],
//!    and vice versa.
//! 2. **No dangling entries:** empty sets are removed, not stored.
//! 3. **No duplicate edges:** set semantics enforced by `FxHashSet`.
//! 4. **Atomic updates:** `replace_edges` is the only mutator that
//!    touches both maps.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::position::Position;

#[derive(Clone, Debug, Default)]
pub struct DepGraph {
    /// For each formula cell B, the positions A its expression reads.
    /// B -> {A1, A2, ...}
    preds: FxHashMap<Position, FxHashSet<Position>>,

    /// For each referenced position A, the formula cells B that read it.
    /// A -> {B1, B2, ...}
    succs: FxHashMap<Position, FxHashSet<Position>>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positions this cell's formula reads (outgoing references).
    pub fn references(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.preds
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Formula cells that read this position (reverse edges).
    pub fn dependents(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.succs
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// True if this cell has reference edges tracked in the graph.
    pub fn is_formula_cell(&self, cell: Position) -> bool {
        self.preds.contains_key(&cell)
    }

    /// Number of formula cells with at least one reference.
    pub fn formula_cell_count(&self) -> usize {
        self.preds.len()
    }

    /// Number of positions referenced by at least one formula.
    pub fn referenced_cell_count(&self) -> usize {
        self.succs.len()
    }

    /// Replace all reference edges for a formula cell atomically.
    ///
    /// Removes the cell from all of its old references' dependent sets,
    /// then installs the new edge set on both sides. Pass an empty set to
    /// clear the cell's edges entirely.
    pub fn replace_edges(&mut self, cell: Position, new_refs: FxHashSet<Position>) {
        if let Some(old_refs) = self.preds.remove(&cell) {
            for referenced in old_refs {
                if let Some(deps) = self.succs.get_mut(&referenced) {
                    deps.remove(&cell);
                    if deps.is_empty() {
                        self.succs.remove(&referenced);
                    }
                }
            }
        }

        if new_refs.is_empty() {
            return;
        }

        for referenced in &new_refs {
            self.succs.entry(*referenced).or_default().insert(cell);
        }
        self.preds.insert(cell, new_refs);
    }

    /// Clear all outgoing edges for a cell (formula replaced or cell
    /// removed). Edges pointing *to* the cell are left in place.
    pub fn clear_cell(&mut self, cell: Position) {
        self.replace_edges(cell, FxHashSet::default());
    }

    /// Probe whether installing `candidate_refs` at `cell` would close a
    /// reference cycle, without mutating the graph.
    ///
    /// Follows the *current* reference edges outward from the candidate's
    /// references; the candidate's own edges are not installed yet, and
    /// the search stops as soon as it reaches `cell`, so any stale edges
    /// of the cell being replaced are never traversed. Neighbors are
    /// visited in sorted position order, which makes the reported chain
    /// deterministic.
    ///
    /// Returns the closing chain `cell -> ref -> ... -> cell` on a hit.
    pub fn probe_cycle(
        &self,
        cell: Position,
        candidate_refs: &[Position],
    ) -> Option<Vec<Position>> {
        if candidate_refs.contains(&cell) {
            return Some(vec![cell, cell]);
        }

        struct DfsFrame {
            pos: Position,
            neighbours: Vec<Position>,
            next_idx: usize,
        }

        let sorted_neighbours = |pos: Position| -> Vec<Position> {
            let mut neighbours: Vec<Position> = self
                .preds
                .get(&pos)
                .into_iter()
                .flat_map(|s| s.iter().copied())
                .collect();
            neighbours.sort_unstable();
            neighbours
        };

        let mut starts: Vec<Position> = candidate_refs.to_vec();
        starts.sort_unstable();

        let mut visited: FxHashSet<Position> = FxHashSet::default();
        for start in starts {
            if !visited.insert(start) {
                continue;
            }

            // Iterative DFS keeps deep reference chains off the call stack.
            let mut dfs_stack = vec![DfsFrame {
                pos: start,
                neighbours: sorted_neighbours(start),
                next_idx: 0,
            }];

            while let Some(frame) = dfs_stack.last_mut() {
                if frame.next_idx < frame.neighbours.len() {
                    let next = frame.neighbours[frame.next_idx];
                    frame.next_idx += 1;

                    if next == cell {
                        let mut path = Vec::with_capacity(dfs_stack.len() + 2);
                        path.push(cell);
                        path.extend(dfs_stack.iter().map(|f| f.pos));
                        path.push(cell);
                        return Some(path);
                    }
                    if visited.insert(next) {
                        dfs_stack.push(DfsFrame {
                            pos: next,
                            neighbours: sorted_neighbours(next),
                            next_idx: 0,
                        });
                    }
                } else {
                    dfs_stack.pop();
                }
            }
        }

        None
    }
}

//! Ordered recomputation and circular-reference detection.
//!
//! Editing a cell yields the list of cells whose values may change, ordered
//! so that re-evaluating them front to back never reads a stale dependency.
//! The traversal is a depth-first walk over dependents edges carrying two
//! marks per cell: *in progress* (currently on the traversal path) and
//! *done* (fully resolved and placed). Reaching an in-progress cell means
//! the walk found a back-edge — the edit would create a cycle — and the
//! traversal aborts before producing any order.

use rustc_hash::FxHashSet;

use crate::dep_graph::DependencyGraph;

/// Report when cycle detection finds a circular reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    /// Cells participating in the cycle, in path order.
    cells: Vec<String>,
    message: String,
}

impl CycleError {
    /// Cycle report for a cell that references itself.
    pub(crate) fn self_reference(cell: &str) -> Self {
        Self {
            cells: vec![cell.to_string()],
            message: format!("cell {cell} references itself"),
        }
    }

    /// Cycle report for a multi-cell cycle.
    pub(crate) fn cycle(cells: Vec<String>) -> Self {
        let message = format!("circular reference: {}", cells.join(" -> "));
        Self { cells, message }
    }

    /// The cells on the cycle path.
    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CycleError {}

/// Computes the recomputation order for an edit to `start`.
///
/// Returns `start` followed by every cell transitively dependent on it, in
/// an order where every cell comes before the cells that depend on it
/// (cells are appended only after all of their dependents resolve, and the
/// post-order is reversed). Neighbour sets are visited sorted, so the
/// result is deterministic.
pub(crate) fn recompute_order(
    graph: &DependencyGraph,
    start: &str,
) -> Result<Vec<String>, CycleError> {
    struct DfsFrame {
        cell: String,
        neighbours: Vec<String>,
        next_idx: usize,
    }

    let sorted_neighbours = |cell: &str| -> Vec<String> {
        let mut neighbours: Vec<String> =
            graph.dependents_iter(cell).map(str::to_string).collect();
        neighbours.sort_unstable();
        neighbours
    };

    let mut in_progress: FxHashSet<String> = FxHashSet::default();
    let mut done: FxHashSet<String> = FxHashSet::default();
    let mut post_order: Vec<String> = Vec::new();
    let mut stack: Vec<DfsFrame> = Vec::new();

    in_progress.insert(start.to_string());
    stack.push(DfsFrame {
        cell: start.to_string(),
        neighbours: sorted_neighbours(start),
        next_idx: 0,
    });

    while let Some(frame) = stack.last_mut() {
        if frame.next_idx < frame.neighbours.len() {
            let next = frame.neighbours[frame.next_idx].clone();
            frame.next_idx += 1;

            if in_progress.contains(&next) {
                // Back-edge: the frames from `next` to the top are the cycle.
                let pos = stack.iter().position(|f| f.cell == next).unwrap_or(0);
                let cells: Vec<String> = stack[pos..].iter().map(|f| f.cell.clone()).collect();
                return Err(if cells.len() == 1 {
                    CycleError::self_reference(&next)
                } else {
                    CycleError::cycle(cells)
                });
            }
            if done.contains(&next) {
                continue;
            }

            in_progress.insert(next.clone());
            let neighbours = sorted_neighbours(&next);
            stack.push(DfsFrame {
                cell: next,
                neighbours,
                next_idx: 0,
            });
        } else {
            // All dependents resolved; the cell takes its place after them
            // once the order is reversed.
            let Some(finished) = stack.pop() else { break };
            in_progress.remove(&finished.cell);
            done.insert(finished.cell.clone());
            post_order.push(finished.cell);
        }
    }

    post_order.reverse();
    Ok(post_order)
}

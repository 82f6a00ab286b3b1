//! Dependency graph for formula cells.
//!
//! A set of ordered pairs (dependee, dependent): the pair `(s, t)` means
//! "t's value depends on s; s must be evaluated before t".
//!
//! # Edge Direction
//!
//! ```text
//! A → B  means  "B depends on A"  (A is a dependee of B)
//! ```
//!
//! This makes "what breaks if I change X?" trivial: follow outgoing edges.
//!
//! # Invariants
//!
//! 1. **Bidirectional consistency:** (s, t) appears in `dependents[s]` iff it
//!    appears in `dependees[t]`.
//! 2. **No dangling entries:** Empty sets are removed, not stored.
//! 3. **No duplicate edges:** Set semantics enforced by FxHashSet.
//! 4. **Pair count:** `size()` equals the number of stored pairs.
//!
//! The graph knows nothing about formulas or cell contents; it is the
//! bookkeeping structure underneath recomputation ordering, not the cycle
//! detector itself.

use rustc_hash::{FxHashMap, FxHashSet};

/// Bidirectional multimap of (dependee, dependent) pairs.
#[derive(Default, Debug, Clone)]
pub struct DependencyGraph {
    /// dependents(s): for each dependee s, the cells t with (s, t) in the graph.
    dependents: FxHashMap<String, FxHashSet<String>>,

    /// dependees(t): for each dependent t, the cells s with (s, t) in the graph.
    dependees: FxHashMap<String, FxHashSet<String>>,

    /// Number of pairs currently stored.
    pairs: usize,
}

impl DependencyGraph {
    /// Create an empty dependency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of ordered pairs in the graph.
    pub fn size(&self) -> usize {
        self.pairs
    }

    /// Reports whether dependents(s) is non-empty.
    pub fn has_dependents(&self, s: &str) -> bool {
        self.dependents.contains_key(s)
    }

    /// Reports whether dependees(t) is non-empty.
    pub fn has_dependees(&self, t: &str) -> bool {
        self.dependees.contains_key(t)
    }

    /// Snapshot of dependents(s). The returned set is owned: mutating it
    /// never affects graph state. Absent keys yield an empty set.
    pub fn dependents(&self, s: &str) -> FxHashSet<String> {
        self.dependents.get(s).cloned().unwrap_or_default()
    }

    /// Snapshot of dependees(t). Same ownership contract as [`Self::dependents`].
    pub fn dependees(&self, t: &str) -> FxHashSet<String> {
        self.dependees.get(t).cloned().unwrap_or_default()
    }

    /// Borrowing view of dependents(s) for traversals.
    pub(crate) fn dependents_iter(&self, s: &str) -> impl Iterator<Item = &str> + '_ {
        self.dependents
            .get(s)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Adds the pair (s, t). Adding a pair that is already present is a no-op.
    pub fn add_dependency(&mut self, s: &str, t: &str) {
        let inserted = self
            .dependents
            .entry(s.to_string())
            .or_default()
            .insert(t.to_string());
        if !inserted {
            return;
        }
        self.dependees
            .entry(t.to_string())
            .or_default()
            .insert(s.to_string());
        self.pairs += 1;
    }

    /// Removes the pair (s, t). Removing an absent pair is a no-op.
    pub fn remove_dependency(&mut self, s: &str, t: &str) {
        let removed = self
            .dependents
            .get_mut(s)
            .map_or(false, |set| set.remove(t));
        if !removed {
            return;
        }
        if self.dependents.get(s).map_or(false, |set| set.is_empty()) {
            self.dependents.remove(s);
        }
        if let Some(set) = self.dependees.get_mut(t) {
            set.remove(s);
            if set.is_empty() {
                self.dependees.remove(t);
            }
        }
        self.pairs -= 1;
    }

    /// Removes every pair (s, *), then installs (s, t) for each t in
    /// `new_dependents`.
    pub fn replace_dependents<I, S>(&mut self, s: &str, new_dependents: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for t in self.dependents(s) {
            self.remove_dependency(s, &t);
        }
        for t in new_dependents {
            self.add_dependency(s, t.as_ref());
        }
    }

    /// Removes every pair (*, t), then installs (s, t) for each s in
    /// `new_dependees`.
    ///
    /// This is the mutation the spreadsheet uses when a cell's formula (and
    /// so its dependee set) changes.
    pub fn replace_dependees<I, S>(&mut self, t: &str, new_dependees: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for s in self.dependees(t) {
            self.remove_dependency(&s, t);
        }
        for s in new_dependees {
            self.add_dependency(s.as_ref(), t);
        }
    }

    /// Check all invariants. Panics if any are violated.
    ///
    /// Only available in test builds.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        // Invariant 1: Bidirectional consistency (dependents → dependees)
        for (s, dependents) in &self.dependents {
            for t in dependents {
                assert!(
                    self.dependees.get(t).map_or(false, |set| set.contains(s)),
                    "missing dependee edge: {t:?} should list {s:?}"
                );
            }
        }

        // Invariant 1: Bidirectional consistency (dependees → dependents)
        for (t, dependees) in &self.dependees {
            for s in dependees {
                assert!(
                    self.dependents.get(s).map_or(false, |set| set.contains(t)),
                    "missing dependent edge: {s:?} should list {t:?}"
                );
            }
        }

        // Invariant 2: No empty sets stored
        for (s, set) in &self.dependents {
            assert!(!set.is_empty(), "empty dependents set stored for {s:?}");
        }
        for (t, set) in &self.dependees {
            assert!(!set.is_empty(), "empty dependees set stored for {t:?}");
        }

        // Invariant 4: size matches both indexes
        let forward: usize = self.dependents.values().map(FxHashSet::len).sum();
        let reverse: usize = self.dependees.values().map(FxHashSet::len).sum();
        assert_eq!(forward, self.pairs, "size disagrees with dependents index");
        assert_eq!(reverse, self.pairs, "size disagrees with dependees index");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(cells: &[&str]) -> FxHashSet<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::new();

        assert_eq!(graph.size(), 0);
        assert!(!graph.has_dependents("A1"));
        assert!(!graph.has_dependees("A1"));
        assert!(graph.dependents("A1").is_empty());
        assert!(graph.dependees("A1").is_empty());

        graph.assert_consistent();
    }

    #[test]
    fn test_single_pair() {
        // B1 = A1
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A1", "B1");
        graph.assert_consistent();

        assert_eq!(graph.size(), 1);
        assert_eq!(graph.dependents("A1"), set(&["B1"]));
        assert_eq!(graph.dependees("B1"), set(&["A1"]));
        assert!(graph.has_dependents("A1"));
        assert!(graph.has_dependees("B1"));
        assert!(!graph.has_dependents("B1"));
        assert!(!graph.has_dependees("A1"));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A1", "B1");
        graph.add_dependency("A1", "B1");
        graph.assert_consistent();

        assert_eq!(graph.size(), 1);
        assert_eq!(graph.dependents("A1"), set(&["B1"]));
    }

    #[test]
    fn test_remove_pair() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A1", "B1");
        graph.remove_dependency("A1", "B1");
        graph.assert_consistent();

        assert_eq!(graph.size(), 0);
        assert!(!graph.has_dependents("A1"));
        assert!(!graph.has_dependees("B1"));
    }

    #[test]
    fn test_remove_absent_pair_is_noop() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A1", "B1");
        graph.remove_dependency("A1", "C1");
        graph.remove_dependency("X1", "B1");
        graph.assert_consistent();

        assert_eq!(graph.size(), 1);
        assert_eq!(graph.dependents("A1"), set(&["B1"]));
    }

    #[test]
    fn test_multiple_dependents() {
        // B1 = A1, C1 = A1
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A1", "B1");
        graph.add_dependency("A1", "C1");
        graph.assert_consistent();

        assert_eq!(graph.size(), 2);
        assert_eq!(graph.dependents("A1"), set(&["B1", "C1"]));
        assert_eq!(graph.dependees("B1"), set(&["A1"]));
        assert_eq!(graph.dependees("C1"), set(&["A1"]));
    }

    #[test]
    fn test_multiple_dependees() {
        // C1 = A1 + B1
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A1", "C1");
        graph.add_dependency("B1", "C1");
        graph.assert_consistent();

        assert_eq!(graph.size(), 2);
        assert_eq!(graph.dependees("C1"), set(&["A1", "B1"]));
        assert_eq!(graph.dependents("A1"), set(&["C1"]));
        assert_eq!(graph.dependents("B1"), set(&["C1"]));
    }

    #[test]
    fn test_self_pair_allowed() {
        // The graph itself is pure bookkeeping; rejecting self-cycles is the
        // recomputation layer's job.
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A1", "A1");
        graph.assert_consistent();

        assert_eq!(graph.size(), 1);
        assert_eq!(graph.dependents("A1"), set(&["A1"]));
        assert_eq!(graph.dependees("A1"), set(&["A1"]));
    }

    #[test]
    fn test_replace_dependees_rewires() {
        // C1 = A1 + B1, then C1 = X1
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A1", "C1");
        graph.add_dependency("B1", "C1");

        graph.replace_dependees("C1", ["X1"]);
        graph.assert_consistent();

        assert_eq!(graph.size(), 1);
        assert_eq!(graph.dependees("C1"), set(&["X1"]));
        assert!(graph.dependents("A1").is_empty());
        assert!(graph.dependents("B1").is_empty());
        assert_eq!(graph.dependents("X1"), set(&["C1"]));
    }

    #[test]
    fn test_replace_dependees_with_empty_clears() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A1", "B1");

        graph.replace_dependees("B1", std::iter::empty::<&str>());
        graph.assert_consistent();

        assert_eq!(graph.size(), 0);
        assert!(!graph.has_dependees("B1"));
        assert!(!graph.has_dependents("A1"));
    }

    #[test]
    fn test_replace_dependees_matches_remove_then_add() {
        let mut replaced = DependencyGraph::new();
        replaced.add_dependency("A1", "C1");
        replaced.add_dependency("B1", "C1");
        replaced.replace_dependees("C1", ["B1", "D1"]);

        let mut manual = DependencyGraph::new();
        manual.add_dependency("A1", "C1");
        manual.add_dependency("B1", "C1");
        manual.remove_dependency("A1", "C1");
        manual.remove_dependency("B1", "C1");
        manual.add_dependency("B1", "C1");
        manual.add_dependency("D1", "C1");

        replaced.assert_consistent();
        manual.assert_consistent();
        assert_eq!(replaced.size(), manual.size());
        assert_eq!(replaced.dependees("C1"), manual.dependees("C1"));
        assert_eq!(replaced.dependents("B1"), manual.dependents("B1"));
        assert_eq!(replaced.dependents("D1"), manual.dependents("D1"));
    }

    #[test]
    fn test_replace_dependents_rewires() {
        // A1 feeds B1 and C1, then only D1
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A1", "B1");
        graph.add_dependency("A1", "C1");

        graph.replace_dependents("A1", ["D1"]);
        graph.assert_consistent();

        assert_eq!(graph.size(), 1);
        assert_eq!(graph.dependents("A1"), set(&["D1"]));
        assert!(!graph.has_dependees("B1"));
        assert!(!graph.has_dependees("C1"));
        assert_eq!(graph.dependees("D1"), set(&["A1"]));
    }

    #[test]
    fn test_snapshots_are_defensive() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A1", "B1");

        let mut snapshot = graph.dependents("A1");
        snapshot.insert("Z9".to_string());
        snapshot.remove("B1");

        // Graph state is untouched by mutations of the snapshot.
        assert_eq!(graph.dependents("A1"), set(&["B1"]));
        graph.assert_consistent();
    }

    #[test]
    fn test_pruning_keeps_keys_sparse() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A1", "B1");
        graph.add_dependency("A1", "C1");
        graph.remove_dependency("A1", "B1");
        graph.assert_consistent();

        // B1 lost its only dependee and must not linger as an empty key.
        assert!(!graph.has_dependees("B1"));
        graph.remove_dependency("A1", "C1");
        graph.assert_consistent();
        assert!(!graph.has_dependents("A1"));
        assert_eq!(graph.size(), 0);
    }

    #[test]
    fn test_size_counts_pairs_across_keys() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A1", "B1");
        graph.add_dependency("A1", "C1");
        graph.add_dependency("B1", "C1");
        graph.add_dependency("D1", "D1");
        graph.assert_consistent();

        assert_eq!(graph.size(), 4);
    }
}

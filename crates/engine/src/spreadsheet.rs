//! The spreadsheet: named cell storage, dependency tracking, and ordered
//! recomputation.
//!
//! Raw content is classified on entry: anything that parses as a double is
//! a number, anything starting with `=` is a formula, everything else is
//! text (and empty text deletes the cell). The dependency graph always
//! mirrors the variable references of the stored formulas, and no edit that
//! would create a cycle is ever committed — a rejected edit leaves every
//! piece of state exactly as it was.
//!
//! Values are computed lazily on read: a formula cell evaluates by looking
//! its references up recursively, which terminates because cycles were
//! rejected at edit time.

use rustc_hash::FxHashMap;

use crate::cell::{CellContent, Value};
use crate::cell_name::is_valid_name;
use crate::dep_graph::DependencyGraph;
use crate::error::EngineError;
use crate::formula::{Formula, FormulaError};
use crate::recalc::recompute_order;

/// A collection of named cells plus the dependency graph between them.
///
/// Cell names are passed through a caller-supplied normalizer and validator
/// (identity and always-true by default); formula variables go through the
/// same pair, so a reference inside a formula and the cell it names always
/// agree on spelling.
pub struct Spreadsheet {
    cells: FxHashMap<String, CellContent>,
    deps: DependencyGraph,
    normalize: Box<dyn Fn(&str) -> String>,
    is_valid: Box<dyn Fn(&str) -> bool>,
    version: String,
    changed: bool,
}

impl std::fmt::Debug for Spreadsheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spreadsheet")
            .field("cells", &self.cells)
            .field("deps", &self.deps)
            .field("version", &self.version)
            .field("changed", &self.changed)
            .finish_non_exhaustive()
    }
}

impl Default for Spreadsheet {
    fn default() -> Self {
        Self::new()
    }
}

impl Spreadsheet {
    /// An empty spreadsheet with the identity normalizer and no extra name
    /// restrictions.
    pub fn new() -> Self {
        Self::with_rules(|name| name.to_string(), |_| true)
    }

    /// An empty spreadsheet with caller-supplied name rules. Every cell name
    /// and formula variable is rewritten by `normalize` first; `is_valid`
    /// may then reject normalized names beyond the built-in lexical rule.
    pub fn with_rules(
        normalize: impl Fn(&str) -> String + 'static,
        is_valid: impl Fn(&str) -> bool + 'static,
    ) -> Self {
        Self {
            cells: FxHashMap::default(),
            deps: DependencyGraph::new(),
            normalize: Box::new(normalize),
            is_valid: Box::new(is_valid),
            version: String::from("default"),
            changed: false,
        }
    }

    /// Replaces the contents of `name` and returns the recomputation order:
    /// `name` followed by every cell transitively dependent on it, ordered
    /// so re-evaluating front to back never reads a stale dependency.
    ///
    /// Content that parses as a double stores a number; content starting
    /// with `=` stores the remainder as a formula; anything else stores
    /// text, and empty text deletes the cell. A formula edit that would
    /// create a circular reference fails with [`EngineError::Circular`] and
    /// changes nothing.
    pub fn set_contents_of_cell(
        &mut self,
        name: &str,
        raw: &str,
    ) -> Result<Vec<String>, EngineError> {
        let name = self.checked_name(name)?;

        if let Ok(number) = raw.parse::<f64>() {
            return self.set_literal(name, CellContent::Number(number));
        }
        if let Some(expr) = raw.strip_prefix('=') {
            return self.set_formula(name, expr);
        }
        if raw.is_empty() {
            self.cells.remove(&name);
            self.deps.replace_dependees(&name, std::iter::empty::<&str>());
            self.changed = true;
            return recompute_order(&self.deps, &name).map_err(EngineError::from);
        }
        self.set_literal(name, CellContent::Text(raw.to_string()))
    }

    /// The stored contents of `name`: a number, text, or formula. Cells
    /// never set — or set to empty text — read back as empty text.
    pub fn get_cell_contents(&self, name: &str) -> Result<CellContent, EngineError> {
        let name = self.checked_name(name)?;
        Ok(self
            .cells
            .get(&name)
            .cloned()
            .unwrap_or_else(|| CellContent::Text(String::new())))
    }

    /// The evaluated value of `name`. Literal cells read back directly;
    /// formula cells evaluate on demand, presenting evaluation failures as
    /// [`Value::Error`] while keeping the formula as contents.
    pub fn get_cell_value(&self, name: &str) -> Result<Value, EngineError> {
        let name = self.checked_name(name)?;
        Ok(self.value_of(&name))
    }

    /// Names of every non-empty cell, in no particular order.
    pub fn names_of_nonempty_cells(&self) -> impl Iterator<Item = &str> + '_ {
        self.cells.keys().map(String::as_str)
    }

    /// Cells whose formulas reference `name` directly, sorted.
    pub fn direct_dependents(&self, name: &str) -> Result<Vec<String>, EngineError> {
        let name = self.checked_name(name)?;
        let mut dependents: Vec<String> = self.deps.dependents(&name).into_iter().collect();
        dependents.sort_unstable();
        Ok(dependents)
    }

    /// Read access to the dependency graph.
    pub fn dep_graph(&self) -> &DependencyGraph {
        &self.deps
    }

    /// `(name, raw content)` pairs sufficient to rebuild this spreadsheet by
    /// replaying [`Self::set_contents_of_cell`]; formulas carry their `=`.
    pub fn raw_contents(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.cells
            .iter()
            .map(|(name, content)| (name.as_str(), content.raw()))
    }

    /// True when contents changed since construction or the last
    /// [`Self::mark_saved`].
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Records that the current state has been saved.
    pub fn mark_saved(&mut self) {
        self.changed = false;
    }

    /// The version string recorded with this spreadsheet.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    /// Normalizes `name` and checks it against the lexical rule and the
    /// caller's validator.
    fn checked_name(&self, name: &str) -> Result<String, EngineError> {
        let normalized = (self.normalize)(name);
        if is_valid_name(&normalized) && (self.is_valid)(&normalized) {
            Ok(normalized)
        } else {
            Err(EngineError::InvalidName(name.to_string()))
        }
    }

    /// Stores a number or text literal. Literals reference nothing, so the
    /// cell's dependee set empties out; its dependents are unaffected.
    fn set_literal(
        &mut self,
        name: String,
        content: CellContent,
    ) -> Result<Vec<String>, EngineError> {
        self.deps.replace_dependees(&name, std::iter::empty::<&str>());
        let order = recompute_order(&self.deps, &name)?;
        self.cells.insert(name, content);
        self.changed = true;
        Ok(order)
    }

    /// Stores a formula cell: rewires the dependee set to the formula's
    /// variables, then orders recomputation. On a cycle the captured
    /// dependee set is restored and nothing else has been touched — the
    /// traversal itself never mutates the graph.
    fn set_formula(&mut self, name: String, expr: &str) -> Result<Vec<String>, EngineError> {
        let formula = {
            let normalize = &self.normalize;
            let user_valid = &self.is_valid;
            Formula::with_rules(
                expr,
                |v| normalize(v),
                |v| is_valid_name(v) && user_valid(v),
            )?
        };

        let previous = self.deps.dependees(&name);
        self.deps.replace_dependees(&name, formula.variables());

        match recompute_order(&self.deps, &name) {
            Ok(order) => {
                self.cells.insert(name, CellContent::Formula(formula));
                self.changed = true;
                Ok(order)
            }
            Err(cycle) => {
                self.deps.replace_dependees(&name, previous);
                Err(cycle.into())
            }
        }
    }

    fn value_of(&self, name: &str) -> Value {
        match self.cells.get(name) {
            None => Value::Empty,
            Some(CellContent::Number(n)) => Value::Number(*n),
            Some(CellContent::Text(text)) => Value::Text(text.clone()),
            Some(CellContent::Formula(formula)) => {
                match formula.evaluate(|var| self.lookup_number(var)) {
                    Ok(n) => Value::Number(n),
                    Err(e) => Value::Error(e),
                }
            }
        }
    }

    /// Lookup used during formula evaluation: referenced cells must come out
    /// numeric; anything else becomes the evaluating formula's error value.
    fn lookup_number(&self, name: &str) -> Result<f64, FormulaError> {
        match self.value_of(name) {
            Value::Number(n) => Ok(n),
            Value::Error(e) => Err(e),
            Value::Empty => Err(FormulaError::new(format!("cell {name} has no value"))),
            Value::Text(_) => Err(FormulaError::new(format!(
                "cell {name} does not contain a number"
            ))),
        }
    }
}

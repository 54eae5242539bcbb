//! Recalculation passes
//!
//! A pass walks a [`RecalcPlan`] in order. Cells on a cycle get `#CIRCULAR`;
//! every other formula cell is evaluated against the store and its result is
//! written back at once, so later cells in the same pass read fresh values.
//! A fault in one cell becomes `#ERROR` for that cell and the pass goes on.

use crate::store::CellStore;
use ahash::AHashMap;
use cellflow_core::{CellError, CellValue, SheetRegistry};
use cellflow_formula::{
    evaluate, CellKey, EvalLimits, EvaluationContext, FormulaError, FunctionRegistry, RecalcPlan,
};
use tracing::{debug, debug_span, trace, warn};

/// Statistics from one recalculation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassStats {
    /// Number of cells the pass started from
    pub seeds: usize,
    /// Every cell visited, in evaluation order
    pub touched: Vec<CellKey>,
    /// Number of formulas evaluated
    pub evaluated: usize,
    /// Number of cells set to `#CIRCULAR`
    pub circular: usize,
    /// Number of evaluations that faulted and were stored as `#ERROR`
    pub faults: usize,
    /// Number of cells whose value changed
    pub changed: usize,
}

/// Cells whose value changed in one pass, with their new values, sorted by key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    entries: Vec<(CellKey, CellValue)>,
}

impl ChangeSet {
    /// Changed cells in key order
    pub fn cells(&self) -> Vec<CellKey> {
        self.entries.iter().map(|(key, _)| *key).collect()
    }

    /// New value of a changed cell
    pub fn value(&self, key: CellKey) -> Option<&CellValue> {
        self.entries
            .binary_search_by_key(&key, |(k, _)| *k)
            .ok()
            .map(|i| &self.entries[i].1)
    }

    pub fn contains(&self, key: CellKey) -> bool {
        self.value(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellKey, &CellValue)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a pass reads besides the cell store
#[derive(Clone, Copy)]
pub(crate) struct Scheduler<'a> {
    pub functions: &'a FunctionRegistry,
    pub sheets: &'a SheetRegistry,
    pub limits: EvalLimits,
}

impl Scheduler<'_> {
    /// Evaluate a cell's formula against the store as it is now.
    ///
    /// Returns `None` for cells without a parsed formula.
    pub fn compute(&self, store: &CellStore, key: CellKey) -> Option<Result<CellValue, FormulaError>> {
        let formula = store.get(key)?.formula()?;
        let ctx = EvaluationContext::new(self.functions, self.sheets, store, key)
            .with_limits(self.limits);
        Some(evaluate(formula, &ctx))
    }

    /// Run one pass over `plan`.
    ///
    /// `before` holds the values edited cells had before the edit; cells not
    /// in it are compared against their value at the moment the pass reaches
    /// them.
    pub fn run(
        &self,
        store: &mut CellStore,
        plan: &RecalcPlan,
        seeds: usize,
        mut before: AHashMap<CellKey, CellValue>,
    ) -> (ChangeSet, PassStats) {
        let span = debug_span!("recalc", seeds, affected = plan.order.len());
        let _enter = span.enter();

        let mut stats = PassStats {
            seeds,
            ..PassStats::default()
        };
        let mut entries = Vec::new();

        for &key in &plan.order {
            let old = before.remove(&key).unwrap_or_else(|| store.value(key));

            let fresh = if plan.is_circular(&key) {
                stats.circular += 1;
                Some(CellValue::Error(CellError::Circular))
            } else {
                self.compute(store, key).map(|result| {
                    stats.evaluated += 1;
                    result.unwrap_or_else(|e| {
                        stats.faults += 1;
                        warn!(cell = %key, error = %e, "formula evaluation failed");
                        CellValue::Error(e.cell_error())
                    })
                })
            };

            if let Some(value) = fresh {
                trace!(cell = %key, value = ?value, "evaluated");
                store.set_value(key, value);
            }

            let new = store.value(key);
            if new != old {
                entries.push((key, new));
            }
            stats.touched.push(key);
        }

        entries.sort_unstable_by_key(|(key, _)| *key);
        stats.changed = entries.len();

        debug!(
            evaluated = stats.evaluated,
            circular = stats.circular,
            faults = stats.faults,
            changed = stats.changed,
            "recalculation pass complete"
        );

        (ChangeSet { entries }, stats)
    }
}

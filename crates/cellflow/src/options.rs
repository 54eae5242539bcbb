//! Engine configuration

use cellflow_core::DEFAULT_SHEET_NAME;
use cellflow_formula::evaluator::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_RANGE_CELLS};
use cellflow_formula::EvalLimits;

/// Options for an [`Engine`](crate::Engine)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum expression depth during evaluation; deeper formulas read `#ERROR`
    pub max_depth: usize,
    /// Maximum number of cells a single range may read (default: 1,000,000)
    pub max_range_cells: u64,
    /// Contain panicking function implementations as `#ERROR`
    pub catch_panics: bool,
    /// Name of the sheet created with the engine. Unqualified addresses
    /// passed to the engine API refer to it.
    pub default_sheet: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
            catch_panics: true,
            default_sheet: DEFAULT_SHEET_NAME.to_string(),
        }
    }
}

impl EngineOptions {
    /// Evaluation bounds for a single formula
    pub fn limits(&self) -> EvalLimits {
        EvalLimits {
            max_depth: self.max_depth,
            max_range_cells: self.max_range_cells,
            catch_panics: self.catch_panics,
        }
    }
}

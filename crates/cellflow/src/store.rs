//! Cell storage
//!
//! Cells live in a hash map keyed by [`CellKey`]. A cell is created on the
//! first write to its address and is never removed; clearing it stores empty
//! input. Formula ASTs are owned by their cell and replaced wholesale on edit.

use ahash::AHashMap;
use cellflow_core::{CellInput, CellValue};
use cellflow_formula::{CellKey, FormulaExpr, ParseError, ValueSource};

/// A single cell: what was entered and what it currently evaluates to
#[derive(Debug, Clone)]
pub struct Cell {
    input: CellInput,
    formula: Option<FormulaExpr>,
    parse_error: Option<ParseError>,
    /// Sheet names the formula mentions that did not exist when it was
    /// resolved
    unresolved_sheets: Vec<String>,
    value: CellValue,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            input: CellInput::Empty,
            formula: None,
            parse_error: None,
            unresolved_sheets: Vec::new(),
            value: CellValue::Empty,
        }
    }
}

impl Cell {
    /// Raw input as last entered
    pub fn input(&self) -> &CellInput {
        &self.input
    }

    /// Parsed formula, if the input is a formula that parsed
    pub fn formula(&self) -> Option<&FormulaExpr> {
        self.formula.as_ref()
    }

    /// Why the formula input did not parse
    pub fn parse_error(&self) -> Option<&ParseError> {
        self.parse_error.as_ref()
    }

    /// Cached value
    pub fn value(&self) -> &CellValue {
        &self.value
    }

    pub fn is_formula(&self) -> bool {
        self.input.is_formula()
    }

    pub(crate) fn references_sheet(&self, name: &str) -> bool {
        self.unresolved_sheets
            .iter()
            .any(|s| s.eq_ignore_ascii_case(name))
    }
}

/// Map of every cell ever written
#[derive(Debug, Default)]
pub struct CellStore {
    cells: AHashMap<CellKey, Cell>,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: CellKey) -> Option<&Cell> {
        self.cells.get(&key)
    }

    /// Cached value of a cell; cells never written are empty
    pub fn value(&self, key: CellKey) -> CellValue {
        self.cells
            .get(&key)
            .map(|cell| cell.value.clone())
            .unwrap_or_default()
    }

    /// Store a constant (literal or empty) input; its value is the input
    pub fn set_constant(&mut self, key: CellKey, input: CellInput) {
        let value = match &input {
            CellInput::Literal(v) => v.clone(),
            _ => CellValue::Empty,
        };
        *self.cells.entry(key).or_default() = Cell {
            input,
            value,
            ..Cell::default()
        };
    }

    /// Store a parsed formula. The cached value is left for the next pass to
    /// compute.
    pub fn set_formula(
        &mut self,
        key: CellKey,
        text: String,
        formula: FormulaExpr,
        unresolved_sheets: Vec<String>,
    ) {
        let cell = self.cells.entry(key).or_default();
        cell.input = CellInput::Formula(text);
        cell.formula = Some(formula);
        cell.parse_error = None;
        cell.unresolved_sheets = unresolved_sheets;
    }

    /// Store formula text that failed to parse; the cell holds the parse
    /// error's value until its text is edited again
    pub fn set_invalid_formula(&mut self, key: CellKey, text: String, error: ParseError) {
        let value = CellValue::Error(error.cell_error());
        *self.cells.entry(key).or_default() = Cell {
            input: CellInput::Formula(text),
            parse_error: Some(error),
            value,
            ..Cell::default()
        };
    }

    /// Replace the unresolved sheet list after re-resolving a formula
    pub fn set_unresolved_sheets(&mut self, key: CellKey, sheets: Vec<String>) {
        if let Some(cell) = self.cells.get_mut(&key) {
            cell.unresolved_sheets = sheets;
        }
    }

    /// Overwrite the cached value
    pub fn set_value(&mut self, key: CellKey, value: CellValue) {
        self.cells.entry(key).or_default().value = value;
    }

    /// Iterate over all stored cells, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (CellKey, &Cell)> {
        self.cells.iter().map(|(k, c)| (*k, c))
    }

    /// Keys of every cell holding a parsed formula, sorted
    pub fn formula_cells(&self) -> Vec<CellKey> {
        let mut keys: Vec<CellKey> = self
            .cells
            .iter()
            .filter(|(_, cell)| cell.formula.is_some())
            .map(|(key, _)| *key)
            .collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl ValueSource for CellStore {
    fn cell_value(&self, key: CellKey) -> CellValue {
        self.value(key)
    }
}

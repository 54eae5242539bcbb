//! The engine facade
//!
//! [`Engine`] owns the sheets, the function registry, the cell store and the
//! dependency graph. Every input goes through it: an edit replaces the cell's
//! content and edges, then one recalculation pass brings every dependent up
//! to date before change listeners hear about it.

use crate::options::EngineOptions;
use crate::scheduler::{ChangeSet, PassStats, Scheduler};
use crate::snapshot::ValueSnapshot;
use crate::store::{Cell, CellStore};
use ahash::AHashMap;
use cellflow_core::{
    CellAddress, CellError, CellInput, CellValue, Error, Result, SheetId, SheetRegistry, MAX_COLS,
    MAX_ROWS,
};
use cellflow_formula::{
    parse_formula, CellKey, DependencyGraph, FunctionDef, FunctionRegistry, Precedent,
    ReferenceResolver,
};
use std::fmt;
use tracing::debug;

/// Sheet that unqualified addresses refer to
const DEFAULT_SHEET: SheetId = 0;

type Listener = Box<dyn FnMut(&ChangeSet)>;

/// One pending input
#[derive(Debug, Clone)]
enum Edit {
    /// Text as typed by a user or an import collaborator
    Content(String),
    /// A value computed outside the engine
    Value(CellValue),
}

/// Spreadsheet computation engine
///
/// # Example
///
/// ```rust
/// use cellflow::prelude::*;
///
/// let mut engine = Engine::new();
/// engine.set("A1", "2").unwrap();
/// engine.set("A2", "3").unwrap();
/// engine.set("A3", "=A1+A2").unwrap();
///
/// assert_eq!(engine.value("A3").unwrap(), CellValue::Number(5.0));
/// ```
pub struct Engine {
    options: EngineOptions,
    sheets: SheetRegistry,
    functions: FunctionRegistry,
    store: CellStore,
    graph: DependencyGraph,
    listeners: Vec<Listener>,
    last_pass: PassStats,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("sheets", &self.sheets)
            .field("cells", &self.store.len())
            .field("formulas", &self.graph.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Engine {
    /// Create an engine with default options and the built-in functions
    pub fn new() -> Self {
        Self::build(EngineOptions::default(), SheetRegistry::with_default_sheet())
    }

    /// Create an engine with custom options
    pub fn with_options(options: EngineOptions) -> Result<Self> {
        let sheets = SheetRegistry::with_sheet(&options.default_sheet)?;
        Ok(Self::build(options, sheets))
    }

    fn build(options: EngineOptions, sheets: SheetRegistry) -> Self {
        Self {
            options,
            sheets,
            functions: FunctionRegistry::new(),
            store: CellStore::new(),
            graph: DependencyGraph::new(),
            listeners: Vec::new(),
            last_pass: PassStats::default(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn sheets(&self) -> &SheetRegistry {
        &self.sheets
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    // === Sheets and addresses ===

    /// Add a sheet.
    ///
    /// Formulas that already name the new sheet stop reading `#REF` and are
    /// recalculated.
    pub fn add_sheet(&mut self, name: &str) -> Result<SheetId> {
        let id = self.sheets.add(name)?;

        let mut waiting: Vec<CellKey> = self
            .store
            .iter()
            .filter(|(_, cell)| cell.references_sheet(name))
            .map(|(key, _)| key)
            .collect();
        waiting.sort_unstable();

        for &key in &waiting {
            let Some(formula) = self.store.get(key).and_then(Cell::formula) else {
                continue;
            };
            let resolution = ReferenceResolver::new(&self.sheets, key).precedents(formula);
            self.graph.set_edges(key, resolution.precedents);
            self.store
                .set_unresolved_sheets(key, resolution.unresolved_sheets);
        }

        debug!(sheet = name, id, waiting = waiting.len(), "sheet added");
        if !waiting.is_empty() {
            self.run_pass(&waiting, AHashMap::new());
        }
        Ok(id)
    }

    /// Resolve `A1`, `Data!B2` or `'My Sheet'!C3`; unqualified addresses
    /// refer to the default sheet
    pub fn cell_key(&self, address: &str) -> Result<CellKey> {
        parse_address(&self.sheets, address)
    }

    /// Format a key as `Sheet!A1`
    pub fn display_address(&self, key: CellKey) -> String {
        let sheet = self.sheets.name(key.sheet).unwrap_or("?");
        let plain = !sheet.is_empty() && sheet.chars().all(|c| c.is_alphanumeric() || c == '_');
        if plain {
            format!("{}!{}", sheet, key.address())
        } else {
            format!("'{}'!{}", sheet.replace('\'', "''"), key.address())
        }
    }

    // === Inputs ===

    /// Set a cell's content and recalculate.
    ///
    /// Text starting with `=` is a formula; anything else is a literal.
    /// Returns the cells whose value changed.
    pub fn set_cell_content(&mut self, key: CellKey, text: &str) -> Result<ChangeSet> {
        check_key(&self.sheets, key)?;
        Ok(self.apply(vec![(key, Edit::Content(text.to_string()))]))
    }

    /// [`set_cell_content`](Self::set_cell_content) by address
    pub fn set(&mut self, address: &str, text: &str) -> Result<ChangeSet> {
        let key = self.cell_key(address)?;
        self.set_cell_content(key, text)
    }

    /// Store a value computed outside the engine as a constant input
    pub fn set_external_value(&mut self, key: CellKey, value: CellValue) -> Result<ChangeSet> {
        check_key(&self.sheets, key)?;
        Ok(self.apply(vec![(key, Edit::Value(value))]))
    }

    /// Apply several inputs with a single recalculation pass.
    ///
    /// If the closure fails, none of its inputs are applied.
    pub fn batch<F>(&mut self, f: F) -> Result<ChangeSet>
    where
        F: FnOnce(&mut Batch<'_>) -> Result<()>,
    {
        let mut batch = Batch {
            sheets: &self.sheets,
            edits: Vec::new(),
        };
        f(&mut batch)?;
        let edits = batch.edits;
        Ok(self.apply(edits))
    }

    /// Register a function, replacing any definition with the same name.
    ///
    /// Every formula calling the name is recalculated, so `#NAME` cells pick
    /// up a late registration and replaced definitions take effect.
    pub fn register_function(&mut self, def: FunctionDef) -> ChangeSet {
        let name = def.name.clone();
        if self.functions.register(def).is_some() {
            debug!(function = %name, "function definition replaced");
        }

        let mut callers: Vec<CellKey> = self
            .store
            .iter()
            .filter(|(_, cell)| cell.formula().is_some_and(|f| f.calls_function(&name)))
            .map(|(key, _)| key)
            .collect();
        if callers.is_empty() {
            return ChangeSet::default();
        }
        callers.sort_unstable();
        self.run_pass(&callers, AHashMap::new())
    }

    // === Outputs ===

    /// Committed value of a cell
    pub fn get_cell_value(&self, key: CellKey) -> CellValue {
        self.store.value(key)
    }

    /// [`get_cell_value`](Self::get_cell_value) by address
    pub fn value(&self, address: &str) -> Result<CellValue> {
        Ok(self.get_cell_value(self.cell_key(address)?))
    }

    /// Stored cell, if the address was ever written
    pub fn cell(&self, key: CellKey) -> Option<&Cell> {
        self.store.get(key)
    }

    /// What a formula cell reads
    pub fn precedents(&self, key: CellKey) -> &[Precedent] {
        self.graph.get_precedents(key)
    }

    /// Formulas that read a cell directly or through a range
    pub fn dependents(&self, key: CellKey) -> Vec<CellKey> {
        self.graph.get_dependents(key)
    }

    /// Call `listener` after every pass that changed at least one value
    pub fn on_cells_changed<F>(&mut self, listener: F)
    where
        F: FnMut(&ChangeSet) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Owned copy of all committed values
    pub fn snapshot(&self) -> ValueSnapshot {
        ValueSnapshot::from_values(self.store.iter().map(|(key, cell)| (key, cell.value().clone())))
    }

    /// Statistics of the most recent pass
    pub fn last_pass(&self) -> &PassStats {
        &self.last_pass
    }

    // === Recalculation ===

    /// Re-evaluate the given cells and everything that depends on them
    pub fn recalculate(&mut self, cells: &[CellKey]) -> ChangeSet {
        let mut seeds = cells.to_vec();
        seeds.sort_unstable();
        seeds.dedup();
        self.run_pass(&seeds, AHashMap::new())
    }

    /// Re-evaluate every formula
    pub fn recalculate_all(&mut self) -> ChangeSet {
        let seeds = self.store.formula_cells();
        self.run_pass(&seeds, AHashMap::new())
    }

    /// Formula cells whose cached value differs from a fresh evaluation
    /// against committed values. Empty whenever the engine is idle.
    pub fn audit(&self) -> Vec<CellKey> {
        let scheduler = Scheduler {
            functions: &self.functions,
            sheets: &self.sheets,
            limits: self.options.limits(),
        };
        self.store
            .formula_cells()
            .into_iter()
            .filter(|&key| {
                let expected = if self.graph.has_circular_reference(key) {
                    CellValue::Error(CellError::Circular)
                } else {
                    match scheduler.compute(&self.store, key) {
                        Some(Ok(value)) => value,
                        Some(Err(e)) => CellValue::Error(e.cell_error()),
                        None => return false,
                    }
                };
                self.store.value(key) != expected
            })
            .collect()
    }

    fn apply(&mut self, edits: Vec<(CellKey, Edit)>) -> ChangeSet {
        let mut before = AHashMap::new();
        let mut seeds = Vec::with_capacity(edits.len());
        for (key, edit) in edits {
            before
                .entry(key)
                .or_insert_with(|| self.store.value(key));
            self.write(key, edit);
            seeds.push(key);
        }
        seeds.sort_unstable();
        seeds.dedup();
        self.run_pass(&seeds, before)
    }

    /// Replace a cell's content and edges
    fn write(&mut self, key: CellKey, edit: Edit) {
        let input = match edit {
            Edit::Content(text) => CellInput::classify(&text),
            Edit::Value(CellValue::Empty) => CellInput::Empty,
            Edit::Value(value) => CellInput::Literal(value),
        };

        match input {
            CellInput::Formula(text) => match parse_formula(&text) {
                Ok(formula) => {
                    let resolution = ReferenceResolver::new(&self.sheets, key).precedents(&formula);
                    self.graph.set_edges(key, resolution.precedents);
                    self.store
                        .set_formula(key, text, formula, resolution.unresolved_sheets);
                }
                Err(error) => {
                    debug!(cell = %key, %error, "formula did not parse");
                    self.graph.clear_dependencies(key);
                    self.store.set_invalid_formula(key, text, error);
                }
            },
            constant => {
                self.graph.clear_dependencies(key);
                self.store.set_constant(key, constant);
            }
        }
    }

    fn run_pass(&mut self, seeds: &[CellKey], before: AHashMap<CellKey, CellValue>) -> ChangeSet {
        let plan = self.graph.get_recalc_plan(seeds);
        for cycle in &plan.cycles {
            debug!(cells = ?cycle, "circular reference");
        }

        let scheduler = Scheduler {
            functions: &self.functions,
            sheets: &self.sheets,
            limits: self.options.limits(),
        };
        let (changes, stats) = scheduler.run(&mut self.store, &plan, seeds.len(), before);
        self.last_pass = stats;

        if !changes.is_empty() {
            for listener in &mut self.listeners {
                listener(&changes);
            }
        }
        changes
    }
}

/// Inputs collected by [`Engine::batch`]
pub struct Batch<'a> {
    sheets: &'a SheetRegistry,
    edits: Vec<(CellKey, Edit)>,
}

impl Batch<'_> {
    /// Queue a content change by address
    pub fn set(&mut self, address: &str, text: &str) -> Result<()> {
        let key = parse_address(self.sheets, address)?;
        self.edits.push((key, Edit::Content(text.to_string())));
        Ok(())
    }

    /// Queue a content change
    pub fn set_cell_content(&mut self, key: CellKey, text: &str) -> Result<()> {
        check_key(self.sheets, key)?;
        self.edits.push((key, Edit::Content(text.to_string())));
        Ok(())
    }

    /// Queue an externally computed value
    pub fn set_external_value(&mut self, key: CellKey, value: CellValue) -> Result<()> {
        check_key(self.sheets, key)?;
        self.edits.push((key, Edit::Value(value)));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

fn check_key(sheets: &SheetRegistry, key: CellKey) -> Result<()> {
    if key.sheet >= sheets.len() {
        return Err(Error::SheetOutOfBounds(key.sheet, sheets.len()));
    }
    if key.row >= MAX_ROWS {
        return Err(Error::RowOutOfBounds(key.row, MAX_ROWS - 1));
    }
    if key.col >= MAX_COLS {
        return Err(Error::ColumnOutOfBounds(key.col as u32, MAX_COLS - 1));
    }
    Ok(())
}

fn parse_address(sheets: &SheetRegistry, address: &str) -> Result<CellKey> {
    let address = address.trim();
    let (sheet, cell) = match address.rsplit_once('!') {
        Some((sheet, cell)) => (sheets.require(&unquote_sheet_name(sheet))?, cell),
        None => (DEFAULT_SHEET, address),
    };
    let addr = CellAddress::parse(cell)?;
    Ok(CellKey::from_address(sheet, &addr))
}

fn unquote_sheet_name(name: &str) -> String {
    match name.strip_prefix('\'').and_then(|n| n.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => name.to_string(),
    }
}

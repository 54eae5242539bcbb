//! Dependency tracking for formula calculation
//!
//! Edges run from a formula cell to the cells and ranges it reads. Ranges are
//! stored as rectangles and never expanded, so `SUM(A1:A1000000)` costs one
//! edge. Dependents of a cell are the formulas that name it directly plus the
//! formulas whose ranges contain it.

use ahash::{AHashMap, AHashSet};
use cellflow_core::{CellAddress, SheetId};
use std::collections::VecDeque;
use std::fmt;

/// Unique key for a cell (sheet index + address)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub sheet: SheetId,
    pub row: u32,
    pub col: u16,
}

impl CellKey {
    /// Create a new cell key
    pub fn new(sheet: SheetId, row: u32, col: u16) -> Self {
        Self { sheet, row, col }
    }

    /// Create from sheet index and cell address
    pub fn from_address(sheet: SheetId, addr: &CellAddress) -> Self {
        Self::new(sheet, addr.row, addr.col)
    }

    /// Relative A1 address of this cell
    pub fn address(&self) -> CellAddress {
        CellAddress::new(self.row, self.col)
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", self.sheet, self.address())
    }
}

/// A rectangular block of cells on one sheet, corners inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeKey {
    pub sheet: SheetId,
    pub start_row: u32,
    pub start_col: u16,
    pub end_row: u32,
    pub end_col: u16,
}

impl RangeKey {
    /// Create a range, normalizing the corners
    pub fn new(sheet: SheetId, row1: u32, col1: u16, row2: u32, col2: u16) -> Self {
        Self {
            sheet,
            start_row: row1.min(row2),
            start_col: col1.min(col2),
            end_row: row1.max(row2),
            end_col: col1.max(col2),
        }
    }

    /// Whether the cell lies inside the rectangle
    pub fn contains(&self, cell: &CellKey) -> bool {
        cell.sheet == self.sheet
            && cell.row >= self.start_row
            && cell.row <= self.end_row
            && cell.col >= self.start_col
            && cell.col <= self.end_col
    }

    pub fn rows(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn cols(&self) -> u16 {
        self.end_col - self.start_col + 1
    }

    /// Number of cells covered
    pub fn cell_count(&self) -> u64 {
        self.rows() as u64 * self.cols() as u64
    }

    /// Cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = CellKey> + '_ {
        (self.start_row..=self.end_row).flat_map(move |row| {
            (self.start_col..=self.end_col).map(move |col| CellKey::new(self.sheet, row, col))
        })
    }
}

impl fmt::Display for RangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]{}:{}",
            self.sheet,
            CellAddress::new(self.start_row, self.start_col),
            CellAddress::new(self.end_row, self.end_col)
        )
    }
}

/// Something a formula reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Precedent {
    Cell(CellKey),
    Range(RangeKey),
}

impl Precedent {
    /// Whether changing `cell` can change what this precedent reads
    pub fn covers(&self, cell: &CellKey) -> bool {
        match self {
            Precedent::Cell(key) => key == cell,
            Precedent::Range(range) => range.contains(cell),
        }
    }
}

/// Cells to recompute after a change, in dependency order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecalcPlan {
    /// Every affected cell; precedents always come before their dependents
    pub order: Vec<CellKey>,
    /// Strongly connected groups that form cycles, each sorted
    pub cycles: Vec<Vec<CellKey>>,
    circular: AHashSet<CellKey>,
}

impl RecalcPlan {
    /// Whether the cell sits on a dependency cycle
    pub fn is_circular(&self, cell: &CellKey) -> bool {
        self.circular.contains(cell)
    }

    pub fn circular_count(&self) -> usize {
        self.circular.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Dependency graph for formula cells
///
/// Tracks which cells depend on which other cells,
/// enabling efficient recalculation.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Formula cell → what it reads
    precedents: AHashMap<CellKey, Vec<Precedent>>,
    /// Cell → formulas naming it directly
    cell_dependents: AHashMap<CellKey, AHashSet<CellKey>>,
    /// Sheet → range → formulas reading it; lookups only scan one sheet
    range_dependents: AHashMap<SheetId, AHashMap<RangeKey, AHashSet<CellKey>>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything `cell` reads with `edges`.
    ///
    /// Old edges are removed before the new ones are installed, so the graph
    /// never holds a mix of both.
    pub fn set_edges(&mut self, cell: CellKey, edges: impl IntoIterator<Item = Precedent>) {
        self.clear_dependencies(cell);

        let mut edges: Vec<Precedent> = edges.into_iter().collect();
        edges.sort();
        edges.dedup();
        if edges.is_empty() {
            return;
        }

        for edge in &edges {
            match edge {
                Precedent::Cell(key) => {
                    self.cell_dependents.entry(*key).or_default().insert(cell);
                }
                Precedent::Range(range) => {
                    self.range_dependents
                        .entry(range.sheet)
                        .or_default()
                        .entry(*range)
                        .or_default()
                        .insert(cell);
                }
            }
        }
        self.precedents.insert(cell, edges);
    }

    /// Remove all edges out of a cell
    pub fn clear_dependencies(&mut self, cell: CellKey) {
        let Some(old) = self.precedents.remove(&cell) else {
            return;
        };
        for edge in old {
            match edge {
                Precedent::Cell(key) => {
                    if let Some(deps) = self.cell_dependents.get_mut(&key) {
                        deps.remove(&cell);
                        if deps.is_empty() {
                            self.cell_dependents.remove(&key);
                        }
                    }
                }
                Precedent::Range(range) => {
                    if let Some(ranges) = self.range_dependents.get_mut(&range.sheet) {
                        if let Some(deps) = ranges.get_mut(&range) {
                            deps.remove(&cell);
                            if deps.is_empty() {
                                ranges.remove(&range);
                            }
                        }
                        if ranges.is_empty() {
                            self.range_dependents.remove(&range.sheet);
                        }
                    }
                }
            }
        }
    }

    /// What the given cell reads
    pub fn get_precedents(&self, cell: CellKey) -> &[Precedent] {
        self.precedents.get(&cell).map_or(&[], Vec::as_slice)
    }

    /// Formulas that read the given cell, directly or through a range, sorted
    pub fn get_dependents(&self, cell: CellKey) -> Vec<CellKey> {
        let mut out: Vec<CellKey> = self
            .cell_dependents
            .get(&cell)
            .into_iter()
            .flatten()
            .copied()
            .collect();
        for (range, deps) in self.range_dependents.get(&cell.sheet).into_iter().flatten() {
            if range.contains(&cell) {
                out.extend(deps.iter().copied());
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Number of formula cells with at least one edge
    pub fn len(&self) -> usize {
        self.precedents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.precedents.is_empty()
    }

    /// The changed cells plus everything that transitively reads them, sorted
    pub fn affected(&self, changed: &[CellKey]) -> Vec<CellKey> {
        let mut out: Vec<CellKey> = self.reach(changed).into_keys().collect();
        out.sort_unstable();
        out
    }

    /// Breadth-first walk over dependents, keeping each visited cell's
    /// direct dependents so callers never look them up twice
    fn reach(&self, changed: &[CellKey]) -> AHashMap<CellKey, Vec<CellKey>> {
        let mut seen: AHashMap<CellKey, Vec<CellKey>> = AHashMap::new();
        let mut queue: VecDeque<CellKey> = changed.iter().copied().collect();

        while let Some(cell) = queue.pop_front() {
            if seen.contains_key(&cell) {
                continue;
            }
            let dependents = self.get_dependents(cell);
            queue.extend(dependents.iter().filter(|d| !seen.contains_key(*d)).copied());
            seen.insert(cell, dependents);
        }
        seen
    }

    /// Ordered recalculation plan for a set of changed cells.
    ///
    /// Cycles are found with Tarjan's strongly connected components over the
    /// affected cells. The components come out dependents-first, so reversing
    /// them gives an order where every precedent is computed before its
    /// readers, with each cycle collapsed into one step.
    pub fn get_recalc_plan(&self, changed: &[CellKey]) -> RecalcPlan {
        let mut reached = self.reach(changed);
        let mut nodes: Vec<CellKey> = reached.keys().copied().collect();
        nodes.sort_unstable();
        let index_of: AHashMap<CellKey, usize> =
            nodes.iter().enumerate().map(|(i, k)| (*k, i)).collect();

        // Every dependent of a reached cell was reached too
        let successors: Vec<Vec<usize>> = nodes
            .iter()
            .map(|cell| {
                reached
                    .remove(cell)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|d| index_of.get(&d).copied())
                    .collect()
            })
            .collect();

        let components = strongly_connected_components(&successors);

        let mut plan = RecalcPlan::default();
        for component in components.into_iter().rev() {
            let is_cycle = component.len() > 1 || successors[component[0]].contains(&component[0]);
            let mut cells: Vec<CellKey> = component.iter().map(|&i| nodes[i]).collect();
            cells.sort_unstable();
            if is_cycle {
                plan.circular.extend(cells.iter().copied());
                plan.cycles.push(cells.clone());
            }
            plan.order.extend(cells);
        }
        plan
    }

    /// Detect circular references involving a cell
    pub fn has_circular_reference(&self, cell: CellKey) -> bool {
        let mut seen = AHashSet::new();
        let mut queue: VecDeque<CellKey> = self.get_dependents(cell).into();

        while let Some(next) = queue.pop_front() {
            if next == cell {
                return true;
            }
            if seen.insert(next) {
                queue.extend(self.get_dependents(next));
            }
        }
        false
    }

    /// Clear the entire graph
    pub fn clear(&mut self) {
        self.precedents.clear();
        self.cell_dependents.clear();
        self.range_dependents.clear();
    }
}

/// Iterative Tarjan over an adjacency list; components are emitted so that
/// every component appears after all components reachable from it.
fn strongly_connected_components(successors: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = successors.len();
    let mut index: Vec<Option<usize>> = vec![None; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut components = Vec::new();
    let mut next_index = 0;

    for root in 0..n {
        if index[root].is_some() {
            continue;
        }

        index[root] = Some(next_index);
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;
        // (node, position of the next successor to visit)
        let mut frames: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(frame) = frames.last_mut() {
            let v = frame.0;
            if let Some(&w) = successors[v].get(frame.1) {
                frame.1 += 1;
                match index[w] {
                    None => {
                        index[w] = Some(next_index);
                        lowlink[w] = next_index;
                        next_index += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        frames.push((w, 0));
                    }
                    Some(w_index) if on_stack[w] => {
                        lowlink[v] = lowlink[v].min(w_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }
            if index[v] == Some(lowlink[v]) {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }

    components
}

//! Reference resolution
//!
//! Turns the syntactic references in an AST into [`CellKey`]s and
//! [`RangeKey`]s. A formula is resolved relative to the cell it is evaluated
//! for (the anchor). When the text was written for a different cell (the
//! origin), relative axes shift by `anchor - origin` while `$`-absolute axes
//! stay put.

use crate::ast::{CellReference, FormulaExpr, RangeReference, ReferenceExpr};
use crate::dependency::{CellKey, Precedent, RangeKey};
use cellflow_core::{CellAddress, CellError, SheetId, SheetRegistry};

/// Maps sheet names to sheet ids
pub trait SheetResolver {
    /// Look up a sheet by name (case-insensitive)
    fn sheet_id(&self, name: &str) -> Option<SheetId>;
}

impl SheetResolver for SheetRegistry {
    fn sheet_id(&self, name: &str) -> Option<SheetId> {
        self.index_of(name)
    }
}

/// Resolves references for one anchor cell
#[derive(Clone, Copy)]
pub struct ReferenceResolver<'a> {
    sheets: &'a dyn SheetResolver,
    origin: CellKey,
    anchor: CellKey,
}

/// Everything a formula reads, as graph edges
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub precedents: Vec<Precedent>,
    /// Sheet names that did not resolve; the formula reads `#REF` for them
    /// until such a sheet is added
    pub unresolved_sheets: Vec<String>,
}

impl<'a> ReferenceResolver<'a> {
    /// Resolver for a formula evaluated in the cell it was written in
    pub fn new(sheets: &'a dyn SheetResolver, cell: CellKey) -> Self {
        Self::relocated(sheets, cell, cell)
    }

    /// Resolver for a formula written at `origin` and evaluated at `anchor`
    pub fn relocated(sheets: &'a dyn SheetResolver, origin: CellKey, anchor: CellKey) -> Self {
        Self {
            sheets,
            origin,
            anchor,
        }
    }

    pub fn anchor(&self) -> CellKey {
        self.anchor
    }

    fn sheet(&self, name: Option<&str>) -> Result<SheetId, CellError> {
        match name {
            None => Ok(self.anchor.sheet),
            Some(name) => self.sheets.sheet_id(name).ok_or(CellError::Ref),
        }
    }

    fn shift(&self, addr: &CellAddress) -> Result<CellAddress, CellError> {
        let d_row = if addr.row_absolute {
            0
        } else {
            self.anchor.row as i64 - self.origin.row as i64
        };
        let d_col = if addr.col_absolute {
            0
        } else {
            self.anchor.col as i64 - self.origin.col as i64
        };
        addr.offset(d_row, d_col).ok_or(CellError::Ref)
    }

    /// Resolve a cell reference; `#REF` for an unknown sheet or a shift off
    /// the grid
    pub fn resolve_cell(&self, reference: &CellReference) -> Result<CellKey, CellError> {
        let sheet = self.sheet(reference.sheet.as_deref())?;
        let addr = self.shift(&reference.address)?;
        Ok(CellKey::from_address(sheet, &addr))
    }

    /// Resolve a range reference, shifting both corners
    pub fn resolve_range(&self, reference: &RangeReference) -> Result<RangeKey, CellError> {
        let sheet = self.sheet(reference.sheet.as_deref())?;
        let start = self.shift(&reference.range.start)?;
        let end = self.shift(&reference.range.end)?;
        Ok(RangeKey::new(sheet, start.row, start.col, end.row, end.col))
    }

    /// Resolve every reference in an expression into graph edges
    pub fn precedents(&self, expr: &FormulaExpr) -> Resolution {
        let mut resolution = Resolution::default();
        for reference in expr.references() {
            let (sheet, edge) = match reference {
                ReferenceExpr::Cell(r) => (&r.sheet, self.resolve_cell(r).map(Precedent::Cell)),
                ReferenceExpr::Range(r) => {
                    (&r.sheet, self.resolve_range(r).map(Precedent::Range))
                }
            };
            match (edge, sheet) {
                (Ok(edge), _) => resolution.precedents.push(edge),
                (Err(_), Some(name)) if self.sheets.sheet_id(name).is_none() => {
                    if !resolution
                        .unresolved_sheets
                        .iter()
                        .any(|s| s.eq_ignore_ascii_case(name))
                    {
                        resolution.unresolved_sheets.push(name.clone());
                    }
                }
                // Shifted off the grid: reads #REF, nothing to depend on
                (Err(_), _) => {}
            }
        }
        resolution
    }
}

//! # cellflow
//!
//! An embeddable spreadsheet computation engine.
//!
//! Cells hold literals or formulas. Formulas are parsed once, their
//! references become edges in a dependency graph, and every edit triggers an
//! incremental recalculation pass that re-evaluates exactly the cells that
//! depend on what changed, in dependency order.
//!
//! ## Features
//!
//! - Formula language with references, ranges, cross-sheet references and
//!   operator precedence
//! - Typed error values (`#DIV0`, `#REF`, `#CIRCULAR`, ...) that propagate
//!   through formulas
//! - Cycle detection; cells on a cycle read `#CIRCULAR` without stalling the
//!   rest of the sheet
//! - Pluggable functions with arity and argument-class contracts
//! - Change notification once per pass, with exactly the cells that changed
//!
//! ## Example
//!
//! ```rust
//! use cellflow::prelude::*;
//!
//! let mut engine = Engine::new();
//! engine.set("A1", "2").unwrap();
//! engine.set("A2", "=A1*2").unwrap();
//! engine.set("A3", "=A2+1").unwrap();
//!
//! let changed = engine.set("A1", "5").unwrap();
//! assert_eq!(changed.len(), 3);
//! assert_eq!(engine.value("A3").unwrap(), CellValue::Number(11.0));
//! ```

pub mod engine;
pub mod options;
pub mod prelude;
pub mod scheduler;
pub mod snapshot;
pub mod store;

pub use engine::{Batch, Engine};
pub use options::EngineOptions;
pub use scheduler::{ChangeSet, PassStats};
pub use snapshot::ValueSnapshot;
pub use store::{Cell, CellStore};

// Re-export core types
pub use cellflow_core::{
    CellAddress, CellError, CellInput, CellRange, CellValue, Error, Result, SheetId,
    SheetRegistry, MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN,
};

// Re-export formula types
pub use cellflow_formula::{
    evaluate, parse_formula, ArgClass, CallContext, CellKey, EvaluationContext, FormulaError,
    FormulaExpr, FormulaResult, FunctionArg, FunctionDef, FunctionRegistry, LazyArgs,
    ParseError, ParseErrorKind, Precedent, RangeKey, ReferenceExpr,
};

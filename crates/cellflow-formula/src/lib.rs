//! # cellflow-formula
//!
//! Formula language for cellflow.
//!
//! This crate provides:
//! - Tokenizing and parsing formula text into an AST
//! - Resolving references to sheet-qualified cell and range keys
//! - Evaluation with spreadsheet coercion and error propagation
//! - A case-insensitive function registry with built-in functions
//! - A dependency graph with cycle detection for recalculation
//!
//! ## Example
//!
//! ```rust
//! use cellflow_core::{CellValue, SheetRegistry};
//! use cellflow_formula::{evaluate, parse_formula, CellKey, EvaluationContext, FunctionRegistry};
//!
//! let ast = parse_formula("=SUM(A1:A2)*2").unwrap();
//! let sheets = SheetRegistry::with_sheet("Sheet1").unwrap();
//! let registry = FunctionRegistry::new();
//! let values = |key: CellKey| CellValue::Number(key.row as f64 + 1.0);
//! let ctx = EvaluationContext::new(&registry, &sheets, &values, CellKey::new(0, 5, 0));
//!
//! assert_eq!(evaluate(&ast, &ctx).unwrap(), CellValue::Number(6.0));
//! ```

pub mod ast;
pub mod coerce;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod resolver;

pub use ast::{
    BinaryOperator, CellReference, FormulaExpr, RangeReference, ReferenceExpr, UnaryOperator,
};
pub use dependency::{CellKey, DependencyGraph, Precedent, RangeKey, RecalcPlan};
pub use error::{FormulaError, FormulaResult, ParseError, ParseErrorKind};
pub use evaluator::{
    evaluate, CallContext, EvalLimits, EvaluationContext, FunctionArg, LazyArgs, RangeValues,
    ValueSource,
};
pub use functions::{ArgClass, FunctionDef, FunctionImpl, FunctionRegistry};
pub use parser::{parse_formula, MAX_NESTING};
pub use resolver::{ReferenceResolver, Resolution, SheetResolver};

//! # cellflow-core
//!
//! Core data structures shared by the cellflow crates.
//!
//! This crate provides:
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing with absolute markers
//! - [`CellValue`] and [`CellError`] - the typed values a cell can hold
//! - [`CellInput`] - classification of raw user input (literal vs. formula)
//! - [`SheetRegistry`] - the name → sheet lookup used by cross-sheet references
//!
//! ## Example
//!
//! ```rust
//! use cellflow_core::{CellAddress, CellInput, CellValue};
//!
//! let addr = CellAddress::parse("$B$2").unwrap();
//! assert_eq!((addr.row, addr.col), (1, 1));
//!
//! assert_eq!(CellInput::classify("42"), CellInput::Literal(CellValue::Number(42.0)));
//! assert!(CellInput::classify("=A1+1").is_formula());
//! ```

pub mod cell;
pub mod error;
pub mod sheet;

pub use cell::{parse_number, CellAddress, CellError, CellInput, CellRange, CellValue, SharedString};
pub use error::{Error, Result};
pub use sheet::{SheetId, SheetRegistry, DEFAULT_SHEET_NAME};

/// Maximum number of rows in a sheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a sheet
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;

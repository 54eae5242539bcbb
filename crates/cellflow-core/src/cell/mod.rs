//! Cell-related types
//!
//! - [`CellAddress`] / [`CellRange`] - where a cell lives
//! - [`CellValue`] / [`CellError`] - what a cell evaluates to
//! - [`CellInput`] - what the user typed into it

mod address;
mod input;
mod value;

pub use address::{CellAddress, CellRange};
pub use input::{parse_number, CellInput};
pub use value::{CellError, CellValue, SharedString};

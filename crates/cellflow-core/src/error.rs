//! Error types for cellflow-core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Misuse of the public API: bad addresses, unknown or clashing sheets.
///
/// Problems inside formulas never surface here; they become
/// [`crate::CellError`] values stored in the affected cells.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Row index and the last valid row
    #[error("Row {0} is past the last row {1}")]
    RowOutOfBounds(u32, u32),

    /// Column index and the last valid column
    #[error("Column {0} is past the last column {1}")]
    ColumnOutOfBounds(u32, u16),

    #[error("No sheet named '{0}'")]
    SheetNotFound(String),

    /// A sheet id the registry never issued, and how many it has
    #[error("Sheet id {0} was never issued ({1} sheets exist)")]
    SheetOutOfBounds(usize, usize),

    #[error("Invalid sheet name '{0}'")]
    InvalidSheetName(String),

    #[error("Sheet '{0}' already exists")]
    DuplicateSheetName(String),
}

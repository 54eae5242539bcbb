//! Formula error types

use cellflow_core::CellError;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Faults raised while parsing or evaluating a formula.
///
/// A fault never escapes a recalculation pass: the scheduler maps it onto the
/// cell as an error value (see [`FormulaError::cell_error`]).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Formula text could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A function implementation reported a failure
    #[error("{function}: {message}")]
    Function { function: String, message: String },

    /// A function implementation panicked
    #[error("{0} panicked during evaluation")]
    Panicked(String),
}

impl FormulaError {
    /// Build a failure reported by a function implementation
    pub fn function(function: impl Into<String>, message: impl Into<String>) -> Self {
        FormulaError::Function {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Error value stored in a cell whose evaluation ended with this fault
    pub fn cell_error(&self) -> CellError {
        match self {
            FormulaError::Parse(e) => e.cell_error(),
            FormulaError::Function { .. } | FormulaError::Panicked(_) => CellError::Error,
        }
    }
}

/// What went wrong during parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// A token that cannot appear at this position
    UnexpectedToken,
    /// Input ended in the middle of an expression
    UnexpectedEnd,
    /// A string literal or quoted sheet name has no closing quote
    UnterminatedString,
    /// A reference outside the grid or with mismatched sheets
    InvalidReference,
    /// A bare identifier that is neither a reference nor a function call
    UnknownName,
    /// Expression nesting is deeper than the parser allows
    TooDeep,
    /// A character that starts no token
    InvalidCharacter,
}

/// Parse failure with the byte offset in the formula text where it occurred
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub position: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, position: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            position,
            message: message.into(),
        }
    }

    /// `#NAME` for unknown identifiers, `#ERROR` for everything else
    pub fn cell_error(&self) -> CellError {
        match self.kind {
            ParseErrorKind::UnknownName => CellError::Name,
            _ => CellError::Error,
        }
    }
}

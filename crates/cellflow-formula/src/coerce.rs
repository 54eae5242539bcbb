//! Value coercion rules shared by operators and builtin functions

use cellflow_core::{parse_number, CellError, CellValue};
use std::cmp::Ordering;

/// Numeric view of a value.
///
/// Empty is 0, booleans are 1/0, text must parse as a number. Errors pass
/// through unchanged.
pub fn to_number(value: &CellValue) -> Result<f64, CellError> {
    match value {
        CellValue::Empty => Ok(0.0),
        CellValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        CellValue::Number(n) => Ok(*n),
        CellValue::Text(s) => parse_number(s.as_str().trim()).ok_or(CellError::Value),
        CellValue::Error(e) => Err(*e),
    }
}

/// Logical view of a value.
///
/// Numbers are true when non-zero, empty is false, text must read `TRUE` or
/// `FALSE`.
pub fn to_logical(value: &CellValue) -> Result<bool, CellError> {
    match value {
        CellValue::Empty => Ok(false),
        CellValue::Boolean(b) => Ok(*b),
        CellValue::Number(n) => Ok(*n != 0.0),
        CellValue::Text(s) => {
            let s = s.as_str().trim();
            if s.eq_ignore_ascii_case("TRUE") {
                Ok(true)
            } else if s.eq_ignore_ascii_case("FALSE") {
                Ok(false)
            } else {
                Err(CellError::Value)
            }
        }
        CellValue::Error(e) => Err(*e),
    }
}

/// Text view of a value; errors pass through
pub fn to_text(value: &CellValue) -> Result<String, CellError> {
    match value {
        CellValue::Error(e) => Err(*e),
        other => Ok(other.to_text()),
    }
}

fn type_rank(value: &CellValue) -> u8 {
    match value {
        CellValue::Empty => 0,
        CellValue::Boolean(_) => 1,
        CellValue::Number(_) => 2,
        CellValue::Text(_) => 3,
        CellValue::Error(_) => 4,
    }
}

/// Total order used by the comparison operators.
///
/// Values of different types order `Empty < Boolean < Number < Text`; text
/// compares case-insensitively. Callers handle errors before comparing.
pub fn compare(left: &CellValue, right: &CellValue) -> Ordering {
    match (left, right) {
        (CellValue::Boolean(a), CellValue::Boolean(b)) => a.cmp(b),
        (CellValue::Number(a), CellValue::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (CellValue::Text(a), CellValue::Text(b)) => a
            .as_str()
            .to_lowercase()
            .cmp(&b.as_str().to_lowercase()),
        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

/// The first error among the values, if any
pub fn first_error<'a>(values: impl IntoIterator<Item = &'a CellValue>) -> Option<CellError> {
    values.into_iter().find_map(CellValue::error)
}

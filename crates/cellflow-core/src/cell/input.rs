//! Classification of raw cell input

use super::value::CellValue;

/// What a user (or an import collaborator) typed into a cell.
///
/// A leading `=` marks a formula; anything else is a literal and never goes
/// through the formula parser.
#[derive(Debug, Clone, PartialEq)]
pub enum CellInput {
    /// Blank or whitespace-only input
    Empty,
    /// A constant: number, boolean or text
    Literal(CellValue),
    /// Formula source, including the leading `=`
    Formula(String),
}

impl CellInput {
    /// Classify raw input text.
    ///
    /// Numbers are recognized after trimming surrounding whitespace;
    /// `TRUE`/`FALSE` in any case become booleans; everything else is kept
    /// verbatim as text.
    pub fn classify(text: &str) -> Self {
        if text.starts_with('=') {
            return CellInput::Formula(text.to_string());
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return CellInput::Empty;
        }

        if let Some(n) = parse_number(trimmed) {
            return CellInput::Literal(CellValue::Number(n));
        }

        if trimmed.eq_ignore_ascii_case("TRUE") {
            return CellInput::Literal(CellValue::Boolean(true));
        }
        if trimmed.eq_ignore_ascii_case("FALSE") {
            return CellInput::Literal(CellValue::Boolean(false));
        }

        CellInput::Literal(CellValue::text(text))
    }

    /// Check if this input is a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, CellInput::Formula(_))
    }

    /// Formula source text, if any
    pub fn formula_text(&self) -> Option<&str> {
        match self {
            CellInput::Formula(text) => Some(text),
            _ => None,
        }
    }
}

/// Parse decimal number text. Rejects `inf`, `NaN` and friends, which Rust's
/// float parser would otherwise accept.
pub fn parse_number(s: &str) -> Option<f64> {
    let first = s.chars().next()?;
    if !(first.is_ascii_digit() || first == '.' || first == '-' || first == '+') {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

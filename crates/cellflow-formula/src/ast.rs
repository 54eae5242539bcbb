//! Formula Abstract Syntax Tree types

use cellflow_core::{CellAddress, CellError, CellRange, CellValue};
use std::fmt;

/// Formula expression AST
///
/// The tree is immutable once parsed; editing a cell replaces its tree whole.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal
    Text(String),
    /// Boolean literal
    Boolean(bool),
    /// Error literal
    Error(CellError),

    // === References ===
    /// Single cell reference
    CellRef(CellReference),
    /// Rectangular range reference
    RangeRef(RangeReference),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    // === Function call ===
    Function {
        name: String,
        args: Vec<FormulaExpr>,
    },
}

/// Cell reference with optional sheet
#[derive(Debug, Clone, PartialEq)]
pub struct CellReference {
    pub sheet: Option<String>,
    pub address: CellAddress,
}

/// Range reference with optional sheet
#[derive(Debug, Clone, PartialEq)]
pub struct RangeReference {
    pub sheet: Option<String>,
    pub range: CellRange,
}

/// A reference node found while walking an expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReferenceExpr<'a> {
    Cell(&'a CellReference),
    Range(&'a RangeReference),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Text
    Concat,
}

impl BinaryOperator {
    /// Operator symbol as written in formulas
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Concat => "&",
        }
    }

    /// Binding strength, higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::LessThan
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterEqual => 1,
            BinaryOperator::Concat => 2,
            BinaryOperator::Add | BinaryOperator::Subtract => 3,
            BinaryOperator::Multiply | BinaryOperator::Divide => 4,
            BinaryOperator::Power => 6,
        }
    }

    /// Whether the operator groups right-to-left (`2^3^2` is `2^(3^2)`)
    pub fn is_right_associative(&self) -> bool {
        matches!(self, BinaryOperator::Power)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Plus,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Plus => "+",
        }
    }
}

const UNARY_PRECEDENCE: u8 = 5;
const PRIMARY_PRECEDENCE: u8 = 7;

impl FormulaExpr {
    /// All reference nodes in evaluation order (left to right)
    pub fn references(&self) -> Vec<ReferenceExpr<'_>> {
        let mut out = Vec::new();
        self.walk(&mut |expr| match expr {
            FormulaExpr::CellRef(r) => out.push(ReferenceExpr::Cell(r)),
            FormulaExpr::RangeRef(r) => out.push(ReferenceExpr::Range(r)),
            _ => {}
        });
        out
    }

    /// Whether any call in the tree names `name` (case-insensitive)
    pub fn calls_function(&self, name: &str) -> bool {
        let mut found = false;
        self.walk(&mut |expr| {
            if let FormulaExpr::Function { name: called, .. } = expr {
                found |= called.eq_ignore_ascii_case(name);
            }
        });
        found
    }

    /// Visit every node, parents before children
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a FormulaExpr)) {
        // Explicit stack so deep trees cannot overflow the call stack
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            visit(expr);
            match expr {
                FormulaExpr::BinaryOp { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
                FormulaExpr::UnaryOp { operand, .. } => stack.push(operand),
                FormulaExpr::Function { args, .. } => stack.extend(args.iter().rev()),
                _ => {}
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            FormulaExpr::BinaryOp { op, .. } => op.precedence(),
            FormulaExpr::UnaryOp { .. } => UNARY_PRECEDENCE,
            _ => PRIMARY_PRECEDENCE,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parens: bool) -> fmt::Result {
        if parens {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

/// Renders formula text (without the leading `=`) that parses back to the
/// same tree. Parentheses appear only where precedence requires them.
impl fmt::Display for FormulaExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaExpr::Number(n) => f.write_str(&CellValue::Number(*n).to_text()),
            FormulaExpr::Text(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            FormulaExpr::Boolean(true) => f.write_str("TRUE"),
            FormulaExpr::Boolean(false) => f.write_str("FALSE"),
            FormulaExpr::Error(e) => write!(f, "{}", e),
            FormulaExpr::CellRef(r) => write!(f, "{}", r),
            FormulaExpr::RangeRef(r) => write!(f, "{}", r),
            FormulaExpr::UnaryOp { op, operand } => {
                f.write_str(op.symbol())?;
                operand.fmt_operand(f, operand.precedence() < UNARY_PRECEDENCE)
            }
            FormulaExpr::BinaryOp { op, left, right } => {
                let prec = op.precedence();
                let (left_parens, right_parens) = if op.is_right_associative() {
                    (left.precedence() <= prec, right.precedence() < prec)
                } else {
                    (left.precedence() < prec, right.precedence() <= prec)
                };
                left.fmt_operand(f, left_parens)?;
                f.write_str(op.symbol())?;
                right.fmt_operand(f, right_parens)
            }
            FormulaExpr::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for CellReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write_sheet_prefix(f, sheet)?;
        }
        write!(f, "{}", self.address)
    }
}

impl fmt::Display for RangeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write_sheet_prefix(f, sheet)?;
        }
        write!(f, "{}:{}", self.range.start, self.range.end)
    }
}

fn write_sheet_prefix(f: &mut fmt::Formatter<'_>, sheet: &str) -> fmt::Result {
    let plain = sheet
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && sheet
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if plain {
        write!(f, "{}!", sheet)
    } else {
        write!(f, "'{}'!", sheet.replace('\'', "''"))
    }
}

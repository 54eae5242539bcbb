//! Formula parser
//!
//! A recursive descent parser over the token stream from [`crate::lexer`].

use crate::ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{Lexer, Token, TokenKind};
use cellflow_core::{CellAddress, CellRange};

/// Deepest nesting of parentheses, calls and prefix operators accepted
pub const MAX_NESTING: usize = 256;

/// Parse a formula string into an AST
///
/// The text must start with `=`. Error positions are byte offsets into the
/// full text, so the `=` itself is position 0.
///
/// # Example
/// ```rust
/// use cellflow_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1:A10)").unwrap();
/// let ast = parse_formula("=IF(A1>0,\"Yes\",\"No\")").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> Result<FormulaExpr, ParseError> {
    if !formula.starts_with('=') {
        return Err(ParseError::new(
            ParseErrorKind::UnexpectedToken,
            0,
            "formula must start with '='",
        ));
    }

    let tokens = Lexer::new(formula, 1).run()?;
    let mut parser = FormulaParser::new(tokens);
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    match parser.current() {
        TokenKind::Eof => Ok(expr),
        other => Err(ParseError::new(
            ParseErrorKind::UnexpectedToken,
            parser.position(),
            format!("unexpected {} after expression", other.describe()),
        )),
    }
}

/// Formula parser
struct FormulaParser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl FormulaParser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    // === Token access ===

    fn current(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map_or(&TokenKind::Eof, |t| &t.kind)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |t| t.position)
    }

    fn consume(&mut self) -> TokenKind {
        let kind = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn expect(&mut self, expected: TokenKind) -> Result<(), ParseError> {
        if *self.current() == expected {
            self.consume();
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {}", expected.describe())))
        }
    }

    fn unexpected(&self, context: &str) -> ParseError {
        let found = self.current();
        let kind = if *found == TokenKind::Eof {
            ParseErrorKind::UnexpectedEnd
        } else {
            ParseErrorKind::UnexpectedToken
        };
        ParseError::new(
            kind,
            self.position(),
            format!("{}, found {}", context, found.describe()),
        )
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::new(
                ParseErrorKind::TooDeep,
                self.position(),
                format!("expression nested deeper than {} levels", MAX_NESTING),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Unary: -, +
    // 6. Exponentiation: ^ (right associative)
    // 7. Primary: literals, references, function calls, parentheses

    fn parse_expression(&mut self) -> Result<FormulaExpr, ParseError> {
        self.enter()?;
        let expr = self.parse_comparison();
        self.leave();
        expr
    }

    fn parse_comparison(&mut self) -> Result<FormulaExpr, ParseError> {
        self.fold_binary(Self::parse_concatenation, |token| match token {
            TokenKind::Equal => Some(BinaryOperator::Equal),
            TokenKind::NotEqual => Some(BinaryOperator::NotEqual),
            TokenKind::Less => Some(BinaryOperator::LessThan),
            TokenKind::LessEqual => Some(BinaryOperator::LessEqual),
            TokenKind::Greater => Some(BinaryOperator::GreaterThan),
            TokenKind::GreaterEqual => Some(BinaryOperator::GreaterEqual),
            _ => None,
        })
    }

    fn parse_concatenation(&mut self) -> Result<FormulaExpr, ParseError> {
        self.fold_binary(Self::parse_additive, |token| match token {
            TokenKind::Ampersand => Some(BinaryOperator::Concat),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<FormulaExpr, ParseError> {
        self.fold_binary(Self::parse_multiplicative, |token| match token {
            TokenKind::Plus => Some(BinaryOperator::Add),
            TokenKind::Minus => Some(BinaryOperator::Subtract),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<FormulaExpr, ParseError> {
        self.fold_binary(Self::parse_unary, |token| match token {
            TokenKind::Star => Some(BinaryOperator::Multiply),
            TokenKind::Slash => Some(BinaryOperator::Divide),
            _ => None,
        })
    }

    /// Left-associative run of operands joined by the operators `op_for`
    /// recognizes. Every fold deepens the tree by one, so each counts against
    /// the nesting budget until the run ends.
    fn fold_binary(
        &mut self,
        operand: fn(&mut Self) -> Result<FormulaExpr, ParseError>,
        op_for: fn(&TokenKind) -> Option<BinaryOperator>,
    ) -> Result<FormulaExpr, ParseError> {
        let mut left = operand(self)?;
        let mut folds = 0;

        let result = loop {
            let Some(op) = op_for(self.current()) else {
                break Ok(left);
            };
            self.consume();
            folds += 1;
            if let Err(e) = self.enter() {
                break Err(e);
            }
            match operand(self) {
                Ok(right) => left = binary(op, left, right),
                Err(e) => break Err(e),
            }
        };

        self.depth -= folds;
        result
    }

    fn parse_unary(&mut self) -> Result<FormulaExpr, ParseError> {
        let op = match self.current() {
            TokenKind::Minus => UnaryOperator::Negate,
            TokenKind::Plus => UnaryOperator::Plus,
            _ => return self.parse_exponent(),
        };

        self.consume();
        self.enter()?;
        let operand = self.parse_unary();
        self.leave();
        Ok(FormulaExpr::UnaryOp {
            op,
            operand: Box::new(operand?),
        })
    }

    fn parse_exponent(&mut self) -> Result<FormulaExpr, ParseError> {
        let left = self.parse_primary()?;

        if matches!(self.current(), TokenKind::Caret) {
            self.consume();
            // Right associative, and the exponent may carry its own sign
            self.enter()?;
            let right = self.parse_unary();
            self.leave();
            return Ok(binary(BinaryOperator::Power, left, right?));
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<FormulaExpr, ParseError> {
        let start = self.position();
        match self.current().clone() {
            TokenKind::Number(n) => {
                self.consume();
                Ok(FormulaExpr::Number(n))
            }

            TokenKind::Text(s) => {
                self.consume();
                Ok(FormulaExpr::Text(s))
            }

            TokenKind::Boolean(b) => {
                self.consume();
                Ok(FormulaExpr::Boolean(b))
            }

            TokenKind::Error(e) => {
                self.consume();
                Ok(FormulaExpr::Error(e))
            }

            TokenKind::LeftParen => {
                self.consume();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                Ok(expr)
            }

            TokenKind::SheetPrefix(sheet) => {
                self.consume();
                match self.consume() {
                    TokenKind::CellRef(addr) => self.parse_reference(Some(sheet), addr),
                    other => Err(ParseError::new(
                        ParseErrorKind::InvalidReference,
                        start,
                        format!(
                            "expected a cell reference after sheet '{}', found {}",
                            sheet,
                            other.describe()
                        ),
                    )),
                }
            }

            TokenKind::CellRef(addr) => {
                self.consume();
                self.parse_reference(None, addr)
            }

            TokenKind::Identifier(name) => {
                self.consume();
                if matches!(self.current(), TokenKind::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Err(ParseError::new(
                        ParseErrorKind::UnknownName,
                        start,
                        format!("unknown name '{}'", name),
                    ))
                }
            }

            _ => Err(self.unexpected("expected an operand")),
        }
    }

    /// A cell reference, or a range when a `:` follows
    fn parse_reference(
        &mut self,
        sheet: Option<String>,
        start: CellAddress,
    ) -> Result<FormulaExpr, ParseError> {
        if !matches!(self.current(), TokenKind::Colon) {
            return Ok(FormulaExpr::CellRef(CellReference {
                sheet,
                address: start,
            }));
        }
        self.consume();

        let end_position = self.position();
        let end = match self.consume() {
            TokenKind::CellRef(addr) => addr,
            // Sheet1!A1:Sheet1!B2 is allowed when both sides name the same sheet
            TokenKind::SheetPrefix(end_sheet) => {
                let same = sheet
                    .as_deref()
                    .map_or(false, |s| s.eq_ignore_ascii_case(&end_sheet));
                if !same {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidReference,
                        end_position,
                        "range references must be on the same sheet",
                    ));
                }
                match self.consume() {
                    TokenKind::CellRef(addr) => addr,
                    other => return Err(range_end_error(end_position, &other)),
                }
            }
            other => return Err(range_end_error(end_position, &other)),
        };

        Ok(FormulaExpr::RangeRef(RangeReference {
            sheet,
            range: CellRange::new(start, end),
        }))
    }

    fn parse_function_call(&mut self, name: String) -> Result<FormulaExpr, ParseError> {
        self.expect(TokenKind::LeftParen)?;

        let mut args = Vec::new();

        if matches!(self.current(), TokenKind::RightParen) {
            self.consume();
            return Ok(FormulaExpr::Function { name, args });
        }

        loop {
            args.push(self.parse_expression()?);
            match self.current() {
                TokenKind::Comma => {
                    self.consume();
                }
                TokenKind::RightParen => {
                    self.consume();
                    break;
                }
                _ => return Err(self.unexpected("expected ',' or ')' in argument list")),
            }
        }

        Ok(FormulaExpr::Function { name, args })
    }
}

fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
    FormulaExpr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn range_end_error(position: usize, found: &TokenKind) -> ParseError {
    let kind = if *found == TokenKind::Eof {
        ParseErrorKind::UnexpectedEnd
    } else {
        ParseErrorKind::InvalidReference
    };
    ParseError::new(
        kind,
        position,
        format!("expected a cell reference after ':', found {}", found.describe()),
    )
}

//! Formula evaluator
//!
//! Evaluates an AST against committed cell values. Error values (`#DIV0`,
//! `#REF`, ...) are ordinary results that propagate through operators and
//! function arguments. A [`FormulaError`] is a fault: it aborts the whole
//! evaluation and the caller stores `#ERROR` for the cell.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::coerce::{compare, first_error, to_logical, to_number};
use crate::dependency::{CellKey, RangeKey};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{ArgClass, FunctionDef, FunctionImpl, FunctionRegistry};
use crate::resolver::{ReferenceResolver, SheetResolver};
use cellflow_core::{CellError, CellValue};
use std::cmp::Ordering;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Default bound on expression depth during evaluation
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Default bound on the number of cells a single range may read
pub const DEFAULT_MAX_RANGE_CELLS: u64 = 1_000_000;

/// Read access to committed cell values
pub trait ValueSource {
    /// Current value of a cell; cells never written are [`CellValue::Empty`]
    fn cell_value(&self, key: CellKey) -> CellValue;
}

impl<F> ValueSource for F
where
    F: Fn(CellKey) -> CellValue,
{
    fn cell_value(&self, key: CellKey) -> CellValue {
        self(key)
    }
}

/// Resource bounds for one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalLimits {
    /// Deeper expressions evaluate to `#ERROR`
    pub max_depth: usize,
    /// Larger ranges evaluate to `#ERROR`
    pub max_range_cells: u64,
    /// Turn panics in function implementations into faults
    pub catch_panics: bool,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
            catch_panics: true,
        }
    }
}

/// Values of a rectangular range in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct RangeValues {
    pub range: RangeKey,
    values: Vec<CellValue>,
}

impl RangeValues {
    /// Read every cell of `range` from `source`
    pub fn read(range: RangeKey, source: &dyn ValueSource) -> Self {
        let values = range.cells().map(|key| source.cell_value(key)).collect();
        Self { range, values }
    }

    /// All values, row by row
    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    /// Value at a zero-based offset inside the range
    pub fn get(&self, row: u32, col: u16) -> Option<&CellValue> {
        if row >= self.range.rows() || col >= self.range.cols() {
            return None;
        }
        self.values
            .get(row as usize * self.range.cols() as usize + col as usize)
    }
}

/// A function argument after evaluation and coercion
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArg {
    Value(CellValue),
    Range(RangeValues),
}

impl FunctionArg {
    /// The scalar, if this is not a range
    pub fn as_value(&self) -> Option<&CellValue> {
        match self {
            FunctionArg::Value(v) => Some(v),
            FunctionArg::Range(_) => None,
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, FunctionArg::Range(_))
    }

    /// The scalar as a one-element slice, or every cell of the range
    pub fn values(&self) -> &[CellValue] {
        match self {
            FunctionArg::Value(v) => std::slice::from_ref(v),
            FunctionArg::Range(r) => r.values(),
        }
    }

    /// Collapse to a scalar; a range in scalar position is `#VALUE`
    pub fn into_value(self) -> CellValue {
        match self {
            FunctionArg::Value(v) => v,
            FunctionArg::Range(_) => CellValue::Error(CellError::Value),
        }
    }
}

/// What an eager function implementation knows about its call site
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    /// Name as registered
    pub name: &'a str,
    /// Cell being evaluated
    pub cell: CellKey,
}

/// Evaluation context
pub struct EvaluationContext<'a> {
    pub registry: &'a FunctionRegistry,
    pub values: &'a dyn ValueSource,
    pub resolver: ReferenceResolver<'a>,
    pub limits: EvalLimits,
}

impl<'a> EvaluationContext<'a> {
    /// Create a context for evaluating the formula of `cell`
    pub fn new(
        registry: &'a FunctionRegistry,
        sheets: &'a dyn SheetResolver,
        values: &'a dyn ValueSource,
        cell: CellKey,
    ) -> Self {
        Self {
            registry,
            values,
            resolver: ReferenceResolver::new(sheets, cell),
            limits: EvalLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: EvalLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Cell being evaluated
    pub fn cell(&self) -> CellKey {
        self.resolver.anchor()
    }
}

/// Arguments of a lazy function, evaluated only on request
pub struct LazyArgs<'a, 'ctx> {
    ctx: &'a EvaluationContext<'ctx>,
    def: &'a FunctionDef,
    exprs: &'a [FormulaExpr],
    depth: usize,
}

impl<'a, 'ctx> LazyArgs<'a, 'ctx> {
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Evaluate argument `index`, coerced by its declared class
    pub fn arg(&self, index: usize) -> FormulaResult<FunctionArg> {
        let expr = self.exprs.get(index).ok_or_else(|| {
            FormulaError::function(&self.def.name, format!("no argument {}", index + 1))
        })?;
        let arg = eval_node(expr, self.ctx, self.depth)?;
        Ok(coerce_arg(arg, self.def.class_at(index)))
    }

    /// Evaluate argument `index` as a scalar
    pub fn value(&self, index: usize) -> FormulaResult<CellValue> {
        Ok(self.arg(index)?.into_value())
    }

    /// Cell being evaluated
    pub fn cell(&self) -> CellKey {
        self.ctx.cell()
    }
}

/// Evaluate a formula expression to a cell value.
///
/// A formula whose whole result is a range evaluates to `#VALUE`.
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<CellValue> {
    Ok(eval_node(expr, ctx, 0)?.into_value())
}

fn eval_node(expr: &FormulaExpr, ctx: &EvaluationContext, depth: usize) -> FormulaResult<FunctionArg> {
    if depth > ctx.limits.max_depth {
        return Ok(FunctionArg::Value(CellValue::Error(CellError::Error)));
    }

    let value = match expr {
        // === Literals ===
        FormulaExpr::Number(n) => CellValue::number(*n),
        FormulaExpr::Text(s) => CellValue::text(s),
        FormulaExpr::Boolean(b) => CellValue::Boolean(*b),
        FormulaExpr::Error(e) => CellValue::Error(*e),

        // === References ===
        FormulaExpr::CellRef(r) => match ctx.resolver.resolve_cell(r) {
            Ok(key) => ctx.values.cell_value(key),
            Err(e) => CellValue::Error(e),
        },
        FormulaExpr::RangeRef(r) => match ctx.resolver.resolve_range(r) {
            Ok(range) if range.cell_count() > ctx.limits.max_range_cells => {
                CellValue::Error(CellError::Error)
            }
            Ok(range) => return Ok(FunctionArg::Range(RangeValues::read(range, ctx.values))),
            Err(e) => CellValue::Error(e),
        },

        // === Operators ===
        FormulaExpr::UnaryOp { op, operand } => {
            let value = eval_scalar(operand, ctx, depth + 1)?;
            evaluate_unary_op(*op, value)
        }
        FormulaExpr::BinaryOp { op, left, right } => {
            let left = eval_scalar(left, ctx, depth + 1)?;
            let right = eval_scalar(right, ctx, depth + 1)?;
            evaluate_binary_op(*op, &left, &right)
        }

        // === Functions ===
        FormulaExpr::Function { name, args } => evaluate_function(name, args, ctx, depth)?,
    };

    Ok(FunctionArg::Value(value))
}

fn eval_scalar(expr: &FormulaExpr, ctx: &EvaluationContext, depth: usize) -> FormulaResult<CellValue> {
    Ok(eval_node(expr, ctx, depth)?.into_value())
}

fn evaluate_unary_op(op: UnaryOperator, value: CellValue) -> CellValue {
    if value.is_error() {
        return value;
    }
    match op {
        UnaryOperator::Plus => value,
        UnaryOperator::Negate => match to_number(&value) {
            Ok(n) => CellValue::number(-n),
            Err(e) => CellValue::Error(e),
        },
    }
}

fn evaluate_binary_op(op: BinaryOperator, left: &CellValue, right: &CellValue) -> CellValue {
    if let Some(e) = left.error().or_else(|| right.error()) {
        return CellValue::Error(e);
    }

    match op {
        BinaryOperator::Concat => {
            let mut s = left.to_text();
            s.push_str(&right.to_text());
            CellValue::text(s)
        }
        BinaryOperator::Equal => CellValue::Boolean(compare(left, right) == Ordering::Equal),
        BinaryOperator::NotEqual => CellValue::Boolean(compare(left, right) != Ordering::Equal),
        BinaryOperator::LessThan => CellValue::Boolean(compare(left, right) == Ordering::Less),
        BinaryOperator::LessEqual => CellValue::Boolean(compare(left, right) != Ordering::Greater),
        BinaryOperator::GreaterThan => {
            CellValue::Boolean(compare(left, right) == Ordering::Greater)
        }
        BinaryOperator::GreaterEqual => CellValue::Boolean(compare(left, right) != Ordering::Less),
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Power => {
            let (a, b) = match (to_number(left), to_number(right)) {
                (Ok(a), Ok(b)) => (a, b),
                (Err(e), _) | (_, Err(e)) => return CellValue::Error(e),
            };
            let result = match op {
                BinaryOperator::Add => a + b,
                BinaryOperator::Subtract => a - b,
                BinaryOperator::Multiply => a * b,
                BinaryOperator::Divide if b == 0.0 => return CellValue::Error(CellError::Div0),
                BinaryOperator::Divide => a / b,
                _ => a.powf(b),
            };
            CellValue::number(result)
        }
    }
}

/// Coerce an evaluated argument to the class a parameter declares
fn coerce_arg(arg: FunctionArg, class: ArgClass) -> FunctionArg {
    match arg {
        FunctionArg::Range(r) if class.accepts_range() => FunctionArg::Range(r),
        FunctionArg::Range(_) => FunctionArg::Value(CellValue::Error(CellError::Value)),
        FunctionArg::Value(v) if v.is_error() => FunctionArg::Value(v),
        FunctionArg::Value(v) => FunctionArg::Value(match class {
            ArgClass::Number | ArgClass::NumberOrRange => match to_number(&v) {
                Ok(n) => CellValue::Number(n),
                Err(e) => CellValue::Error(e),
            },
            ArgClass::Text => match v {
                CellValue::Text(_) => v,
                other => CellValue::text(other.to_text()),
            },
            ArgClass::Logical => match to_logical(&v) {
                Ok(b) => CellValue::Boolean(b),
                Err(e) => CellValue::Error(e),
            },
            ArgClass::Any | ArgClass::AnyOrRange => v,
        }),
    }
}

/// Evaluate a function call
fn evaluate_function(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
    depth: usize,
) -> FormulaResult<CellValue> {
    let Some(func) = ctx.registry.get(name) else {
        tracing::trace!(function = name, "unknown function");
        return Ok(CellValue::Error(CellError::Name));
    };

    // Check argument count
    if !func.accepts_arity(args.len()) {
        return Ok(CellValue::Error(CellError::Error));
    }

    let result = match &func.implementation {
        FunctionImpl::Eager(implementation) => {
            let mut evaluated = Vec::with_capacity(args.len());
            for (i, arg) in args.iter().enumerate() {
                let arg = coerce_arg(eval_node(arg, ctx, depth + 1)?, func.class_at(i));
                if !func.absorbs_errors {
                    // Scalars and every cell of a range alike
                    if let Some(e) = first_error(arg.values()) {
                        return Ok(CellValue::Error(e));
                    }
                }
                evaluated.push(arg);
            }
            let call = CallContext {
                name: &func.name,
                cell: ctx.cell(),
            };
            contain(ctx, &func.name, || implementation(&evaluated, &call))?
        }
        FunctionImpl::Lazy(implementation) => {
            let lazy = LazyArgs {
                ctx,
                def: func,
                exprs: args,
                depth: depth + 1,
            };
            contain(ctx, &func.name, || implementation(&lazy))?
        }
    };

    // Non-finite numbers from a plugin become #NUM like everywhere else
    Ok(match result {
        CellValue::Number(n) => CellValue::number(n),
        other => other,
    })
}

/// Run a function implementation, turning a panic into a fault when the
/// limits ask for it
fn contain(
    ctx: &EvaluationContext,
    name: &str,
    call: impl FnOnce() -> FormulaResult<CellValue>,
) -> FormulaResult<CellValue> {
    if !ctx.limits.catch_panics {
        return call();
    }
    catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|_| Err(FormulaError::Panicked(name.to_string())))
}

//! Logical functions
//!
//! IF, AND, OR and IFERROR are lazy: they evaluate only the arguments they
//! need, so `IF(A1>0, 1/A1, 0)` never divides by zero.

use super::{logical_arg, try_value};
use crate::coerce::to_logical;
use crate::error::FormulaResult;
use crate::evaluator::{CallContext, FunctionArg, LazyArgs};
use cellflow_core::CellValue;

pub fn fn_if(args: &LazyArgs) -> FormulaResult<CellValue> {
    match args.value(0)? {
        CellValue::Error(e) => Ok(CellValue::Error(e)),
        CellValue::Boolean(true) => args.value(1),
        _ if args.len() > 2 => args.value(2),
        _ => Ok(CellValue::Boolean(false)),
    }
}

pub fn fn_and(args: &LazyArgs) -> FormulaResult<CellValue> {
    fold_logical(args, false)
}

pub fn fn_or(args: &LazyArgs) -> FormulaResult<CellValue> {
    fold_logical(args, true)
}

/// Shared AND/OR walk. Stops at the first value equal to `decisive`.
///
/// Range cells that are text or empty are skipped; a direct text argument
/// must read TRUE/FALSE. With no logical values at all the result is
/// `#VALUE`.
fn fold_logical(args: &LazyArgs, decisive: bool) -> FormulaResult<CellValue> {
    let mut seen_any = false;
    for index in 0..args.len() {
        let arg = args.arg(index)?;
        let in_range = arg.is_range();
        for value in arg.values() {
            let b = match value {
                CellValue::Error(e) => return Ok(CellValue::Error(*e)),
                CellValue::Boolean(b) => *b,
                CellValue::Number(n) => *n != 0.0,
                CellValue::Text(_) if !in_range => try_value!(to_logical(value)),
                _ => continue,
            };
            seen_any = true;
            if b == decisive {
                return Ok(CellValue::Boolean(decisive));
            }
        }
    }

    if seen_any {
        Ok(CellValue::Boolean(!decisive))
    } else {
        Ok(CellValue::Error(cellflow_core::CellError::Value))
    }
}

pub fn fn_iferror(args: &LazyArgs) -> FormulaResult<CellValue> {
    match args.value(0)? {
        CellValue::Error(_) => args.value(1),
        value => Ok(value),
    }
}

pub fn fn_not(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let b = try_value!(logical_arg(args, 0));
    Ok(CellValue::Boolean(!b))
}

pub fn fn_true(_args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    Ok(CellValue::Boolean(true))
}

pub fn fn_false(_args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    Ok(CellValue::Boolean(false))
}

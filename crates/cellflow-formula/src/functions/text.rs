//! Text functions
//!
//! Lengths and positions count characters, not bytes.

use super::{number_arg, text_arg, try_value};
use crate::error::FormulaResult;
use crate::evaluator::{CallContext, FunctionArg};
use cellflow_core::{CellError, CellValue};

pub fn fn_concat(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let out: String = args
        .iter()
        .flat_map(FunctionArg::values)
        .map(CellValue::to_text)
        .collect();
    Ok(CellValue::text(out))
}

pub fn fn_len(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let s = try_value!(text_arg(args, 0));
    Ok(CellValue::Number(s.chars().count() as f64))
}

pub fn fn_upper(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let s = try_value!(text_arg(args, 0));
    Ok(CellValue::text(s.to_uppercase()))
}

pub fn fn_lower(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let s = try_value!(text_arg(args, 0));
    Ok(CellValue::text(s.to_lowercase()))
}

/// Strip leading and trailing whitespace and collapse inner runs to one space
pub fn fn_trim(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let s = try_value!(text_arg(args, 0));
    Ok(CellValue::text(s.split_whitespace().collect::<Vec<_>>().join(" ")))
}

/// Character count from the optional second argument, default 1
fn char_count(args: &[FunctionArg]) -> Result<usize, CellError> {
    if args.len() < 2 {
        return Ok(1);
    }
    let n = number_arg(args, 1)?.trunc();
    if n < 0.0 {
        return Err(CellError::Value);
    }
    Ok(n as usize)
}

pub fn fn_left(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let s = try_value!(text_arg(args, 0));
    let n = try_value!(char_count(args));
    Ok(CellValue::text(s.chars().take(n).collect::<String>()))
}

pub fn fn_right(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let s = try_value!(text_arg(args, 0));
    let n = try_value!(char_count(args));
    let len = s.chars().count();
    Ok(CellValue::text(
        s.chars().skip(len.saturating_sub(n)).collect::<String>(),
    ))
}

//! Math functions
//!
//! Aggregates take numbers and ranges. Scalar arguments arrive already
//! coerced to numbers; inside a range only number cells count. Error cells in
//! a range never get here: the evaluator returns the first one instead.

use super::{number_arg, try_value};
use crate::error::FormulaResult;
use crate::evaluator::{CallContext, FunctionArg};
use cellflow_core::{CellError, CellValue};

/// Numbers contributed by aggregate arguments
fn collect_numbers(args: &[FunctionArg]) -> Result<Vec<f64>, CellError> {
    let mut numbers = Vec::new();
    for arg in args {
        match arg {
            FunctionArg::Value(v) => numbers.push(crate::coerce::to_number(v)?),
            FunctionArg::Range(range) => {
                for v in range.values() {
                    if let CellValue::Number(n) = v {
                        numbers.push(*n);
                    }
                }
            }
        }
    }
    Ok(numbers)
}

pub fn fn_sum(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let numbers = try_value!(collect_numbers(args));
    Ok(CellValue::number(numbers.iter().sum()))
}

pub fn fn_product(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let numbers = try_value!(collect_numbers(args));
    if numbers.is_empty() {
        return Ok(CellValue::Number(0.0));
    }
    Ok(CellValue::number(numbers.iter().product()))
}

pub fn fn_average(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let numbers = try_value!(collect_numbers(args));
    if numbers.is_empty() {
        return Ok(CellValue::Error(CellError::Div0));
    }
    let sum: f64 = numbers.iter().sum();
    Ok(CellValue::number(sum / numbers.len() as f64))
}

pub fn fn_min(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let numbers = try_value!(collect_numbers(args));
    Ok(CellValue::number(
        numbers.into_iter().reduce(f64::min).unwrap_or(0.0),
    ))
}

pub fn fn_max(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let numbers = try_value!(collect_numbers(args));
    Ok(CellValue::number(
        numbers.into_iter().reduce(f64::max).unwrap_or(0.0),
    ))
}

/// Count number values, in ranges and in direct arguments
pub fn fn_count(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let count = args
        .iter()
        .flat_map(FunctionArg::values)
        .filter(|v| matches!(v, CellValue::Number(_)))
        .count();
    Ok(CellValue::Number(count as f64))
}

/// Count non-empty values, errors included
pub fn fn_counta(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let count = args
        .iter()
        .flat_map(FunctionArg::values)
        .filter(|v| !v.is_empty())
        .count();
    Ok(CellValue::Number(count as f64))
}

pub fn fn_abs(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let n = try_value!(number_arg(args, 0));
    Ok(CellValue::number(n.abs()))
}

pub fn fn_round(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let number = try_value!(number_arg(args, 0));
    let num_digits = try_value!(number_arg(args, 1)).trunc().clamp(-308.0, 308.0) as i32;

    // Negative digits round to the left of the decimal point
    let multiplier = 10_f64.powi(num_digits);
    let scaled = number * multiplier;

    // Past 2^52 every f64 is already whole; more digits than that change nothing
    if !scaled.is_finite() || scaled.abs() >= 4_503_599_627_370_496.0 {
        return Ok(CellValue::Number(number));
    }

    // f64::round goes half away from zero: 2.5 -> 3, -2.5 -> -3
    Ok(CellValue::number(scaled.round() / multiplier))
}

pub fn fn_int(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let n = try_value!(number_arg(args, 0));
    Ok(CellValue::number(n.floor()))
}

pub fn fn_mod(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let number = try_value!(number_arg(args, 0));
    let divisor = try_value!(number_arg(args, 1));

    if divisor == 0.0 {
        return Ok(CellValue::Error(CellError::Div0));
    }

    // The result takes the sign of the divisor
    let result = number - divisor * (number / divisor).floor();

    let valid = if divisor > 0.0 {
        result >= 0.0 && result < divisor
    } else {
        result <= 0.0 && result > divisor
    };

    if valid {
        Ok(CellValue::number(result))
    } else {
        // Floating point drift pushed the result out of range
        Ok(CellValue::Error(CellError::Num))
    }
}

pub fn fn_sqrt(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let n = try_value!(number_arg(args, 0));
    if n < 0.0 {
        return Ok(CellValue::Error(CellError::Num));
    }
    Ok(CellValue::number(n.sqrt()))
}

pub fn fn_power(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    let base = try_value!(number_arg(args, 0));
    let exponent = try_value!(number_arg(args, 1));
    if base == 0.0 && exponent < 0.0 {
        return Ok(CellValue::Error(CellError::Div0));
    }
    Ok(CellValue::number(base.powf(exponent)))
}

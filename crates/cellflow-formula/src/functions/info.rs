//! Information functions
//!
//! All of these look at error arguments instead of propagating them.

use super::scalar_arg;
use crate::error::FormulaResult;
use crate::evaluator::{CallContext, FunctionArg};
use cellflow_core::CellValue;

fn test_arg(args: &[FunctionArg], pred: fn(&CellValue) -> bool) -> FormulaResult<CellValue> {
    Ok(CellValue::Boolean(pred(&scalar_arg(args, 0))))
}

pub fn fn_iserror(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    test_arg(args, CellValue::is_error)
}

pub fn fn_isnumber(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    test_arg(args, |v| matches!(v, CellValue::Number(_)))
}

pub fn fn_istext(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    test_arg(args, |v| matches!(v, CellValue::Text(_)))
}

pub fn fn_isblank(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    test_arg(args, CellValue::is_empty)
}

pub fn fn_islogical(args: &[FunctionArg], _ctx: &CallContext) -> FormulaResult<CellValue> {
    test_arg(args, |v| matches!(v, CellValue::Boolean(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::CellKey;
    use cellflow_core::CellError;

    fn check(f: fn(&[FunctionArg], &CallContext) -> FormulaResult<CellValue>, value: CellValue) -> bool {
        let ctx = CallContext {
            name: "TEST",
            cell: CellKey::new(0, 0, 0),
        };
        f(&[FunctionArg::Value(value)], &ctx).unwrap() == CellValue::Boolean(true)
    }

    #[test]
    fn test_type_predicates() {
        assert!(check(fn_iserror, CellValue::Error(CellError::Div0)));
        assert!(!check(fn_iserror, CellValue::Number(1.0)));
        assert!(check(fn_isnumber, CellValue::Number(1.0)));
        assert!(!check(fn_isnumber, CellValue::text("1")));
        assert!(check(fn_istext, CellValue::text("1")));
        assert!(check(fn_isblank, CellValue::Empty));
        assert!(!check(fn_isblank, CellValue::text("")));
        assert!(check(fn_islogical, CellValue::Boolean(false)));
    }
}

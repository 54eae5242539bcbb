//! Function registry and built-in functions
//!
//! Functions are looked up by name, case-insensitively. Registering a name
//! that already exists replaces the earlier definition.

pub mod info;
pub mod logical;
pub mod math;
pub mod text;

use crate::coerce;
use crate::error::FormulaResult;
use crate::evaluator::{CallContext, FunctionArg, LazyArgs};
use ahash::AHashMap;
use cellflow_core::{CellError, CellValue};
use std::fmt;
use std::sync::Arc;

/// Eager implementation: receives every argument already evaluated
pub type EagerFn =
    Arc<dyn Fn(&[FunctionArg], &CallContext<'_>) -> FormulaResult<CellValue> + Send + Sync>;

/// Lazy implementation: evaluates arguments on demand (IF, AND, IFERROR)
pub type LazyFn = Arc<dyn Fn(&LazyArgs<'_, '_>) -> FormulaResult<CellValue> + Send + Sync>;

type BuiltinFn = fn(&[FunctionArg], &CallContext<'_>) -> FormulaResult<CellValue>;

/// Function implementation
#[derive(Clone)]
pub enum FunctionImpl {
    Eager(EagerFn),
    Lazy(LazyFn),
}

/// How an argument is coerced before the implementation sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgClass {
    /// Scalar coerced to a number
    Number,
    /// Scalar rendered as text
    Text,
    /// Scalar coerced to a boolean
    Logical,
    /// Range passed through, scalar coerced to a number
    NumberOrRange,
    /// Scalar passed through unchanged
    Any,
    /// Range or scalar, both passed through
    AnyOrRange,
}

impl ArgClass {
    /// Whether a range may be passed in this position
    pub fn accepts_range(&self) -> bool {
        matches!(self, ArgClass::NumberOrRange | ArgClass::AnyOrRange)
    }
}

/// Function definition
#[derive(Clone)]
pub struct FunctionDef {
    /// Function name as registered
    pub name: String,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Argument classes by position; the last one repeats
    pub params: Vec<ArgClass>,
    /// Receive error arguments instead of propagating them
    pub absorbs_errors: bool,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// Define a function whose arguments are evaluated before the call
    pub fn eager<F>(name: &str, min_args: usize, max_args: Option<usize>, f: F) -> Self
    where
        F: Fn(&[FunctionArg], &CallContext<'_>) -> FormulaResult<CellValue>
            + Send
            + Sync
            + 'static,
    {
        Self::with_impl(name, min_args, max_args, FunctionImpl::Eager(Arc::new(f)))
    }

    /// Define a function that evaluates its own arguments
    pub fn lazy<F>(name: &str, min_args: usize, max_args: Option<usize>, f: F) -> Self
    where
        F: Fn(&LazyArgs<'_, '_>) -> FormulaResult<CellValue> + Send + Sync + 'static,
    {
        Self::with_impl(name, min_args, max_args, FunctionImpl::Lazy(Arc::new(f)))
    }

    fn with_impl(
        name: &str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            name: name.to_string(),
            min_args,
            max_args,
            params: vec![ArgClass::Any],
            absorbs_errors: false,
            implementation,
        }
    }

    /// Declare argument classes; the last class applies to any further
    /// arguments
    pub fn with_params(mut self, params: &[ArgClass]) -> Self {
        if !params.is_empty() {
            self.params = params.to_vec();
        }
        self
    }

    /// Let error values reach the implementation
    pub fn absorbing_errors(mut self) -> Self {
        self.absorbs_errors = true;
        self
    }

    /// Same implementation under another name
    pub fn renamed(&self, name: &str) -> Self {
        let mut def = self.clone();
        def.name = name.to_string();
        def
    }

    /// Class of the argument at `index`
    pub fn class_at(&self, index: usize) -> ArgClass {
        self.params
            .get(index)
            .or_else(|| self.params.last())
            .copied()
            .unwrap_or(ArgClass::Any)
    }

    /// Whether `count` arguments are allowed
    pub fn accepts_arity(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.implementation {
            FunctionImpl::Eager(_) => "eager",
            FunctionImpl::Lazy(_) => "lazy",
        };
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("params", &self.params)
            .field("absorbs_errors", &self.absorbs_errors)
            .field("implementation", &kind)
            .finish()
    }
}

/// Function registry
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_info_functions();
        registry.register_text_functions();

        registry
    }

    /// Create a registry with no functions at all
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_ascii_uppercase())
    }

    /// Register a function, returning the definition it replaced
    pub fn register(&mut self, def: FunctionDef) -> Option<FunctionDef> {
        self.functions.insert(def.name.to_ascii_uppercase(), def)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names (upper case), sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn register_math_functions(&mut self) {
        use ArgClass::{AnyOrRange, Number, NumberOrRange};

        // Aggregates skip non-numeric range cells
        for (name, f) in [
            ("SUM", math::fn_sum as BuiltinFn),
            ("PRODUCT", math::fn_product),
            ("AVERAGE", math::fn_average),
            ("MIN", math::fn_min),
            ("MAX", math::fn_max),
        ] {
            self.register(FunctionDef::eager(name, 1, None, f).with_params(&[NumberOrRange]));
        }

        // COUNT and COUNTA look at errors instead of failing on them
        self.register(
            FunctionDef::eager("COUNT", 1, None, math::fn_count)
                .with_params(&[AnyOrRange])
                .absorbing_errors(),
        );
        self.register(
            FunctionDef::eager("COUNTA", 1, None, math::fn_counta)
                .with_params(&[AnyOrRange])
                .absorbing_errors(),
        );

        self.register(FunctionDef::eager("ABS", 1, Some(1), math::fn_abs).with_params(&[Number]));
        self.register(
            FunctionDef::eager("ROUND", 1, Some(2), math::fn_round).with_params(&[Number]),
        );
        self.register(FunctionDef::eager("INT", 1, Some(1), math::fn_int).with_params(&[Number]));
        self.register(FunctionDef::eager("MOD", 2, Some(2), math::fn_mod).with_params(&[Number]));
        self.register(
            FunctionDef::eager("SQRT", 1, Some(1), math::fn_sqrt).with_params(&[Number]),
        );
        self.register(
            FunctionDef::eager("POWER", 2, Some(2), math::fn_power).with_params(&[Number]),
        );
    }

    fn register_logical_functions(&mut self) {
        use ArgClass::{Any, AnyOrRange, Logical};

        self.register(
            FunctionDef::lazy("IF", 2, Some(3), logical::fn_if).with_params(&[Logical, Any]),
        );
        self.register(
            FunctionDef::lazy("AND", 1, None, logical::fn_and).with_params(&[AnyOrRange]),
        );
        self.register(FunctionDef::lazy("OR", 1, None, logical::fn_or).with_params(&[AnyOrRange]));
        self.register(
            FunctionDef::lazy("IFERROR", 2, Some(2), logical::fn_iferror)
                .with_params(&[Any])
                .absorbing_errors(),
        );
        self.register(
            FunctionDef::eager("NOT", 1, Some(1), logical::fn_not).with_params(&[Logical]),
        );
        self.register(FunctionDef::eager("TRUE", 0, Some(0), logical::fn_true));
        self.register(FunctionDef::eager("FALSE", 0, Some(0), logical::fn_false));
    }

    fn register_info_functions(&mut self) {
        for (name, f) in [
            ("ISERROR", info::fn_iserror as BuiltinFn),
            ("ISNUMBER", info::fn_isnumber),
            ("ISTEXT", info::fn_istext),
            ("ISBLANK", info::fn_isblank),
            ("ISLOGICAL", info::fn_islogical),
        ] {
            self.register(
                FunctionDef::eager(name, 1, Some(1), f)
                    .with_params(&[ArgClass::Any])
                    .absorbing_errors(),
            );
        }
    }

    fn register_text_functions(&mut self) {
        use ArgClass::{AnyOrRange, Number, Text};

        self.register(
            FunctionDef::eager("CONCAT", 1, None, text::fn_concat).with_params(&[AnyOrRange]),
        );
        self.register(FunctionDef::eager("LEN", 1, Some(1), text::fn_len).with_params(&[Text]));
        self.register(
            FunctionDef::eager("UPPER", 1, Some(1), text::fn_upper).with_params(&[Text]),
        );
        self.register(
            FunctionDef::eager("LOWER", 1, Some(1), text::fn_lower).with_params(&[Text]),
        );
        self.register(FunctionDef::eager("TRIM", 1, Some(1), text::fn_trim).with_params(&[Text]));
        self.register(
            FunctionDef::eager("LEFT", 1, Some(2), text::fn_left).with_params(&[Text, Number]),
        );
        self.register(
            FunctionDef::eager("RIGHT", 1, Some(2), text::fn_right).with_params(&[Text, Number]),
        );
    }
}

// === Argument helpers for implementations ===

/// Scalar argument at `index`; missing arguments read as empty
pub fn scalar_arg(args: &[FunctionArg], index: usize) -> CellValue {
    args.get(index)
        .cloned()
        .map_or(CellValue::Empty, FunctionArg::into_value)
}

/// Numeric argument at `index`
pub fn number_arg(args: &[FunctionArg], index: usize) -> Result<f64, CellError> {
    coerce::to_number(&scalar_arg(args, index))
}

/// Text argument at `index`
pub fn text_arg(args: &[FunctionArg], index: usize) -> Result<String, CellError> {
    coerce::to_text(&scalar_arg(args, index))
}

/// Boolean argument at `index`
pub fn logical_arg(args: &[FunctionArg], index: usize) -> Result<bool, CellError> {
    coerce::to_logical(&scalar_arg(args, index))
}

/// Unwrap a helper result inside an implementation, returning the error
/// value from the function on failure
macro_rules! try_value {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => return Ok(::cellflow_core::CellValue::Error(e)),
        }
    };
}
pub(crate) use try_value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::new();
        assert!(registry.contains("sum"));
        assert!(registry.contains("Sum"));
        assert_eq!(registry.get("iferror").map(|d| d.name.as_str()), Some("IFERROR"));
        assert!(registry.get("NOPE").is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = FunctionRegistry::empty();
        assert!(registry
            .register(FunctionDef::eager("one", 0, Some(0), |_, _| Ok(CellValue::Number(1.0))))
            .is_none());
        let replaced =
            registry.register(FunctionDef::eager("ONE", 0, Some(0), |_, _| Ok(CellValue::Number(2.0))));
        assert_eq!(replaced.map(|d| d.name), Some("one".to_string()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["ONE"]);
    }

    #[test]
    fn test_class_at_repeats_last() {
        let def = FunctionDef::eager("F", 0, None, |_, _| Ok(CellValue::Empty))
            .with_params(&[ArgClass::Logical, ArgClass::Number]);
        assert_eq!(def.class_at(0), ArgClass::Logical);
        assert_eq!(def.class_at(1), ArgClass::Number);
        assert_eq!(def.class_at(7), ArgClass::Number);
    }

    #[test]
    fn test_arity() {
        let registry = FunctionRegistry::new();
        let round = registry.get("ROUND").unwrap();
        assert!(!round.accepts_arity(0));
        assert!(round.accepts_arity(2));
        assert!(!round.accepts_arity(3));
        assert!(registry.get("SUM").unwrap().accepts_arity(255));
    }

    #[test]
    fn test_renamed_keeps_implementation() {
        let registry = FunctionRegistry::new();
        let soma = registry.get("SUM").unwrap().renamed("SOMA");
        assert_eq!(soma.name, "SOMA");
        assert_eq!(soma.params, vec![ArgClass::NumberOrRange]);
    }
}

//! Prelude module - common imports for cellflow users
//!
//! ```rust
//! use cellflow::prelude::*;
//! ```

pub use crate::{
    // Function contracts
    ArgClass,
    CallContext,
    // Cell types
    CellError,
    CellKey,
    CellValue,
    ChangeSet,
    // Main types
    Engine,
    EngineOptions,
    // Error types
    Error,
    FormulaError,
    FunctionArg,
    FunctionDef,
    LazyArgs,
    Result,
};

//! Console calculator core: infix and RPN evaluation with an `ans` register,
//! named variables, undo history and a plain text variable store.

pub mod commands;
pub mod engine;
pub mod error;
pub mod expr;
pub mod format;
pub mod logging;
pub mod store;

pub use engine::{fibonacci, ExpressionEngine};
pub use error::{CalcError, Result};

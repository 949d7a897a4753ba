//! Error kinds reported by the calculator core and the variable file store.
//!
//! Every failure is recoverable: the REPL prints it and reads the next line.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CalcError>;

#[derive(Error, Debug)]
pub enum CalcError {
    /// Malformed arithmetic input or an identifier with no value.
    #[error("{0}")]
    InvalidExpression(String),

    /// Input containing `^` that is not exactly `base^exponent`.
    #[error("Invalid exponent syntax '{0}', expected base^exponent")]
    InvalidExponentSyntax(String),

    /// RPN token that is neither a number nor a known operator.
    #[error("Unsupported operator '{0}'")]
    UnsupportedOperator(String),

    /// RPN operator applied with fewer than two operands on the stack.
    #[error("Not enough operands for '{0}'")]
    StackUnderflow(String),

    #[error("Division by zero!")]
    DivisionByZero,

    /// Variable name that is not all lowercase ASCII letters.
    #[error("Invalid variable name '{0}', use lowercase letters only")]
    InvalidName(String),

    #[error("Variable '{0}' not found")]
    VariableNotFound(String),

    #[error("File '{}' not found", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CalcError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        CalcError::InvalidExpression(message.into())
    }
}

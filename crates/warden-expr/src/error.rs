//! Error types for expression parsing and evaluation.

use thiserror::Error;

use crate::ast::MatchOp;
use crate::datum::FieldKind;

/// An expression could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} (at offset {position})")]
pub struct ParseError {
    /// Byte offset into the expression text.
    pub position: usize,
    /// What went wrong.
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// A parsed expression could not be applied to a datum.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    /// The selector does not name a field of the datum.
    #[error("selector {0:?} does not name a known field")]
    UnknownSelector(String),

    /// The operator is not defined for the field's kind.
    #[error("operator '{op}' cannot be applied to {kind} field {selector:?}")]
    Unsupported {
        selector: String,
        op: MatchOp,
        kind: FieldKind,
    },
}

//! Error types for the audit crate.

use thiserror::Error;
use warden_core::{ConfigError, NamespaceError};
use warden_expr::{EvalError, ParseError};

use crate::context::ContextError;

/// A filter expression was rejected at construction time.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Blank filter text.
    #[error("cannot create new audit filter with empty filter expression")]
    Empty,

    /// The expression does not parse.
    #[error("cannot create new audit filter {filter:?}: {source}")]
    Parse {
        filter: String,
        #[source]
        source: ParseError,
    },

    /// The expression parses but cannot be applied to audit fields.
    #[error("filter references an unsupported field: {filter}: {source}")]
    Unsupported {
        filter: String,
        #[source]
        source: EvalError,
    },
}

/// Errors that can occur while processing audit events.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Filter configuration was invalid.
    #[error("invalid filter parameter: {0}")]
    FilterParameter(#[from] FilterError),

    /// A node was handed something it cannot process.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The invocation was cancelled or ran past its deadline.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The namespace of the request could not be resolved.
    #[error("cannot obtain namespace: {0}")]
    Namespace(#[from] NamespaceError),

    /// A compiled filter could not be applied to an event.
    #[error("unable to evaluate filter {filter:?}: {source}")]
    Evaluation {
        filter: String,
        #[source]
        source: EvalError,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A sink failed to write.
    #[error("sink '{sink}' failed: {source}")]
    Sink {
        sink: String,
        #[source]
        source: std::io::Error,
    },

    /// A pipeline was assembled incorrectly.
    #[error("invalid pipeline '{id}': {reason}")]
    InvalidPipeline { id: String, reason: String },

    /// No pipeline is registered under the id.
    #[error("unknown pipeline '{0}'")]
    UnknownPipeline(String),

    /// Too few pipelines handled an event.
    #[error("audit event handled by {succeeded} of the required {required} devices")]
    ThresholdNotMet {
        required: usize,
        succeeded: usize,
        failures: Vec<PipelineFailure>,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// A pipeline that failed to handle an event.
#[derive(Debug)]
pub struct PipelineFailure {
    pub pipeline: String,
    pub error: AuditError,
}

impl AuditError {
    pub(crate) fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    /// Whether the error is a cancellation or an expired deadline.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, AuditError::Context(_))
    }

    /// Whether the error points at wiring rather than data.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            AuditError::InvalidParameter(_) | AuditError::InvalidPipeline { .. }
        )
    }

    /// Whether the error is a rejected filter configuration.
    pub fn is_filter_parameter(&self) -> bool {
        matches!(self, AuditError::FilterParameter(_))
    }
}

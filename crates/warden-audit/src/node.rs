//! Pipeline node abstraction.

use async_trait::async_trait;

use crate::context::ProcessContext;
use crate::error::AuditError;
use crate::event::Event;

/// Role of a node within a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Filter,
    Formatter,
    Sink,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filter => write!(f, "filter"),
            Self::Formatter => write!(f, "formatter"),
            Self::Sink => write!(f, "sink"),
        }
    }
}

/// A stage of an event pipeline.
///
/// `process` returns `Ok(Some(event))` to hand the event to the next node and
/// `Ok(None)` to stop the pipeline without error. Sinks always return
/// `Ok(None)` once they have written.
#[async_trait]
pub trait Node: Send + Sync {
    /// What kind of node this is.
    fn node_type(&self) -> NodeType;

    /// Process one event.
    async fn process(
        &self,
        ctx: &ProcessContext,
        event: Option<Event>,
    ) -> Result<Option<Event>, AuditError>;

    /// Reopen underlying resources, e.g. after log rotation.
    async fn reopen(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Take the event out of an `Option`, failing if there is none.
pub(crate) fn require_event(event: Option<Event>) -> Result<Event, AuditError> {
    event.ok_or_else(|| AuditError::invalid_parameter("event is nil"))
}

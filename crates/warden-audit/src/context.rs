//! Per-invocation process context.
//!
//! Everything a node may consult besides the event itself travels here
//! explicitly: the cancellation signal, an optional deadline and the namespace
//! the request layer resolved for the request.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use warden_core::{Namespace, NamespaceError};

/// The invocation should not proceed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("context canceled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Context for one pipeline invocation.
#[derive(Debug, Clone, Default)]
pub struct ProcessContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    namespace: Option<Namespace>,
}

impl ProcessContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the namespace the request ran under.
    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Use an existing cancellation token, e.g. a child of a server-wide one.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Fail if the invocation was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.cancel.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ContextError::DeadlineExceeded);
        }
        Ok(())
    }

    /// The namespace of the request.
    pub fn namespace(&self) -> Result<&Namespace, NamespaceError> {
        self.namespace.as_ref().ok_or(NamespaceError::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_is_live() {
        let ctx = ProcessContext::new();
        assert_eq!(ctx.check(), Ok(()));
        assert_eq!(ctx.namespace(), Err(NamespaceError::Missing));
    }

    #[test]
    fn test_cancelled() {
        let token = CancellationToken::new();
        let ctx = ProcessContext::new().with_cancellation(token.clone());
        token.cancel();
        assert_eq!(ctx.check(), Err(ContextError::Cancelled));
    }

    #[test]
    fn test_child_token_follows_parent() {
        let parent = CancellationToken::new();
        let ctx = ProcessContext::new().with_cancellation(parent.child_token());
        parent.cancel();
        assert_eq!(ctx.check(), Err(ContextError::Cancelled));
    }

    #[test]
    fn test_deadline_exceeded() {
        let ctx = ProcessContext::new().with_deadline(Instant::now());
        assert_eq!(ctx.check(), Err(ContextError::DeadlineExceeded));

        let ctx = ProcessContext::new().with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.check(), Ok(()));
    }

    #[test]
    fn test_namespace() {
        let ns = Namespace::new("ns1", "finance").unwrap();
        let ctx = ProcessContext::new().with_namespace(ns.clone());
        assert_eq!(ctx.namespace(), Ok(&ns));
    }
}

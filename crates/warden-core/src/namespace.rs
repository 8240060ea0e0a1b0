//! Namespaces.
//!
//! A namespace is the tenant-scoping path a request was made under. The audit
//! pipeline never derives it from an envelope; it is resolved by the request
//! layer and handed in explicitly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Id of the root namespace.
pub const ROOT_NAMESPACE_ID: &str = "root";

/// Errors from namespace resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NamespaceError {
    /// No namespace is associated with the request.
    #[error("no namespace")]
    Missing,

    /// The supplied path cannot name a namespace.
    #[error("invalid namespace path: {0:?}")]
    InvalidPath(String),
}

/// A resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    /// Stable namespace id.
    pub id: String,
    /// Canonical path: no leading `/`, trailing `/` unless root (empty).
    pub path: String,
}

impl Namespace {
    /// Create a namespace, canonicalizing the path.
    pub fn new(id: impl Into<String>, path: &str) -> Result<Self, NamespaceError> {
        Ok(Self {
            id: id.into(),
            path: canonicalize(path)?,
        })
    }

    /// The root namespace.
    pub fn root() -> Self {
        Self {
            id: ROOT_NAMESPACE_ID.to_string(),
            path: String::new(),
        }
    }

    /// Whether this is the root namespace.
    pub fn is_root(&self) -> bool {
        self.id == ROOT_NAMESPACE_ID
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", ROOT_NAMESPACE_ID)
        } else {
            write!(f, "{}", self.path)
        }
    }
}

/// Canonicalize a namespace path: trim whitespace and slashes at the start,
/// ensure exactly one trailing `/`, and reject empty segments.
pub fn canonicalize(path: &str) -> Result<String, NamespaceError> {
    let trimmed = path.trim().trim_start_matches('/').trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    if trimmed
        .split('/')
        .any(|segment| segment.is_empty() || segment.trim() != segment)
    {
        return Err(NamespaceError::InvalidPath(path.to_string()));
    }

    Ok(format!("{}/", trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize("finance").unwrap(), "finance/");
        assert_eq!(canonicalize("/finance/eu/").unwrap(), "finance/eu/");
        assert_eq!(canonicalize("  ").unwrap(), "");
        assert_eq!(canonicalize("/").unwrap(), "");
    }

    #[test]
    fn test_canonicalize_rejects_empty_segments() {
        assert_eq!(
            canonicalize("finance//eu"),
            Err(NamespaceError::InvalidPath("finance//eu".to_string()))
        );
    }

    #[test]
    fn test_root() {
        let root = Namespace::root();
        assert!(root.is_root());
        assert_eq!(root.path, "");
        assert_eq!(root.to_string(), "root");
    }
}

//! CLI command implementations for Warden.

pub mod check;
pub mod eval;
pub mod replay;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use warden_core::{Envelope, Namespace};

/// Read envelopes from a JSON Lines file, skipping blank lines.
///
/// Returns `(line number, envelope)` pairs, line numbers starting at 1.
pub(crate) fn read_envelopes(path: &Path) -> Result<Vec<(usize, Envelope)>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read envelopes from {}", path.display()))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            Envelope::from_json(line)
                .with_context(|| format!("{}:{}: invalid envelope", path.display(), index + 1))
                .map(|envelope| (index + 1, envelope))
        })
        .collect()
}

/// The namespace given on the command line; blank means root.
pub(crate) fn namespace_arg(path: &str) -> Result<Namespace> {
    if path.trim().is_empty() {
        return Ok(Namespace::root());
    }
    Namespace::new("cli", path).with_context(|| format!("invalid namespace '{path}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_envelopes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        fs::write(
            &path,
            "{\"id\":\"a\",\"event_type\":\"login\"}\n\n{\"id\":\"b\",\"event_type\":\"write\"}\n",
        )
        .unwrap();

        let envelopes = read_envelopes(&path).unwrap();
        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0].0, 1);
        assert_eq!(envelopes[1].0, 3);
        assert_eq!(envelopes[1].1.id, "b");
    }

    #[test]
    fn test_read_envelopes_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        fs::write(&path, "{\"id\":\"a\",\"event_type\":\"login\"}\nnot json\n").unwrap();

        let err = read_envelopes(&path).unwrap_err();
        assert!(format!("{err}").contains(":2: invalid envelope"));
    }

    #[test]
    fn test_namespace_arg() {
        assert!(namespace_arg("").unwrap().is_root());
        assert_eq!(namespace_arg("/finance").unwrap().path, "finance/");
        assert!(namespace_arg("a//b").is_err());
    }
}

//! `warden check` command implementation.
//!
//! Loads a configuration file and builds the pipeline of every audit device,
//! so a filter that would be rejected at startup is reported here instead.

use anyhow::{Result, bail};
use std::path::Path;

use warden_audit::{Evaluator, Pipeline};
use warden_core::WardenConfig;

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "OK"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Device the finding is about, if any.
    pub device: Option<String>,
    pub message: String,
}

impl CheckFinding {
    fn new(severity: Severity, device: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity,
            device: device.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Results from checking one configuration file.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .count()
    }

    pub fn print_summary(&self) {
        for finding in &self.findings {
            match &finding.device {
                Some(device) => println!("{:<5} {}: {}", finding.severity, device, finding.message),
                None => println!("{:<5} {}", finding.severity, finding.message),
            }
        }
        println!();
        if self.has_errors() {
            println!("{} error(s)", self.error_count());
        } else {
            println!("All devices OK");
        }
    }
}

/// Check a configuration file without printing anything.
pub fn check_config(path: &Path) -> CheckResults {
    let mut results = CheckResults::default();

    let config = match WardenConfig::load_with_context(path) {
        Ok(config) => config,
        Err(e) => {
            results
                .findings
                .push(CheckFinding::new(Severity::Error, None, e.to_string()));
            return results;
        }
    };

    if !config.audit.enabled {
        results.findings.push(CheckFinding::new(
            Severity::Warning,
            None,
            "auditing is disabled",
        ));
    }

    for device in &config.audit.devices {
        let name = Some(device.name.as_str());

        if !device.enabled {
            results
                .findings
                .push(CheckFinding::new(Severity::Warning, name, "device is disabled"));
            continue;
        }

        match Pipeline::from_device(device) {
            Ok(_) => {
                let message = match device.filter.as_deref().map(Evaluator::compile) {
                    Some(Ok(evaluator)) => format!(
                        "{} device, filter on {}: {}",
                        device.device_type,
                        evaluator.fields().join(", "),
                        evaluator.filter()
                    ),
                    Some(Err(e)) => {
                        results
                            .findings
                            .push(CheckFinding::new(Severity::Error, name, e.to_string()));
                        continue;
                    }
                    None => format!("{} device, no filter", device.device_type),
                };
                results
                    .findings
                    .push(CheckFinding::new(Severity::Info, name, message));
            }
            Err(e) => results
                .findings
                .push(CheckFinding::new(Severity::Error, name, e.to_string())),
        }
    }

    results
}

/// Run `warden check`.
pub fn run(path: &Path) -> Result<()> {
    let results = check_config(path);
    results.print_summary();

    if results.has_errors() {
        bail!(
            "{} has {} error(s)",
            path.display(),
            results.error_count()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.yaml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_valid_config() {
        let (_dir, path) = write_config(
            r#"
audit:
  devices:
    - name: ops
      type: file
      path: audit.log
      filter: 'mount_path == "secret/"'
    - name: debug
      type: stdout
      enabled: false
"#,
        );

        let results = check_config(&path);
        assert!(!results.has_errors());
        assert_eq!(results.findings.len(), 2);
        assert_eq!(results.findings[0].severity, Severity::Info);
        assert_eq!(
            results.findings[0].message,
            r#"file device, filter on mount_path: mount_path == "secret/""#
        );
        assert_eq!(results.findings[1].severity, Severity::Warning);
    }

    #[test]
    fn test_bad_filters_reported_per_device() {
        let (_dir, path) = write_config(
            r#"
audit:
  devices:
    - name: blank
      type: discard
      filter: "  "
    - name: unknown
      type: discard
      filter: 'colour == "blue"'
    - name: fine
      type: discard
"#,
        );

        let results = check_config(&path);
        assert_eq!(results.error_count(), 2);
        assert_eq!(results.findings[0].device.as_deref(), Some("blank"));
        assert!(results.findings[1].message.contains("colour"));
        assert!(run(&path).is_err());
    }

    #[test]
    fn test_unreadable_config() {
        let results = check_config(Path::new("/nonexistent/warden.yaml"));
        assert!(results.has_errors());
        assert!(results.findings[0].device.is_none());
    }
}

//! Configuration types for Warden.
//!
//! Configuration is loaded from a single YAML file:
//!
//! ```yaml
//! audit:
//!   success_threshold: 1
//!   devices:
//!     - name: compliance
//!       type: file
//!       path: /var/log/warden/audit.log
//!       format: json
//!       filter: 'namespace == "finance/" and mount_type == "kv"'
//! ```

pub mod audit;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use audit::{AuditConfig, DeviceConfig, DeviceType, FormatKind};

/// Complete Warden configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Audit device configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WardenConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration, resolve relative device paths against the
    /// directory of the config file, and validate it.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        for device in &mut config.audit.devices {
            if let Some(device_path) = &device.path {
                if device_path.is_relative() {
                    device.path = Some(base_dir.join(device_path));
                }
            }
        }

        config.audit.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
audit:
  success_threshold: 1
  devices:
    - name: compliance
      type: file
      path: logs/audit.log
      format: json
      prefix: "@cee: "
      filter: 'namespace == "finance/"'
    - name: console
      type: stdout
      format: line
"#;

    #[test]
    fn test_from_yaml() {
        let config = WardenConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.audit.devices.len(), 2);

        let compliance = &config.audit.devices[0];
        assert_eq!(compliance.device_type, DeviceType::File);
        assert_eq!(compliance.prefix.as_deref(), Some("@cee: "));
        assert_eq!(compliance.filter.as_deref(), Some(r#"namespace == "finance/""#));

        let console = &config.audit.devices[1];
        assert_eq!(console.format, FormatKind::Line);
        assert!(console.filter.is_none());
    }

    #[test]
    fn test_unknown_device_type() {
        let result = WardenConfig::from_yaml(
            "audit:\n  devices:\n    - name: x\n      type: socket\n",
        );
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_load_with_context_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("warden.yaml");
        let mut file = fs::File::create(&config_path).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = WardenConfig::load_with_context(&config_path).unwrap();
        let path = config.audit.devices[0].path.clone().unwrap();
        assert_eq!(path, dir.path().join("logs/audit.log"));
    }

    #[test]
    fn test_missing_file() {
        let result = WardenConfig::from_file("/nonexistent/warden.yaml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}

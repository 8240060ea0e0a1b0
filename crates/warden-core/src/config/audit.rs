//! Audit device configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use super::ConfigError;

/// Configuration for audit devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether auditing is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum number of devices that must handle an event without error
    /// for the event to count as audited.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: usize,

    /// Configured devices, one pipeline each.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// A single audit device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device name, also the pipeline id.
    pub name: String,

    /// Sink type.
    #[serde(rename = "type")]
    pub device_type: DeviceType,

    /// File path (for file devices).
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Rendering format.
    #[serde(default)]
    pub format: FormatKind,

    /// Prefix written before every rendered record.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Filter expression. Absent means every event reaches the device.
    #[serde(default)]
    pub filter: Option<String>,

    /// Whether the device is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Device sink type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Append to a file.
    File,
    /// Write to stdout.
    Stdout,
    /// Drop every record.
    Discard,
}

/// Record format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// One JSON document per record.
    #[default]
    Json,
    /// One human readable line per record.
    Line,
}

impl FormatKind {
    /// Key under which a formatter stores the rendered record.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatKind::Json => "json",
            FormatKind::Line => "line",
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::File => write!(f, "file"),
            DeviceType::Stdout => write!(f, "stdout"),
            DeviceType::Discard => write!(f, "discard"),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            success_threshold: default_success_threshold(),
            devices: Vec::new(),
        }
    }
}

impl AuditConfig {
    /// Devices that should be built into pipelines.
    pub fn enabled_devices(&self) -> impl Iterator<Item = &DeviceConfig> {
        self.devices.iter().filter(|d| d.enabled)
    }

    /// Structural validation. Filter expressions are validated when the
    /// pipeline is built, not here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for device in &self.devices {
            if device.name.trim().is_empty() {
                return Err(ConfigError::Config("device name cannot be empty".to_string()));
            }
            if !names.insert(device.name.as_str()) {
                return Err(ConfigError::Config(format!(
                    "duplicate device name '{}'",
                    device.name
                )));
            }
            if device.device_type == DeviceType::File && device.path.is_none() {
                return Err(ConfigError::Config(format!(
                    "file device '{}' requires a path",
                    device.name
                )));
            }
        }

        let enabled = self.enabled_devices().count();
        if self.enabled && enabled > 0 && self.success_threshold > enabled {
            return Err(ConfigError::Config(format!(
                "success_threshold {} exceeds the number of enabled devices ({})",
                self.success_threshold, enabled
            )));
        }

        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

fn default_success_threshold() -> usize {
    1
}

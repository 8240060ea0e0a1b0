//! # warden-core
//!
//! Data types shared by every Warden crate:
//!
//! - [`Envelope`]: the audit record handed to the pipeline by the request layer
//! - [`Namespace`]: the tenant-scoping path a request ran under
//! - [`config`]: YAML configuration for audit devices

pub mod config;
pub mod envelope;
pub mod namespace;

pub use config::{AuditConfig, ConfigError, DeviceConfig, DeviceType, FormatKind, WardenConfig};
pub use envelope::{Envelope, EnvelopeBuilder, PluginInfo};
pub use namespace::{Namespace, NamespaceError};

//! # warden-audit
//!
//! Audit event filtering pipelines for Warden.
//!
//! This crate provides:
//! - Projection of event envelopes onto a fixed set of filterable fields
//! - Filter nodes built from administrator supplied expressions, validated
//!   when the device is configured
//! - Formatter and sink nodes that render and write audit records
//! - Pipelines (one per audit device) and a broker that fans events out to them
//!
//! ## Pipeline Shape
//!
//! Every configured device becomes `[EntryFilter] -> EntryFormatter -> sink`.
//! A node either passes the event on, stops it without error (a filter that
//! did not match), or fails.
//!
//! ## Filter Fields
//!
//! | Field | Kind | Source |
//! |-------|------|--------|
//! | `namespace` | string | namespace of the request |
//! | `event_type` | string | envelope |
//! | `id` | string | envelope |
//! | `note` | string | envelope |
//! | `entity_ids` | list | envelope |
//! | `mount_class` / `mount_type` | string | plugin info |
//! | `mount_accessor` | string | plugin info |
//! | `mount_path` / `mount_point` | string | plugin info |
//! | `plugin` | string | plugin info |
//! | `plugin_version` | string | plugin info |
//! | `version` | string | plugin info |
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use warden_audit::{AuditEvent, Broker, ProcessContext};
//! use warden_core::{Envelope, Namespace, WardenConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WardenConfig::load_with_context("warden.yaml")?;
//! let broker = Broker::from_config(&config.audit)?;
//!
//! let ctx = ProcessContext::new().with_namespace(Namespace::new("ns1", "finance")?);
//! let envelope = Envelope::builder("evt-1", "kv-v2/data-write").build();
//! let status = broker.audit(&ctx, AuditEvent::request(envelope)).await?;
//! println!("delivered to {} devices", status.delivered);
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod context;
pub mod datum;
pub mod error;
pub mod event;
pub mod filter;
pub mod formatter;
pub mod node;
pub mod pipeline;
pub mod sink;

pub use broker::{Broker, BrokerStatus};
pub use context::{ContextError, ProcessContext};
pub use datum::{audit_schema, project};
pub use error::{AuditError, FilterError, PipelineFailure};
pub use event::{AUDIT_EVENT_TYPE, AUDIT_VERSION, AuditEvent, Event, Payload, Subtype};
pub use filter::{EntryFilter, Evaluator};
pub use formatter::EntryFormatter;
pub use node::{Node, NodeType};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use sink::{DiscardSink, FileSink, MemorySink, StdoutSink};

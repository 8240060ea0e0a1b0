//! Audit event types.
//!
//! An [`AuditEvent`] wraps the [`Envelope`] produced by the request layer with
//! the audit bookkeeping (id, version, subtype, timestamp). An [`Event`] is what
//! actually travels through a pipeline: the payload plus whatever formatters
//! have rendered so far.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;
use warden_core::Envelope;

/// Event type carried by audit events on the pipeline.
pub const AUDIT_EVENT_TYPE: &str = "audit";

/// Version of the audit event format.
pub const AUDIT_VERSION: &str = "v0.1";

/// Which half of an exchange the event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subtype {
    Request,
    Response,
}

impl std::fmt::Display for Subtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request => write!(f, "AUDIT_REQUEST"),
            Self::Response => write!(f, "AUDIT_RESPONSE"),
        }
    }
}

/// An audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub id: Uuid,

    /// Format version.
    pub version: String,

    /// Request or response.
    pub subtype: Subtype,

    /// When the event was created.
    pub timestamp: DateTime<Utc>,

    /// The envelope. Events without one carry nothing to audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Envelope>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(subtype: Subtype, data: Option<Envelope>) -> Self {
        Self {
            id: Uuid::new_v4(),
            version: AUDIT_VERSION.to_string(),
            subtype,
            timestamp: Utc::now(),
            data,
        }
    }

    pub fn request(envelope: Envelope) -> Self {
        Self::new(Subtype::Request, Some(envelope))
    }

    pub fn response(envelope: Envelope) -> Self {
        Self::new(Subtype::Response, Some(envelope))
    }

    /// Format the event as a human-readable log line.
    ///
    /// Format: `[timestamp] SUBTYPE audit_id=... id=... type=... [namespace=...] [mount=...]`
    ///
    /// Every envelope value is escaped, so a record is always exactly one line
    /// and a value cannot introduce extra `key=value` pairs.
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] {} audit_id={}",
            self.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.subtype,
            self.id,
        );

        let Some(data) = &self.data else {
            return line;
        };

        push_field(&mut line, "id", &data.id);
        push_field(&mut line, "type", &data.event_type);

        if !data.namespace.is_empty() {
            push_field(&mut line, "namespace", &data.namespace);
        }

        if let Some(info) = &data.plugin_info {
            if !info.mount_path.is_empty() {
                push_field(&mut line, "mount", &info.mount_path);
            }
            if !info.mount_class.is_empty() {
                push_field(&mut line, "class", &info.mount_class);
            }
            if !info.plugin.is_empty() {
                push_field(&mut line, "plugin", &info.plugin);
            }
        }

        if !data.entity_ids.is_empty() {
            let ids: Vec<_> = data.entity_ids.iter().map(|id| escape_value(id)).collect();
            line.push_str(&format!(" entities=[{}]", ids.join(",")));
        }

        if !data.note.is_empty() {
            line.push_str(&format!(" note=\"{}\"", escape_value(&data.note)));
        }

        line
    }
}

/// Append ` key=value`, quoting the value when it contains anything that
/// would read as a separator.
fn push_field(line: &mut String, key: &str, value: &str) {
    let escaped = escape_value(value);
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '=' | '[' | ']' | ','));
    if needs_quotes {
        line.push_str(&format!(" {key}=\"{escaped}\""));
    } else {
        line.push_str(&format!(" {key}={escaped}"));
    }
}

/// Escape backslashes, quotes, commas and control characters.
fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '"' | ',' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.extend(c.escape_default()),
            c => out.push(c),
        }
    }
    out
}

/// Payload of a pipeline event.
#[derive(Debug, Clone)]
pub enum Payload {
    /// An audit event. Shared, never mutated.
    Audit(Arc<AuditEvent>),
    /// Payload of some other subsystem sharing the pipeline.
    Raw(serde_json::Value),
}

/// An event travelling through a pipeline.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event type, [`AUDIT_EVENT_TYPE`] for audit events.
    pub event_type: String,

    /// When the event entered the pipeline.
    pub created_at: DateTime<Utc>,

    pub payload: Payload,

    formatted: BTreeMap<String, Vec<u8>>,
}

impl Event {
    /// Wrap an audit event.
    pub fn audit(event: AuditEvent) -> Self {
        Self {
            event_type: AUDIT_EVENT_TYPE.to_string(),
            created_at: Utc::now(),
            payload: Payload::Audit(Arc::new(event)),
            formatted: BTreeMap::new(),
        }
    }

    /// Wrap a payload that is not an audit event.
    pub fn raw(event_type: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            created_at: Utc::now(),
            payload: Payload::Raw(value),
            formatted: BTreeMap::new(),
        }
    }

    /// The audit event, if this is one.
    pub fn audit_payload(&self) -> Option<&Arc<AuditEvent>> {
        match &self.payload {
            Payload::Audit(event) => Some(event),
            Payload::Raw(_) => None,
        }
    }

    /// Rendered bytes for a format.
    pub fn formatted(&self, format: &str) -> Option<&[u8]> {
        self.formatted.get(format).map(Vec::as_slice)
    }

    /// Return the event with a rendered representation attached.
    pub fn with_formatted(mut self, format: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.formatted.insert(format.into(), bytes);
        self
    }
}

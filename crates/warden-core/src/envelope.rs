//! Audit event envelope.
//!
//! The envelope is the contract between the request layer that observes a
//! privileged operation and every node of the audit pipeline. It is plain,
//! serializable data: nodes read it, none of them rewrite it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Information about the plugin (mount) an event originated from.
///
/// Every field is optional; an empty string means "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// The kind of mount the event came from, e.g. `"auth"` or `"secret"`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mount_class: String,

    /// Unique accessor of the mount.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mount_accessor: String,

    /// Path the plugin is mounted at, e.g. `"secret/"`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mount_path: String,

    /// Plugin name, e.g. `"kv"`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub plugin: String,

    /// Plugin version, if the plugin is versioned.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub plugin_version: String,

    /// Version of the mount itself.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

static UNKNOWN_PLUGIN: PluginInfo = PluginInfo {
    mount_class: String::new(),
    mount_accessor: String::new(),
    mount_path: String::new(),
    plugin: String::new(),
    plugin_version: String::new(),
    version: String::new(),
};

/// A single audit-worthy occurrence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Identifier of the event. Two envelopes from the same source with the
    /// same id describe the same logical event.
    pub id: String,

    /// Non-secret, free-form metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,

    /// Identifiers (paths, UUIDs) of the entities the event relates to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_ids: Vec<String>,

    /// Human readable note.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,

    /// Namespace path the event occurred in, as reported by the producer.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// Event classification, e.g. `"kv-v2/data-write"`.
    pub event_type: String,

    /// Originating plugin, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_info: Option<PluginInfo>,
}

impl Envelope {
    /// Create an envelope with the required fields.
    pub fn new(id: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            ..Default::default()
        }
    }

    /// Create a builder for an envelope.
    pub fn builder(id: impl Into<String>, event_type: impl Into<String>) -> EnvelopeBuilder {
        EnvelopeBuilder {
            envelope: Self::new(id, event_type),
        }
    }

    /// Plugin info, or an all-empty value when the producer did not supply one.
    pub fn plugin_info_or_default(&self) -> &PluginInfo {
        self.plugin_info.as_ref().unwrap_or(&UNKNOWN_PLUGIN)
    }

    /// Parse an envelope from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Builder for [`Envelope`].
#[derive(Debug)]
pub struct EnvelopeBuilder {
    envelope: Envelope,
}

impl EnvelopeBuilder {
    /// Set the namespace path reported by the producer.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.envelope.namespace = namespace.into();
        self
    }

    /// Set the note.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.envelope.note = note.into();
        self
    }

    /// Append a related entity id.
    pub fn entity_id(mut self, id: impl Into<String>) -> Self {
        self.envelope.entity_ids.push(id.into());
        self
    }

    /// Insert a metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.envelope.metadata.insert(key.into(), value);
        self
    }

    /// Set the plugin info.
    pub fn plugin_info(mut self, info: PluginInfo) -> Self {
        self.envelope.plugin_info = Some(info);
        self
    }

    /// Build the envelope.
    pub fn build(self) -> Envelope {
        self.envelope
    }
}

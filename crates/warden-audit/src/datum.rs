//! Projection of envelopes onto the fields filters may reference.
//!
//! Filters never see an envelope directly. They see a flat [`Datum`] built
//! from a closed allow-list of fields, so the set of things an operator can
//! filter on is fixed and known when the filter is configured.

use std::sync::LazyLock;

use warden_core::Envelope;
use warden_expr::{Datum, FieldKind, Schema};

/// Field names available to filter expressions.
pub mod fields {
    pub const NAMESPACE: &str = "namespace";
    pub const EVENT_TYPE: &str = "event_type";
    pub const ID: &str = "id";
    pub const NOTE: &str = "note";
    pub const ENTITY_IDS: &str = "entity_ids";
    pub const MOUNT_CLASS: &str = "mount_class";
    pub const MOUNT_TYPE: &str = "mount_type";
    pub const MOUNT_ACCESSOR: &str = "mount_accessor";
    pub const MOUNT_PATH: &str = "mount_path";
    pub const MOUNT_POINT: &str = "mount_point";
    pub const PLUGIN: &str = "plugin";
    pub const PLUGIN_VERSION: &str = "plugin_version";
    pub const VERSION: &str = "version";
}

static AUDIT_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    use fields::*;

    Schema::new()
        .field(NAMESPACE, FieldKind::String)
        .field(EVENT_TYPE, FieldKind::String)
        .field(ID, FieldKind::String)
        .field(NOTE, FieldKind::String)
        .field(ENTITY_IDS, FieldKind::List)
        .field(MOUNT_CLASS, FieldKind::String)
        .field(MOUNT_TYPE, FieldKind::String)
        .field(MOUNT_ACCESSOR, FieldKind::String)
        .field(MOUNT_PATH, FieldKind::String)
        .field(MOUNT_POINT, FieldKind::String)
        .field(PLUGIN, FieldKind::String)
        .field(PLUGIN_VERSION, FieldKind::String)
        .field(VERSION, FieldKind::String)
});

/// The allow-list of audit filter fields.
pub fn audit_schema() -> &'static Schema {
    &AUDIT_SCHEMA
}

/// Build the filter datum for an envelope.
///
/// `namespace` is the path resolved by the request layer; the envelope's own
/// `namespace` field is ignored. Missing optional fields project to empty
/// values, so this never fails.
pub fn project(envelope: &Envelope, namespace: &str) -> Datum {
    use fields::*;

    let info = envelope.plugin_info_or_default();

    Datum::new()
        .with(NAMESPACE, namespace)
        .with(EVENT_TYPE, envelope.event_type.as_str())
        .with(ID, envelope.id.as_str())
        .with(NOTE, envelope.note.as_str())
        .with(ENTITY_IDS, envelope.entity_ids.clone())
        .with(MOUNT_CLASS, info.mount_class.as_str())
        .with(MOUNT_TYPE, info.mount_class.as_str())
        .with(MOUNT_ACCESSOR, info.mount_accessor.as_str())
        .with(MOUNT_PATH, info.mount_path.as_str())
        .with(MOUNT_POINT, info.mount_path.as_str())
        .with(PLUGIN, info.plugin.as_str())
        .with(PLUGIN_VERSION, info.plugin_version.as_str())
        .with(VERSION, info.version.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use warden_core::PluginInfo;
    use warden_expr::FieldValue;

    #[test]
    fn test_project_full_envelope() {
        let envelope = Envelope::builder("evt-1", "kv-v2/data-write")
            .namespace("ignored/")
            .entity_id("a")
            .plugin_info(PluginInfo {
                mount_class: "secret".to_string(),
                mount_path: "secret/".to_string(),
                plugin: "kv".to_string(),
                version: "v2".to_string(),
                ..Default::default()
            })
            .build();

        let datum = project(&envelope, "finance/");

        assert_eq!(datum.get(fields::NAMESPACE), Some(&FieldValue::from("finance/")));
        assert_eq!(datum.get(fields::MOUNT_PATH), Some(&FieldValue::from("secret/")));
        assert_eq!(datum.get(fields::MOUNT_POINT), Some(&FieldValue::from("secret/")));
        assert_eq!(datum.get(fields::MOUNT_TYPE), Some(&FieldValue::from("secret")));
        assert_eq!(
            datum.get(fields::ENTITY_IDS),
            Some(&FieldValue::List(vec!["a".to_string()]))
        );
        assert_eq!(datum.get(fields::PLUGIN_VERSION), Some(&FieldValue::from("")));
    }

    #[test]
    fn test_project_covers_schema_exactly() {
        let datum = project(&Envelope::new("evt", "login"), "");
        let projected: Vec<_> = datum.iter().map(|(name, _)| name).collect();
        let declared: Vec<_> = audit_schema().names().collect();
        assert_eq!(projected, declared);
    }

    #[test]
    fn test_project_without_plugin_info_is_zero_values() {
        let datum = project(&Envelope::new("evt", "login"), "");
        for name in [fields::MOUNT_CLASS, fields::MOUNT_PATH, fields::PLUGIN] {
            assert_eq!(datum.get(name), Some(&FieldValue::from("")));
        }
    }

    proptest! {
        #[test]
        fn prop_project_is_deterministic(
            id in "[a-z0-9-]{1,12}",
            ns in "([a-z]{1,6}/){0,3}",
            ids in proptest::collection::vec("[a-z/]{1,8}", 0..4),
        ) {
            let mut envelope = Envelope::new(id, "write");
            envelope.entity_ids = ids;
            prop_assert_eq!(project(&envelope, &ns), project(&envelope, &ns));
        }
    }
}

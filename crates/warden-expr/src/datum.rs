//! Flat field sets that expressions are evaluated against.

use std::collections::BTreeMap;

/// Kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A single string.
    String,
    /// An ordered list of strings.
    List,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::List => write!(f, "list"),
        }
    }
}

/// Value of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    String(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Kind of this value.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::String(_) => FieldKind::String,
            FieldValue::List(_) => FieldKind::List,
        }
    }

    /// The zero value of a kind.
    pub fn zero(kind: FieldKind) -> Self {
        match kind {
            FieldKind::String => FieldValue::String(String::new()),
            FieldKind::List => FieldValue::List(Vec::new()),
        }
    }

    /// Whether the value is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::String(s) => s.is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// A flat mapping from field names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Datum {
    fields: BTreeMap<String, FieldValue>,
}

impl Datum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder-style [`Datum::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// The closed set of fields an expression may reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: BTreeMap<String, FieldKind>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field.
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(name.into(), kind);
        self
    }

    /// Kind of a declared field.
    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.fields.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Declared field names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// A datum holding the zero value of every declared field.
    pub fn zero_datum(&self) -> Datum {
        let mut datum = Datum::new();
        for (name, kind) in &self.fields {
            datum.insert(name.clone(), FieldValue::zero(*kind));
        }
        datum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_datum_covers_schema() {
        let schema = Schema::new()
            .field("namespace", FieldKind::String)
            .field("entity_ids", FieldKind::List);

        let datum = schema.zero_datum();
        assert_eq!(datum.len(), 2);
        assert_eq!(datum.get("namespace"), Some(&FieldValue::String(String::new())));
        assert_eq!(datum.get("entity_ids"), Some(&FieldValue::List(vec![])));
        assert!(datum.iter().all(|(_, v)| v.is_empty()));
    }

    #[test]
    fn test_insert_replaces() {
        let datum = Datum::new().with("a", "1").with("a", "2");
        assert_eq!(datum.get("a"), Some(&FieldValue::from("2")));
    }

    #[test]
    fn test_schema_names_sorted() {
        let schema = Schema::new()
            .field("b", FieldKind::String)
            .field("a", FieldKind::List);
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(schema.kind_of("a"), Some(FieldKind::List));
        assert!(!schema.contains("c"));
    }
}

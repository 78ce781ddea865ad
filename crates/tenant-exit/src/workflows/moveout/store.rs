use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// A stored document, keyed by attribute name.
pub type Item = Map<String, Value>;

/// Logical tables held by the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    ExitRequests,
    DamageReports,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::ExitRequests => "TenantExitRequests",
            Self::DamageReports => "TenantDamageReports",
        }
    }

    pub fn primary_key(self) -> &'static str {
        match self {
            Self::ExitRequests => "request_id",
            Self::DamageReports => "report_id",
        }
    }

    /// Attribute indexed for per-tenant lookups.
    pub fn tenant_key(self) -> &'static str {
        "tenant_id"
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attribute that an entity allows to be changed after creation.
pub trait UpdatableField: Copy {
    fn attribute(self) -> &'static str;
}

/// Partial update whose keys can only come from an [`UpdatableField`] allow-list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    fields: BTreeMap<&'static str, Value>,
}

impl FieldUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<F: UpdatableField>(mut self, field: F, value: Value) -> Self {
        self.fields.insert(field.attribute(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn attributes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    pub fn into_fields(self) -> impl Iterator<Item = (&'static str, Value)> {
        self.fields.into_iter()
    }
}

/// Keyed persistence collaborator with put/query/scan/partial-update semantics.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put(&self, table: Table, item: Item) -> Result<(), StoreError>;

    async fn query_by_secondary_key(
        &self,
        table: Table,
        attribute: &str,
        value: &str,
    ) -> Result<Vec<Item>, StoreError>;

    async fn scan(&self, table: Table) -> Result<Vec<Item>, StoreError>;

    /// Merges `fields` into the existing item and returns the result.
    async fn update(
        &self,
        table: Table,
        primary_key: &str,
        fields: FieldUpdate,
    ) -> Result<Item, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record {key} already exists in {table}")]
    Conflict { table: Table, key: String },
    #[error("no record {key} in {table}")]
    NotFound { table: Table, key: String },
    #[error("record is missing primary key attribute `{0}`")]
    MissingKey(&'static str),
    #[error("stored record could not be decoded: {0}")]
    Corrupt(String),
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

pub fn encode<T: Serialize>(record: &T) -> Result<Item, StoreError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(item)) => Ok(item),
        Ok(other) => Err(StoreError::Corrupt(format!(
            "expected an object, got {other}"
        ))),
        Err(err) => Err(StoreError::Corrupt(err.to_string())),
    }
}

pub fn decode<T: DeserializeOwned>(item: Item) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(item)).map_err(|err| StoreError::Corrupt(err.to_string()))
}

pub fn decode_all<T: DeserializeOwned>(items: Vec<Item>) -> Result<Vec<T>, StoreError> {
    items.into_iter().map(decode).collect()
}

/// Extracts the string primary key of `item` for `table`.
pub fn primary_key_of(table: Table, item: &Item) -> Result<String, StoreError> {
    item.get(table.primary_key())
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(StoreError::MissingKey(table.primary_key()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Clone, Copy)]
    enum NoteField {
        Notes,
    }

    impl UpdatableField for NoteField {
        fn attribute(self) -> &'static str {
            match self {
                NoteField::Notes => "notes",
            }
        }
    }

    #[test]
    fn field_update_only_carries_allow_listed_attributes() {
        let update = FieldUpdate::new().set(NoteField::Notes, json!("checked"));
        assert!(!update.is_empty());
        assert_eq!(update.attributes().collect::<Vec<_>>(), vec!["notes"]);
        assert!(FieldUpdate::new().is_empty());
    }

    #[test]
    fn primary_key_must_be_a_string() {
        let mut item = Item::new();
        assert!(matches!(
            primary_key_of(Table::ExitRequests, &item),
            Err(StoreError::MissingKey("request_id"))
        ));
        item.insert("request_id".to_string(), json!("abc"));
        assert_eq!(
            primary_key_of(Table::ExitRequests, &item).expect("key present"),
            "abc"
        );
    }

    #[test]
    fn encode_rejects_non_objects() {
        assert!(matches!(encode(&"plain"), Err(StoreError::Corrupt(_))));
    }
}

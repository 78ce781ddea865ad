use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::store::{primary_key_of, FieldUpdate, Item, RecordStore, StoreError, Table};

/// Process-local record store. Items keep insertion order per table; concurrent
/// writers to the same key resolve last-write-wins.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<HashMap<Table, Vec<Item>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, table: Table) -> usize {
        self.tables.read().await.get(&table).map_or(0, Vec::len)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn put(&self, table: Table, item: Item) -> Result<(), StoreError> {
        let key = primary_key_of(table, &item)?;
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table).or_default();
        let exists = rows
            .iter()
            .any(|row| row.get(table.primary_key()).and_then(Value::as_str) == Some(key.as_str()));
        if exists {
            return Err(StoreError::Conflict { table, key });
        }
        rows.push(item);
        Ok(())
    }

    async fn query_by_secondary_key(
        &self,
        table: Table,
        attribute: &str,
        value: &str,
    ) -> Result<Vec<Item>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.get(attribute).and_then(Value::as_str) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn scan(&self, table: Table) -> Result<Vec<Item>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.get(&table).cloned().unwrap_or_default())
    }

    async fn update(
        &self,
        table: Table,
        primary_key: &str,
        fields: FieldUpdate,
    ) -> Result<Item, StoreError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .get_mut(&table)
            .and_then(|rows| {
                rows.iter_mut().find(|row| {
                    row.get(table.primary_key()).and_then(Value::as_str) == Some(primary_key)
                })
            })
            .ok_or_else(|| StoreError::NotFound {
                table,
                key: primary_key.to_string(),
            })?;

        for (attribute, value) in fields.into_fields() {
            row.insert(attribute.to_string(), value);
        }
        Ok(row.clone())
    }
}

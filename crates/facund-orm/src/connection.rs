//! The storage boundary.
//!
//! The mapper issues row-level operations (insert, update, delete, find,
//! select) against tables addressed by name and key field. What sits behind
//! [`DatabaseExecutor`] is an external collaborator's concern: SQL dialects,
//! pooling and retries all live on the far side of this trait. Errors cross
//! the boundary unchanged.
//!
//! [`MemoryBackend`] is the reference implementation: declared tables held
//! behind a lock, integer keys assigned on insert, [`SelectQuery`] evaluated
//! in process.

use crate::query::{SelectQuery, loose_eq};
use crate::record::Attributes;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

/// Storage failures, propagated unchanged to mapper callers.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("table `{0}` does not exist")]
    UnknownTable(String),

    #[error("no row in `{table}` with {key} = {value}")]
    RowNotFound {
        table: String,
        key: String,
        value: Value,
    },

    #[error("duplicate key {value} in `{table}`")]
    DuplicateKey { table: String, value: Value },

    #[error("storage failure: {0}")]
    Storage(String),
}

/// One storage row.
#[derive(Debug, Clone)]
pub struct Row {
    pub data: Attributes,
}

impl Row {
    pub fn new(data: Attributes) -> Self {
        Self { data }
    }
}

/// Row-level operations against a backing store.
#[async_trait]
pub trait DatabaseExecutor: Send + Sync {
    /// Inserts a row, assigning a key when the row does not carry one.
    /// Returns the stored row.
    async fn insert(
        &self,
        table: &str,
        key_field: &str,
        row: Attributes,
    ) -> Result<Row, BackendError>;

    /// Applies `changes` to the row addressed by `key`. Returns the stored
    /// row after the write.
    async fn update(
        &self,
        table: &str,
        key_field: &str,
        key: &Value,
        changes: Attributes,
    ) -> Result<Row, BackendError>;

    /// Removes the row addressed by `key`. Removing an absent row is not an
    /// error.
    async fn delete(&self, table: &str, key_field: &str, key: &Value) -> Result<(), BackendError>;

    /// Fetches the row addressed by `key`.
    async fn find(
        &self,
        table: &str,
        key_field: &str,
        key: &Value,
    ) -> Result<Option<Row>, BackendError>;

    /// Fetches every row matching the query.
    async fn select(&self, table: &str, query: &SelectQuery) -> Result<Vec<Row>, BackendError>;
}

#[derive(Debug, Default)]
struct MemoryTable {
    rows: Vec<Attributes>,
}

/// In-memory reference backend. Tables must be declared before use;
/// operations against undeclared tables surface as [`BackendError`], which is
/// also how tests exercise storage-failure propagation.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a set of empty tables.
    pub fn with_tables<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backend = Self::new();
        {
            let mut tables = backend.tables.write();
            for name in names {
                tables.insert(name.into(), MemoryTable::default());
            }
        }
        backend
    }

    pub fn declare_table(&self, name: impl Into<String>) {
        self.tables.write().entry(name.into()).or_default();
    }

    /// Loads rows verbatim, as if written by an external migration.
    pub fn seed(&self, table: &str, rows: Vec<Attributes>) -> Result<(), BackendError> {
        let mut tables = self.tables.write();
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))?;
        entry.rows.extend(rows);
        Ok(())
    }

    /// Snapshot of a table's raw rows, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Attributes> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    fn next_key(rows: &[Attributes], key_field: &str) -> i64 {
        rows.iter()
            .filter_map(|row| row.get(key_field).and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1
    }
}

#[async_trait]
impl DatabaseExecutor for MemoryBackend {
    async fn insert(
        &self,
        table: &str,
        key_field: &str,
        mut row: Attributes,
    ) -> Result<Row, BackendError> {
        let mut tables = self.tables.write();
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))?;

        let provided = row
            .get(key_field)
            .filter(|key| !matches!(key, Value::Null))
            .cloned();
        match provided {
            None => {
                let key = Self::next_key(&entry.rows, key_field);
                row.insert(key_field.to_string(), Value::from(key));
            }
            Some(key) => {
                if entry
                    .rows
                    .iter()
                    .any(|stored| stored.get(key_field).is_some_and(|k| loose_eq(k, &key)))
                {
                    return Err(BackendError::DuplicateKey {
                        table: table.to_string(),
                        value: key,
                    });
                }
            }
        }

        entry.rows.push(row.clone());
        Ok(Row::new(row))
    }

    async fn update(
        &self,
        table: &str,
        key_field: &str,
        key: &Value,
        changes: Attributes,
    ) -> Result<Row, BackendError> {
        let mut tables = self.tables.write();
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))?;

        let row = entry
            .rows
            .iter_mut()
            .find(|row| row.get(key_field).is_some_and(|k| loose_eq(k, key)))
            .ok_or_else(|| BackendError::RowNotFound {
                table: table.to_string(),
                key: key_field.to_string(),
                value: key.clone(),
            })?;

        for (field, value) in changes {
            row.insert(field, value);
        }
        Ok(Row::new(row.clone()))
    }

    async fn delete(&self, table: &str, key_field: &str, key: &Value) -> Result<(), BackendError> {
        let mut tables = self.tables.write();
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))?;

        entry
            .rows
            .retain(|row| !row.get(key_field).is_some_and(|k| loose_eq(k, key)));
        Ok(())
    }

    async fn find(
        &self,
        table: &str,
        key_field: &str,
        key: &Value,
    ) -> Result<Option<Row>, BackendError> {
        let tables = self.tables.read();
        let entry = tables
            .get(table)
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))?;

        Ok(entry
            .rows
            .iter()
            .find(|row| row.get(key_field).is_some_and(|k| loose_eq(k, key)))
            .map(|row| Row::new(row.clone())))
    }

    async fn select(&self, table: &str, query: &SelectQuery) -> Result<Vec<Row>, BackendError> {
        let tables = self.tables.read();
        let entry = tables
            .get(table)
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))?;

        Ok(query
            .apply(entry.rows.clone())
            .into_iter()
            .map(Row::new)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn insert_assigns_sequential_keys() {
        let backend = MemoryBackend::with_tables(["article"]);

        let first = backend
            .insert("article", "id", attrs(json!({"title": "a"})))
            .await
            .unwrap();
        let second = backend
            .insert("article", "id", attrs(json!({"title": "b"})))
            .await
            .unwrap();

        assert_eq!(first.data.get("id"), Some(&json!(1)));
        assert_eq!(second.data.get("id"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn insert_respects_and_guards_explicit_keys() {
        let backend = MemoryBackend::with_tables(["article"]);
        backend
            .insert("article", "id", attrs(json!({"id": 10, "title": "a"})))
            .await
            .unwrap();

        let err = backend
            .insert("article", "id", attrs(json!({"id": 10, "title": "b"})))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::DuplicateKey { .. }));

        // New assignments continue past the explicit key.
        let next = backend
            .insert("article", "id", attrs(json!({"title": "c"})))
            .await
            .unwrap();
        assert_eq!(next.data.get("id"), Some(&json!(11)));
    }

    #[tokio::test]
    async fn operations_against_undeclared_tables_fail() {
        let backend = MemoryBackend::new();
        let err = backend
            .insert("ghost", "id", Attributes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::UnknownTable(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn update_overlays_changes() {
        let backend = MemoryBackend::with_tables(["article"]);
        backend
            .seed("article", vec![attrs(json!({"id": 1, "title": "old"}))])
            .unwrap();

        let row = backend
            .update("article", "id", &json!(1), attrs(json!({"title": "new"})))
            .await
            .unwrap();
        assert_eq!(row.data.get("title"), Some(&json!("new")));

        let err = backend
            .update("article", "id", &json!(2), Attributes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::RowNotFound { .. }));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let backend = MemoryBackend::with_tables(["article"]);
        backend
            .seed("article", vec![attrs(json!({"id": 1}))])
            .unwrap();

        backend.delete("article", "id", &json!(1)).await.unwrap();
        backend.delete("article", "id", &json!(1)).await.unwrap();
        assert!(backend.rows("article").is_empty());
    }
}

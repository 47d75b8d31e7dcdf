//! ScanIndex - a secondary accessor that resolves records by scanning.
//!
//! Accessors are never installed automatically from attribute definitions;
//! callers register them on the store under the `by<field>` name that
//! `find_by`/`remove_by` look up.

use std::sync::Arc;

use serde_json::Value;
use tokio_stream::StreamExt;

use super::{BoxFuture, IndexAccessor, Item, KvStore, ReadOptions};
use crate::error::StoreError;

/// Resolves `field == value` by scanning every record in a store.
pub struct ScanIndex {
    store: Arc<dyn KvStore>,
    field: String,
}

impl ScanIndex {
    pub fn new(store: Arc<dyn KvStore>, field: impl Into<String>) -> Self {
        Self {
            store,
            field: field.into(),
        }
    }

    /// Accessor name under which `find_by(field, ..)` looks this index up.
    pub fn accessor_name(&self) -> String {
        format!("by{}", self.field).to_lowercase()
    }

    async fn lookup(&self, value: &Value) -> Result<(String, Value), StoreError> {
        let mut entries = self.store.create_read_stream(ReadOptions::new())?;
        while let Some(item) = entries.next().await {
            if let Item::Entry { key, value: record } = item? {
                if record.get(&self.field) == Some(value) {
                    return Ok((key, record));
                }
            }
        }
        Err(StoreError::NotFound(format!("{}={}", self.field, value)))
    }
}

impl IndexAccessor for ScanIndex {
    fn get<'a>(&'a self, value: &'a Value) -> BoxFuture<'a, Result<Value, StoreError>> {
        Box::pin(async move { self.lookup(value).await.map(|(_, record)| record) })
    }

    fn del<'a>(&'a self, value: &'a Value) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let (key, _) = self.lookup(value).await?;
            self.store.del(&key).await
        })
    }
}

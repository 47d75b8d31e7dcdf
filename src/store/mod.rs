//! KvStore - the key-value store contract models attach to.
//!
//! Every operation is optional: a store advertises what it can do through
//! [`KvStore::supports`], and the default method bodies fail with
//! [`StoreError::Unsupported`]. The trait is dyn-compatible so sublevels,
//! secondary accessors and remote proxies can all be handed around as
//! `Arc<dyn KvStore>`.

mod index;
mod memory;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_stream::Stream;

use crate::error::StoreError;

pub use index::ScanIndex;
pub use memory::{KeyGenerator, MemoryStore};

/// Boxed future returned by store operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Boxed stream of raw entries produced by read and live streams.
pub type EntryStream = Pin<Box<dyn Stream<Item = Result<Item<Value>, StoreError>> + Send + 'static>>;

/// Native store capabilities probed at attach time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Get,
    Put,
    Del,
    Batch,
    ReadStream,
    LiveStream,
    GenerateKey,
    Sublevel,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::Get,
        Capability::Put,
        Capability::Del,
        Capability::Batch,
        Capability::ReadStream,
        Capability::LiveStream,
        Capability::GenerateKey,
        Capability::Sublevel,
    ];
}

/// One item emitted by a store stream.
///
/// The shape depends on the `keys`/`values` read options: both gives
/// `Entry`, keys only gives `Key`, values only gives `Value`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Item<V> {
    Entry { key: String, value: V },
    Key(String),
    Value(V),
}

impl<V> Item<V> {
    /// Builds the item shape selected by the read options.
    pub fn shaped(opts: &ReadOptions, key: String, value: V) -> Self {
        match (opts.keys, opts.values) {
            (true, true) => Item::Entry { key, value },
            (true, false) => Item::Key(key),
            (false, _) => Item::Value(value),
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Item::Entry { key, .. } | Item::Key(key) => Some(key),
            Item::Value(_) => None,
        }
    }

    pub fn value(&self) -> Option<&V> {
        match self {
            Item::Entry { value, .. } | Item::Value(value) => Some(value),
            Item::Key(_) => None,
        }
    }

    pub fn into_value(self) -> Option<V> {
        match self {
            Item::Entry { value, .. } | Item::Value(value) => Some(value),
            Item::Key(_) => None,
        }
    }
}

impl Item<Value> {
    /// Rebuilds an item from its untagged wire form, using the read options
    /// that produced it to pick the shape.
    pub fn from_wire(opts: &ReadOptions, wire: Value) -> Result<Self, StoreError> {
        match (opts.keys, opts.values) {
            (true, true) => match wire {
                Value::Object(mut map) => {
                    let key = match map.remove("key") {
                        Some(Value::String(key)) => key,
                        _ => return Err(StoreError::Encoding("entry without key".into())),
                    };
                    let value = map.remove("value").unwrap_or(Value::Null);
                    Ok(Item::Entry { key, value })
                }
                _ => Err(StoreError::Encoding("expected an entry object".into())),
            },
            (true, false) => match wire {
                Value::String(key) => Ok(Item::Key(key)),
                _ => Err(StoreError::Encoding("expected a key string".into())),
            },
            (false, _) => Ok(Item::Value(wire)),
        }
    }
}

/// How a store persists a written value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueEncoding {
    /// Structured JSON.
    #[default]
    Json,
    /// A bare string, stored as its UTF-8 bytes.
    Utf8,
    /// A base64 string, stored as the decoded bytes.
    Binary,
}

/// Caller-facing write options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    #[serde(default)]
    pub sync: bool,
}

/// Options passed to a store's native put.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutOptions {
    #[serde(default)]
    pub value_encoding: ValueEncoding,
    #[serde(default)]
    pub sync: bool,
}

impl PutOptions {
    pub fn new(value_encoding: ValueEncoding, write: WriteOptions) -> Self {
        Self {
            value_encoding,
            sync: write.sync,
        }
    }
}

/// One operation of a bulk write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BatchOp {
    Put { key: String, value: Value },
    Del { key: String },
}

/// Options for read and live streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    pub keys: bool,
    pub values: bool,
    pub gt: Option<String>,
    pub gte: Option<String>,
    pub lt: Option<String>,
    pub lte: Option<String>,
    pub limit: Option<usize>,
    pub reverse: bool,
    /// Live streams only: replay existing entries before changes.
    pub old: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            keys: true,
            values: true,
            gt: None,
            gte: None,
            lt: None,
            lte: None,
            limit: None,
            reverse: false,
            old: true,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(mut self, keys: bool) -> Self {
        self.keys = keys;
        self
    }

    pub fn values(mut self, values: bool) -> Self {
        self.values = values;
        self
    }

    pub fn gte(mut self, key: impl Into<String>) -> Self {
        self.gte = Some(key.into());
        self
    }

    pub fn lt(mut self, key: impl Into<String>) -> Self {
        self.lt = Some(key.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn old(mut self, old: bool) -> Self {
        self.old = old;
        self
    }

    /// Whether the key falls inside the configured range.
    pub fn contains(&self, key: &str) -> bool {
        self.gt.as_deref().map_or(true, |b| key > b)
            && self.gte.as_deref().map_or(true, |b| key >= b)
            && self.lt.as_deref().map_or(true, |b| key < b)
            && self.lte.as_deref().map_or(true, |b| key <= b)
    }
}

fn unsupported<'a, T: Send + 'a>(op: &'static str) -> BoxFuture<'a, Result<T, StoreError>> {
    Box::pin(std::future::ready(Err(StoreError::Unsupported(op))))
}

/// Ordered key-value store contract.
pub trait KvStore: Send + Sync {
    /// Whether the store implements the capability.
    fn supports(&self, capability: Capability) -> bool;

    /// Client stores forward operations to a remote host instead of
    /// executing them locally.
    fn is_client(&self) -> bool {
        false
    }

    /// Point read. Absence is reported as [`StoreError::NotFound`].
    fn get<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<Value, StoreError>> {
        unsupported("get")
    }

    /// Point write.
    fn put<'a>(
        &'a self,
        _key: &'a str,
        _value: Value,
        _options: PutOptions,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        unsupported("put")
    }

    /// Write on behalf of an attachment that does not run its own
    /// pipeline. The executing side resolves a missing key; the record as
    /// stored is returned.
    fn forward_put<'a>(
        &'a self,
        key: Option<&'a str>,
        value: Value,
        options: PutOptions,
    ) -> BoxFuture<'a, Result<Value, StoreError>> {
        Box::pin(async move {
            let key = key.ok_or(StoreError::Unsupported("put without key"))?;
            self.put(key, value.clone(), options).await?;
            Ok(value)
        })
    }

    /// Point delete.
    fn del<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        unsupported("del")
    }

    /// Bulk write.
    fn batch<'a>(&'a self, _ops: Vec<BatchOp>) -> BoxFuture<'a, Result<(), StoreError>> {
        unsupported("batch")
    }

    /// Bounded snapshot stream of entries.
    fn create_read_stream(&self, _options: ReadOptions) -> Result<EntryStream, StoreError> {
        Err(StoreError::Unsupported("createReadStream"))
    }

    /// Unbounded change-feed stream.
    fn create_live_stream(&self, _options: ReadOptions) -> Result<EntryStream, StoreError> {
        Err(StoreError::Unsupported("createLiveStream"))
    }

    /// Synchronous key generator used when a write carries no key.
    fn generate_key(&self) -> Option<String> {
        None
    }

    /// Namespaced sub-store.
    fn sublevel(&self, _name: &str) -> Option<Arc<dyn KvStore>> {
        None
    }

    /// Secondary accessor registered under `name` (e.g. "byemail").
    fn index(&self, _name: &str) -> Option<Arc<dyn IndexAccessor>> {
        None
    }
}

/// Secondary accessor resolving records by an attribute value.
pub trait IndexAccessor: Send + Sync {
    fn get<'a>(&'a self, value: &'a Value) -> BoxFuture<'a, Result<Value, StoreError>>;

    fn del<'a>(&'a self, value: &'a Value) -> BoxFuture<'a, Result<(), StoreError>>;
}

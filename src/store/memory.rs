//! MemoryStore - BTreeMap-backed ordered store for testing and development.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use super::{
    BatchOp, BoxFuture, Capability, EntryStream, IndexAccessor, Item, KvStore, PutOptions,
    ReadOptions, ValueEncoding,
};
use crate::error::StoreError;

/// Synchronous key generator.
pub type KeyGenerator = Arc<dyn Fn() -> String + Send + Sync>;

const CHANGE_CAPACITY: usize = 256;

/// Internal stored representation of a value.
struct Stored {
    bytes: Vec<u8>,
    encoding: ValueEncoding,
}

#[derive(Clone, Debug)]
struct Change {
    namespace: Vec<String>,
    key: String,
    value: Option<Value>,
}

struct Shared {
    namespaces: RwLock<BTreeMap<Vec<String>, BTreeMap<String, Stored>>>,
    indexes: RwLock<HashMap<(Vec<String>, String), Arc<dyn IndexAccessor>>>,
    changes: broadcast::Sender<Change>,
    sequence: AtomicU64,
}

/// In-memory ordered key-value store.
///
/// Clone-friendly via Arc: clones and sublevels share storage. Each handle
/// addresses one namespace; [`MemoryStore::scoped`] opens a nested one.
/// Capabilities can be switched off per handle with
/// [`MemoryStore::without`], which is how tests model limited stores.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
    namespace: Vec<String>,
    disabled: HashSet<Capability>,
    key_generator: Option<KeyGenerator>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("namespace", &self.namespace)
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl MemoryStore {
    /// Create a new empty store supporting every capability.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                namespaces: RwLock::new(BTreeMap::new()),
                indexes: RwLock::new(HashMap::new()),
                changes,
                sequence: AtomicU64::new(0),
            }),
            namespace: Vec::new(),
            disabled: HashSet::new(),
            key_generator: None,
        }
    }

    /// Returns a handle with the capability switched off.
    pub fn without(mut self, capability: Capability) -> Self {
        self.disabled.insert(capability);
        self
    }

    /// Returns a handle that generates keys with `generator`.
    pub fn with_key_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.key_generator = Some(Arc::new(generator));
        self
    }

    /// Open a nested namespace sharing this store's storage.
    pub fn scoped(&self, name: &str) -> MemoryStore {
        let mut namespace = self.namespace.clone();
        namespace.push(name.to_string());
        MemoryStore {
            shared: Arc::clone(&self.shared),
            namespace,
            disabled: self.disabled.clone(),
            key_generator: self.key_generator.clone(),
        }
    }

    /// Register a secondary accessor (e.g. "byemail") on this namespace.
    pub fn register_index(
        &self,
        name: impl Into<String>,
        accessor: Arc<dyn IndexAccessor>,
    ) -> Result<(), StoreError> {
        let mut indexes = self
            .shared
            .indexes
            .write()
            .map_err(|_| StoreError::LockPoisoned("register_index"))?;
        indexes.insert((self.namespace.clone(), name.into()), accessor);
        Ok(())
    }

    /// Number of entries in this namespace.
    pub fn len(&self) -> usize {
        let namespaces = self
            .shared
            .namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        namespaces.get(&self.namespace).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self, capability: Capability, op: &'static str) -> Result<(), StoreError> {
        if self.disabled.contains(&capability) {
            return Err(StoreError::Unsupported(op));
        }
        Ok(())
    }

    fn notify(&self, key: String, value: Option<Value>) {
        // No live streams open is not an error.
        let _ = self.shared.changes.send(Change {
            namespace: self.namespace.clone(),
            key,
            value,
        });
    }

    fn snapshot(&self, options: &ReadOptions) -> Result<Vec<Result<Item<Value>, StoreError>>, StoreError> {
        let namespaces = self
            .shared
            .namespaces
            .read()
            .map_err(|_| StoreError::LockPoisoned("createReadStream"))?;

        let Some(entries) = namespaces.get(&self.namespace) else {
            return Ok(Vec::new());
        };

        let matching = entries.iter().filter(|(key, _)| options.contains(key));
        let ordered: Box<dyn Iterator<Item = (&String, &Stored)>> = if options.reverse {
            Box::new(matching.rev())
        } else {
            Box::new(matching)
        };

        Ok(ordered
            .take(options.limit.unwrap_or(usize::MAX))
            .map(|(key, stored)| {
                decode(stored).map(|value| Item::shaped(options, key.clone(), value))
            })
            .collect())
    }

    fn next_key(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let seq = self.shared.sequence.fetch_add(1, Ordering::SeqCst);
        format!("{:012x}{:06x}", millis, seq)
    }
}

fn encode(value: &Value, encoding: ValueEncoding) -> Result<Stored, StoreError> {
    let bytes = match encoding {
        ValueEncoding::Json => {
            serde_json::to_vec(value).map_err(|e| StoreError::Encoding(e.to_string()))?
        }
        ValueEncoding::Utf8 => match value {
            Value::String(s) => s.as_bytes().to_vec(),
            other => {
                return Err(StoreError::Encoding(format!(
                    "utf8 encoding expects a string, got {}",
                    other
                )))
            }
        },
        ValueEncoding::Binary => match value {
            Value::String(s) => BASE64
                .decode(s)
                .map_err(|e| StoreError::Encoding(e.to_string()))?,
            other => {
                return Err(StoreError::Encoding(format!(
                    "binary encoding expects a base64 string, got {}",
                    other
                )))
            }
        },
    };
    Ok(Stored { bytes, encoding })
}

fn decode(stored: &Stored) -> Result<Value, StoreError> {
    match stored.encoding {
        ValueEncoding::Json => {
            serde_json::from_slice(&stored.bytes).map_err(|e| StoreError::Encoding(e.to_string()))
        }
        ValueEncoding::Utf8 => String::from_utf8(stored.bytes.clone())
            .map(Value::String)
            .map_err(|e| StoreError::Encoding(e.to_string())),
        ValueEncoding::Binary => Ok(Value::String(BASE64.encode(&stored.bytes))),
    }
}

impl KvStore for MemoryStore {
    fn supports(&self, capability: Capability) -> bool {
        !self.disabled.contains(&capability)
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Value, StoreError>> {
        Box::pin(async move {
            self.check(Capability::Get, "get")?;
            let namespaces = self
                .shared
                .namespaces
                .read()
                .map_err(|_| StoreError::LockPoisoned("get"))?;

            match namespaces.get(&self.namespace).and_then(|m| m.get(key)) {
                Some(stored) => decode(stored),
                None => Err(StoreError::NotFound(key.to_string())),
            }
        })
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: Value,
        options: PutOptions,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.check(Capability::Put, "put")?;
            let stored = encode(&value, options.value_encoding)?;
            {
                let mut namespaces = self
                    .shared
                    .namespaces
                    .write()
                    .map_err(|_| StoreError::LockPoisoned("put"))?;
                namespaces
                    .entry(self.namespace.clone())
                    .or_default()
                    .insert(key.to_string(), stored);
            }
            self.notify(key.to_string(), Some(value));
            Ok(())
        })
    }

    fn del<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.check(Capability::Del, "del")?;
            let removed = {
                let mut namespaces = self
                    .shared
                    .namespaces
                    .write()
                    .map_err(|_| StoreError::LockPoisoned("del"))?;
                namespaces
                    .get_mut(&self.namespace)
                    .and_then(|m| m.remove(key))
                    .is_some()
            };
            if removed {
                self.notify(key.to_string(), None);
            }
            Ok(())
        })
    }

    fn batch<'a>(&'a self, ops: Vec<BatchOp>) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.check(Capability::Batch, "batch")?;

            // Encode everything up front so a bad value aborts the whole batch.
            let mut prepared = Vec::with_capacity(ops.len());
            for op in ops {
                match op {
                    BatchOp::Put { key, value } => {
                        let stored = encode(&value, ValueEncoding::Json)?;
                        prepared.push((key, Some((stored, value))));
                    }
                    BatchOp::Del { key } => prepared.push((key, None)),
                }
            }

            let mut changes = Vec::with_capacity(prepared.len());
            {
                let mut namespaces = self
                    .shared
                    .namespaces
                    .write()
                    .map_err(|_| StoreError::LockPoisoned("batch"))?;
                let entries = namespaces.entry(self.namespace.clone()).or_default();
                for (key, op) in prepared {
                    match op {
                        Some((stored, value)) => {
                            entries.insert(key.clone(), stored);
                            changes.push((key, Some(value)));
                        }
                        None => {
                            if entries.remove(&key).is_some() {
                                changes.push((key, None));
                            }
                        }
                    }
                }
            }

            for (key, value) in changes {
                self.notify(key, value);
            }
            Ok(())
        })
    }

    fn create_read_stream(&self, options: ReadOptions) -> Result<EntryStream, StoreError> {
        self.check(Capability::ReadStream, "createReadStream")?;
        let items = self.snapshot(&options)?;
        Ok(Box::pin(tokio_stream::iter(items)))
    }

    fn create_live_stream(&self, options: ReadOptions) -> Result<EntryStream, StoreError> {
        self.check(Capability::LiveStream, "createLiveStream")?;

        // Subscribe before taking the snapshot so no change falls in between.
        let rx = self.shared.changes.subscribe();
        let old = if options.old {
            self.snapshot(&options)?
        } else {
            Vec::new()
        };

        let namespace = self.namespace.clone();
        let live = BroadcastStream::new(rx).filter_map(move |change| match change {
            Ok(change) if change.namespace == namespace && options.contains(&change.key) => {
                let value = change.value.unwrap_or(Value::Null);
                Some(Ok(Item::shaped(&options, change.key, value)))
            }
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "live stream lagged behind store changes");
                None
            }
        });

        Ok(Box::pin(tokio_stream::iter(old).chain(live)))
    }

    fn generate_key(&self) -> Option<String> {
        if self.disabled.contains(&Capability::GenerateKey) {
            return None;
        }
        Some(match &self.key_generator {
            Some(generator) => generator(),
            None => self.next_key(),
        })
    }

    fn sublevel(&self, name: &str) -> Option<Arc<dyn KvStore>> {
        if self.disabled.contains(&Capability::Sublevel) {
            return None;
        }
        Some(Arc::new(self.scoped(name)))
    }

    fn index(&self, name: &str) -> Option<Arc<dyn IndexAccessor>> {
        let indexes = self.shared.indexes.read().ok()?;
        indexes
            .get(&(self.namespace.clone(), name.to_string()))
            .cloned()
    }
}

//! Method descriptors advertised to a remote-invocation layer.
//!
//! The table is derived from the store's capabilities when a model is
//! attached. Each entry tells a transport how to call the operation:
//! `async` is request/response, `readable` returns a stream.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::store::{Capability, KvStore};

pub const GET: &str = "get";
pub const PUT: &str = "put";
pub const DEL: &str = "del";
pub const BATCH: &str = "batch";
pub const CREATE_READ_STREAM: &str = "createReadStream";
pub const CREATE_LIVE_STREAM: &str = "createLiveStream";

/// Calling convention of a remote method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Async,
    Readable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    #[serde(rename = "type")]
    pub kind: MethodKind,
}

impl MethodDescriptor {
    pub const ASYNC: MethodDescriptor = MethodDescriptor {
        kind: MethodKind::Async,
    };
    pub const READABLE: MethodDescriptor = MethodDescriptor {
        kind: MethodKind::Readable,
    };
}

/// Remote-method descriptor table: operation name to descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodTable {
    methods: BTreeMap<String, MethodDescriptor>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, descriptor: MethodDescriptor) {
        self.methods.insert(name.to_string(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<MethodDescriptor> {
        self.methods.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn kind(&self, name: &str) -> Option<MethodKind> {
        self.get(name).map(|d| d.kind)
    }

    pub fn names(&self) -> Vec<&str> {
        self.methods.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, MethodDescriptor)> {
        self.methods.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Builds the descriptor table for a store.
///
/// Client stores forward their calls elsewhere, so only the stream methods
/// are advertised for them. Readonly models never advertise writes.
pub fn negotiate<S: KvStore + ?Sized>(store: &S, readonly: bool) -> MethodTable {
    let mut table = MethodTable::new();

    if !store.is_client() {
        if store.supports(Capability::Get) {
            table.register(GET, MethodDescriptor::ASYNC);
        }

        if !readonly {
            for (capability, name) in [
                (Capability::Del, DEL),
                (Capability::Put, PUT),
                (Capability::Batch, BATCH),
            ] {
                if store.supports(capability) {
                    table.register(name, MethodDescriptor::ASYNC);
                }
            }
        }
    }

    if store.supports(Capability::ReadStream) {
        table.register(CREATE_READ_STREAM, MethodDescriptor::READABLE);
    }
    if store.supports(Capability::LiveStream) {
        table.register(CREATE_LIVE_STREAM, MethodDescriptor::READABLE);
    }

    table
}

//! ClientStore - a `KvStore` that forwards every operation to a remote host.
//!
//! Attaching a model to a client store skips the local write pipeline; the
//! host's attachment validates writes instead.

use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio_stream::{Stream, StreamExt};

use super::error::RemoteError;
use super::host::{RemoteHost, RemoteRequest};
use crate::error::StoreError;
use crate::methods::{self, MethodTable};
use crate::model::Model;
use crate::store::{BatchOp, BoxFuture, Capability, EntryStream, Item, KvStore, PutOptions, ReadOptions, WriteOptions};

/// Stream of wire-encoded items from a readable method.
pub type WireStream = Pin<Box<dyn Stream<Item = Result<Value, RemoteError>> + Send + 'static>>;

/// Carries remote calls to a host.
pub trait Transport: Send + Sync {
    /// Fetch the host's advertised method table.
    fn methods(&self) -> BoxFuture<'_, Result<MethodTable, RemoteError>>;

    /// Call an `async` method.
    fn call(&self, request: RemoteRequest) -> BoxFuture<'_, Result<Value, RemoteError>>;

    /// Open a `readable` method.
    fn open(&self, request: RemoteRequest) -> Result<WireStream, RemoteError>;
}

/// In-process transport: calls the host directly.
pub struct LocalTransport<M, S: ?Sized> {
    host: Arc<RemoteHost<M, S>>,
}

impl<M, S: ?Sized> LocalTransport<M, S> {
    pub fn new(host: Arc<RemoteHost<M, S>>) -> Self {
        Self { host }
    }
}

impl<M: Model, S: KvStore + ?Sized + 'static> Transport for LocalTransport<M, S> {
    fn methods(&self) -> BoxFuture<'_, Result<MethodTable, RemoteError>> {
        let table = self.host.methods().clone();
        Box::pin(std::future::ready(Ok(table)))
    }

    fn call(&self, request: RemoteRequest) -> BoxFuture<'_, Result<Value, RemoteError>> {
        Box::pin(self.host.call(request))
    }

    fn open(&self, request: RemoteRequest) -> Result<WireStream, RemoteError> {
        let items = self.host.open(request)?;
        Ok(Box::pin(items.map(|item| -> Result<Value, RemoteError> {
            let item = item?;
            Ok(serde_json::to_value(&item)?)
        })))
    }
}

/// Store proxy whose capabilities mirror the host's method table.
pub struct ClientStore<T: ?Sized> {
    transport: Arc<T>,
    methods: MethodTable,
    path: Vec<String>,
}

impl<T: Transport + ?Sized + 'static> ClientStore<T> {
    /// Fetch the host's method table and build a client over `transport`.
    pub async fn connect(transport: Arc<T>) -> Result<Self, RemoteError> {
        let methods = transport.methods().await?;
        tracing::debug!(methods = ?methods.names(), "connected client store");
        Ok(Self {
            transport,
            methods,
            path: Vec::new(),
        })
    }

    /// The host's method table as fetched on connect.
    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    fn request(&self, method: &str, mut args: Value) -> RemoteRequest {
        if !self.path.is_empty() {
            if let Some(map) = args.as_object_mut() {
                map.insert("path".to_string(), json!(self.path));
            }
        }
        RemoteRequest::new(method, args)
    }

    async fn invoke(&self, method: &str, args: Value) -> Result<Value, StoreError> {
        let request = self.request(method, args);
        Ok(self.transport.call(request).await?)
    }

    fn stream(&self, method: &str, options: ReadOptions) -> Result<EntryStream, StoreError> {
        let request = self.request(method, json!({ "options": options }));
        let wire = self.transport.open(request)?;
        Ok(Box::pin(wire.map(move |item| -> Result<Item<Value>, StoreError> {
            let item = item.map_err(StoreError::from)?;
            Item::from_wire(&options, item)
        })))
    }
}

impl<T: Transport + ?Sized + 'static> KvStore for ClientStore<T> {
    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Get => self.methods.contains(methods::GET),
            Capability::Put => self.methods.contains(methods::PUT),
            Capability::Del => self.methods.contains(methods::DEL),
            Capability::Batch => self.methods.contains(methods::BATCH),
            Capability::ReadStream => self.methods.contains(methods::CREATE_READ_STREAM),
            Capability::LiveStream => self.methods.contains(methods::CREATE_LIVE_STREAM),
            Capability::GenerateKey => false,
            Capability::Sublevel => true,
        }
    }

    fn is_client(&self) -> bool {
        true
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Value, StoreError>> {
        Box::pin(self.invoke(methods::GET, json!({ "key": key })))
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: Value,
        options: PutOptions,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.forward_put(Some(key), value, options).await?;
            Ok(())
        })
    }

    fn forward_put<'a>(
        &'a self,
        key: Option<&'a str>,
        value: Value,
        options: PutOptions,
    ) -> BoxFuture<'a, Result<Value, StoreError>> {
        let write = WriteOptions { sync: options.sync };
        Box::pin(self.invoke(
            methods::PUT,
            json!({ "key": key, "value": value, "options": write }),
        ))
    }

    fn del<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.invoke(methods::DEL, json!({ "key": key })).await?;
            Ok(())
        })
    }

    fn batch<'a>(&'a self, ops: Vec<BatchOp>) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.invoke(methods::BATCH, json!({ "ops": ops })).await?;
            Ok(())
        })
    }

    fn create_read_stream(&self, options: ReadOptions) -> Result<EntryStream, StoreError> {
        self.stream(methods::CREATE_READ_STREAM, options)
    }

    fn create_live_stream(&self, options: ReadOptions) -> Result<EntryStream, StoreError> {
        self.stream(methods::CREATE_LIVE_STREAM, options)
    }

    fn sublevel(&self, name: &str) -> Option<Arc<dyn KvStore>> {
        let mut path = self.path.clone();
        path.push(name.to_string());
        Some(Arc::new(ClientStore {
            transport: Arc::clone(&self.transport),
            methods: self.methods.clone(),
            path,
        }))
    }
}

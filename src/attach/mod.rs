//! Attachment - binds a model type to a key-value store.
//!
//! An [`Attachment`] wraps a store handle: writes go through the model's
//! write pipeline, reads come back as model instances, and the store's
//! capabilities are published as a [`MethodTable`] for remote callers.
//! The store itself is never modified, so detaching simply hands the
//! original handle back.
//!
//! ## Example
//!
//! ```ignore
//! use kvmodel::{AttachExt, MemoryStore, WriteOptions};
//!
//! let store = Arc::new(MemoryStore::new());
//! let users = store.attach::<User>()?;
//!
//! let record = users.put(None, json!({ "name": "ada" }), WriteOptions::default()).await?;
//! let user = users.find(record["id"].as_str().unwrap()).await?;
//! ```

mod crud;
mod write;

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{AttachError, ModelError};
use crate::methods::{self, MethodTable};
use crate::model::Model;
use crate::store::{BatchOp, Capability, KvStore, ReadOptions, ValueEncoding};
use crate::stream::{ModelStream, ProjectionPolicy};

pub use crud::{ModelExt, Target};
pub use write::PutValue;

/// Attach-time configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttachOptions {
    /// Encoding the store is asked to persist records with.
    pub encoding: ValueEncoding,
    /// Treat the attachment as readonly even if the model is not.
    pub readonly: bool,
}

impl AttachOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encoding(mut self, encoding: ValueEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }
}

/// A model type bound to a store.
pub struct Attachment<M, S: ?Sized> {
    store: Option<Arc<S>>,
    methods: MethodTable,
    intercept: bool,
    readonly: bool,
    encoding: ValueEncoding,
    _model: PhantomData<fn() -> M>,
}

/// Attach model `M` to `store` with default options.
pub fn attach<M, S>(store: Arc<S>) -> Result<Attachment<M, S>, AttachError>
where
    M: Model,
    S: KvStore + ?Sized,
{
    attach_with(store, AttachOptions::default())
}

/// Attach model `M` to `store`.
///
/// Fails when the store has no sublevel support or the model has no
/// primary key. Writes are intercepted unless the store is a client proxy,
/// in which case the remote host validates them.
pub fn attach_with<M, S>(store: Arc<S>, options: AttachOptions) -> Result<Attachment<M, S>, AttachError>
where
    M: Model,
    S: KvStore + ?Sized,
{
    if !store.supports(Capability::Sublevel) {
        return Err(AttachError::SublevelRequired);
    }
    if M::PRIMARY_KEY.is_empty() {
        return Err(AttachError::MissingPrimaryKey {
            model: M::MODEL_NAME,
        });
    }

    let readonly = M::READONLY || options.readonly;
    let intercept = !store.is_client();
    let methods = methods::negotiate(store.as_ref(), readonly);

    for attribute in M::attributes().iter().filter(|a| a.indexed) {
        tracing::debug!(
            model = M::MODEL_NAME,
            attribute = attribute.name,
            "indexed attribute declared; accessors must be registered on the store"
        );
    }
    tracing::debug!(
        model = M::MODEL_NAME,
        intercept,
        readonly,
        methods = ?methods.names(),
        "attached model to store"
    );

    Ok(Attachment {
        store: Some(store),
        methods,
        intercept,
        readonly,
        encoding: options.encoding,
        _model: PhantomData,
    })
}

/// Extension trait for attaching models straight from a store handle.
pub trait AttachExt<S: KvStore + ?Sized> {
    fn attach<M: Model>(&self) -> Result<Attachment<M, S>, AttachError>;

    fn attach_with<M: Model>(&self, options: AttachOptions) -> Result<Attachment<M, S>, AttachError>;
}

impl<S: KvStore + ?Sized> AttachExt<S> for Arc<S> {
    fn attach<M: Model>(&self) -> Result<Attachment<M, S>, AttachError> {
        attach_with(Arc::clone(self), AttachOptions::default())
    }

    fn attach_with<M: Model>(&self, options: AttachOptions) -> Result<Attachment<M, S>, AttachError> {
        attach_with(Arc::clone(self), options)
    }
}

impl<M: Model, S: KvStore + ?Sized> Attachment<M, S> {
    /// Remote-method descriptors derived at attach time.
    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    pub fn is_attached(&self) -> bool {
        self.store.is_some()
    }

    /// Whether writes run through the local write pipeline.
    pub fn intercepts_writes(&self) -> bool {
        self.intercept
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn encoding(&self) -> ValueEncoding {
        self.encoding
    }

    /// The attached store handle.
    pub fn store(&self) -> Result<&Arc<S>, ModelError> {
        self.store.as_ref().ok_or(ModelError::Detached)
    }

    /// Detach from the store, returning the original handle.
    ///
    /// Only the first call returns the handle; later calls do nothing and
    /// return `None`. The method table is left as it was.
    pub fn detach(&mut self) -> Option<Arc<S>> {
        let store = self.store.take();
        if store.is_some() {
            tracing::debug!(model = M::MODEL_NAME, "detached model from store");
        }
        store
    }

    /// Raw point read.
    pub async fn get(&self, key: &str) -> Result<Value, ModelError> {
        Ok(self.store()?.get(key).await?)
    }

    /// Point delete, passed straight to the store.
    pub async fn del(&self, key: &str) -> Result<(), ModelError> {
        Ok(self.store()?.del(key).await?)
    }

    /// Bulk write, passed straight to the store.
    pub async fn batch(&self, ops: Vec<BatchOp>) -> Result<(), ModelError> {
        Ok(self.store()?.batch(ops).await?)
    }

    /// Stream every record as a model instance.
    ///
    /// `keys` and `values` are forced to `false`/`true`; range options are
    /// kept.
    pub fn query(&self, mut options: ReadOptions) -> Result<ModelStream<M>, ModelError> {
        let store = self.store()?;
        options.keys = false;
        options.values = true;
        let raw = store.create_read_stream(options)?;
        Ok(ModelStream::new(raw, ProjectionPolicy::values_only()))
    }

    /// Follow the store's change feed, projecting values into models.
    /// The projection follows the `keys`/`values` options.
    pub fn tail(&self, options: ReadOptions) -> Result<ModelStream<M>, ModelError> {
        let policy = ProjectionPolicy::from(&options);
        let raw = self.store()?.create_live_stream(options)?;
        Ok(ModelStream::new(raw, policy))
    }
}

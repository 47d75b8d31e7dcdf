//! CRUD operations on an attached model.

use std::sync::Arc;

use serde_json::Value;

use super::{Attachment, PutValue};
use crate::error::ModelError;
use crate::model::Model;
use crate::store::{BoxFuture, IndexAccessor, KvStore, WriteOptions};

/// What `remove` deletes: a key, or the record an instance is stored under.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a, M> {
    Key(&'a str),
    Model(&'a M),
}

impl<'a, M> From<&'a str> for Target<'a, M> {
    fn from(key: &'a str) -> Self {
        Target::Key(key)
    }
}

impl<'a, M: Model> From<&'a M> for Target<'a, M> {
    fn from(model: &'a M) -> Self {
        Target::Model(model)
    }
}

impl<M: Model, S: KvStore + ?Sized> Attachment<M, S> {
    /// Construct an instance from attributes. No I/O.
    pub fn create(&self, attrs: Value) -> Result<M, ModelError> {
        M::create(attrs)
    }

    /// Write the instance under its primary key and return the stored record.
    ///
    /// An instance without a primary key gets one from the store's
    /// generator, if it has one.
    pub async fn save(&self, model: &M) -> Result<Value, ModelError> {
        self.put(
            model.primary(),
            PutValue::Instance(model.clone()),
            WriteOptions::default(),
        )
        .await
    }

    /// Alias of [`Attachment::save`].
    pub async fn update(&self, model: &M) -> Result<Value, ModelError> {
        self.save(model).await
    }

    /// Delete by key or by an instance's primary key.
    pub async fn remove<'a>(&self, target: impl Into<Target<'a, M>>) -> Result<(), ModelError>
    where
        M: 'a,
    {
        let key = match target.into() {
            Target::Key(key) => key,
            Target::Model(model) => model.primary().ok_or(ModelError::PrimaryKeyRequired)?,
        };
        self.del(key).await
    }

    /// Point lookup by primary key.
    pub async fn find(&self, id: &str) -> Result<M, ModelError> {
        match self.store()?.get(id).await {
            Ok(raw) => M::create(raw),
            Err(e) if e.is_not_found() => Err(ModelError::NotFound {
                model: M::MODEL_NAME,
                id: id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Lookup through the `by<field>` secondary accessor.
    pub async fn find_by(&self, field: &str, value: impl Into<Value>) -> Result<M, ModelError> {
        let accessor = self.accessor(field)?;
        let raw = accessor.get(&value.into()).await?;
        M::create(raw)
    }

    /// Delete through the `by<field>` secondary accessor.
    pub async fn remove_by(&self, field: &str, value: impl Into<Value>) -> Result<(), ModelError> {
        let accessor = self.accessor(field)?;
        Ok(accessor.del(&value.into()).await?)
    }

    fn accessor(&self, field: &str) -> Result<Arc<dyn IndexAccessor>, ModelError> {
        let name = format!("by{}", field).to_lowercase();
        self.store()?
            .index(&name)
            .ok_or_else(|| ModelError::AttributeIndexMissing {
                model: M::MODEL_NAME,
                field: field.to_string(),
            })
    }
}

/// Instance-bound variants of the attachment's write operations.
///
/// ```ignore
/// let record = user.save(&users).await?;
/// user.remove(&users).await?;
/// ```
pub trait ModelExt: Model {
    fn save<'a, S>(&'a self, models: &'a Attachment<Self, S>) -> BoxFuture<'a, Result<Value, ModelError>>
    where
        S: KvStore + ?Sized + 'a,
    {
        Box::pin(models.save(self))
    }

    fn update<'a, S>(&'a self, models: &'a Attachment<Self, S>) -> BoxFuture<'a, Result<Value, ModelError>>
    where
        S: KvStore + ?Sized + 'a,
    {
        Box::pin(models.update(self))
    }

    fn remove<'a, S>(&'a self, models: &'a Attachment<Self, S>) -> BoxFuture<'a, Result<(), ModelError>>
    where
        S: KvStore + ?Sized + 'a,
    {
        Box::pin(models.remove(Target::Model(self)))
    }
}

impl<M: Model> ModelExt for M {}

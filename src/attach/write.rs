//! Write pipeline: key resolution, validation and serialization in front of
//! the store's native put.

use serde_json::{Map, Value};

use super::Attachment;
use crate::error::ModelError;
use crate::model::Model;
use crate::store::{Capability, KvStore, PutOptions, WriteOptions};

/// Value handed to [`Attachment::put`].
#[derive(Debug, Clone, PartialEq)]
pub enum PutValue<M> {
    /// An already-constructed instance, stored as-is.
    Instance(M),
    /// Raw attributes; the key is stamped onto the primary-key attribute
    /// before an instance is constructed.
    Raw(Value),
}

impl<M: Model> From<M> for PutValue<M> {
    fn from(model: M) -> Self {
        PutValue::Instance(model)
    }
}

impl<M: Model> From<Value> for PutValue<M> {
    fn from(value: Value) -> Self {
        PutValue::Raw(value)
    }
}

/// Copies the key onto the primary-key attribute. Without a key the
/// attribute is cleared so the store's generator can fill it in.
fn stamp_key<M: Model>(raw: &mut Value, key: Option<&str>) -> Result<(), ModelError> {
    if raw.is_null() {
        *raw = Value::Object(Map::new());
    }
    let Some(attrs) = raw.as_object_mut() else {
        return Err(ModelError::InvalidRecord {
            model: M::MODEL_NAME,
            reason: format!("expected an object, got {}", raw),
        });
    };
    match key {
        Some(key) => {
            attrs.insert(M::PRIMARY_KEY.to_string(), Value::String(key.to_string()));
        }
        None => {
            attrs.remove(M::PRIMARY_KEY);
        }
    }
    Ok(())
}

impl<M: Model, S: KvStore + ?Sized> Attachment<M, S> {
    /// Write a record through the model's pipeline.
    ///
    /// A supplied key must match the model's primary key. Without a key the
    /// store's generator assigns one. The model must pass validation. The
    /// stored record is returned. Nothing runs until the future is polled,
    /// and a rejected write never reaches the store.
    ///
    /// An empty key counts as no key.
    ///
    /// Client stores skip the pipeline: the value and key (or its absence)
    /// are forwarded as-is, and the remote host resolves the key and
    /// validates.
    pub async fn put(
        &self,
        key: Option<&str>,
        value: impl Into<PutValue<M>>,
        options: WriteOptions,
    ) -> Result<Value, ModelError> {
        let store = self.store()?;
        let key = key.filter(|k| !k.is_empty());
        let value = value.into();

        if !self.intercept {
            return self.forward(key, value, options).await;
        }

        let mut model = match value {
            PutValue::Instance(model) => model,
            PutValue::Raw(mut raw) => {
                stamp_key::<M>(&mut raw, key)?;
                M::create(raw)?
            }
        };

        let key = match key {
            Some(key) => {
                if model.primary() != Some(key) {
                    tracing::warn!(model = M::MODEL_NAME, key, "rejected write: primary key mismatch");
                    return Err(ModelError::PrimaryKeyMismatch {
                        expected: key.to_string(),
                        actual: model.primary().map(str::to_string),
                    });
                }
                key.to_string()
            }
            None => match self.generated_key() {
                Some(generated) => {
                    model.set_primary(generated.clone());
                    generated
                }
                None => {
                    tracing::warn!(model = M::MODEL_NAME, "rejected write: no key and no generator");
                    return Err(ModelError::PrimaryKeyRequired);
                }
            },
        };

        if let Err(reason) = model.validate() {
            tracing::warn!(model = M::MODEL_NAME, key = %key, %reason, "rejected write: invalid model");
            return Err(ModelError::InvalidModel {
                model: M::MODEL_NAME,
                reason,
            });
        }

        let record = model.to_record()?;
        store
            .put(&key, record.clone(), PutOptions::new(self.encoding, options))
            .await?;
        tracing::debug!(model = M::MODEL_NAME, key = %key, "stored record");
        Ok(record)
    }

    /// Convenience for [`Attachment::put`] with default write options.
    pub async fn put_record(&self, key: Option<&str>, value: impl Into<PutValue<M>>) -> Result<Value, ModelError> {
        self.put(key, value, WriteOptions::default()).await
    }

    fn generated_key(&self) -> Option<String> {
        let store = self.store.as_ref()?;
        if !store.supports(Capability::GenerateKey) {
            return None;
        }
        store.generate_key()
    }

    async fn forward(
        &self,
        key: Option<&str>,
        value: PutValue<M>,
        options: WriteOptions,
    ) -> Result<Value, ModelError> {
        let store = self.store()?;
        let record = match value {
            PutValue::Instance(model) => model.to_record()?,
            PutValue::Raw(raw) => raw,
        };

        let stored = store
            .forward_put(key, record, PutOptions::new(self.encoding, options))
            .await?;
        tracing::debug!(model = M::MODEL_NAME, key = ?key, "forwarded record to host");
        Ok(stored)
    }
}

//! ModelStream - lifts raw store stream items into model instances.

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio_stream::{Stream, StreamExt};

use crate::error::ModelError;
use crate::model::{is_absent, Model};
use crate::store::{EntryStream, Item, ReadOptions};

/// Which parts of each item the projection touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionPolicy {
    pub keys: bool,
    pub values: bool,
}

impl Default for ProjectionPolicy {
    fn default() -> Self {
        Self {
            keys: true,
            values: true,
        }
    }
}

impl From<&ReadOptions> for ProjectionPolicy {
    fn from(opts: &ReadOptions) -> Self {
        Self {
            keys: opts.keys,
            values: opts.values,
        }
    }
}

impl ProjectionPolicy {
    pub fn values_only() -> Self {
        Self {
            keys: false,
            values: true,
        }
    }

    pub fn keys_only() -> Self {
        Self {
            keys: true,
            values: false,
        }
    }

    fn is_keys_only(&self) -> bool {
        self.keys && !self.values
    }
}

fn lift<M: Model>(value: Value) -> Result<Option<M>, ModelError> {
    if is_absent(&value) {
        return Ok(None);
    }
    M::create(value).map(Some)
}

/// Projects one raw item according to the policy.
///
/// Keys-only items are forwarded without constructing anything. Under a
/// keys-only policy any value an item carries is dropped: an `Entry`
/// becomes `Key` and a `Value` becomes `Value(None)`.
pub fn project<M: Model>(
    policy: ProjectionPolicy,
    item: Item<Value>,
) -> Result<Item<Option<M>>, ModelError> {
    if policy.is_keys_only() {
        return Ok(match item {
            Item::Key(key) | Item::Entry { key, .. } => Item::Key(key),
            Item::Value(_) => Item::Value(None),
        });
    }

    Ok(match item {
        Item::Entry { key, value } => Item::Entry {
            key,
            value: lift(value)?,
        },
        Item::Value(value) => Item::Value(lift(value)?),
        Item::Key(key) => Item::Key(key),
    })
}

/// Stream of projected items.
///
/// The first error, whether from the store or from constructing a model,
/// is yielded and then the stream ends.
pub struct ModelStream<M> {
    inner: EntryStream,
    policy: ProjectionPolicy,
    done: bool,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> ModelStream<M> {
    pub fn new(inner: EntryStream, policy: ProjectionPolicy) -> Self {
        Self {
            inner,
            policy,
            done: false,
            _model: PhantomData,
        }
    }

    pub fn policy(&self) -> ProjectionPolicy {
        self.policy
    }

    /// Only the model instances, skipping keys and absent values.
    pub fn into_models(self) -> impl Stream<Item = Result<M, ModelError>> + Send {
        self.filter_map(|item| match item {
            Ok(item) => item.into_value().flatten().map(Ok),
            Err(e) => Some(Err(e)),
        })
    }
}

impl<M: Model> Stream for ModelStream<M> {
    type Item = Result<Item<Option<M>>, ModelError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                this.done = true;
                Poll::Ready(Some(Err(e.into())))
            }
            Poll::Ready(Some(Ok(item))) => {
                let projected = project::<M>(this.policy, item);
                if projected.is_err() {
                    this.done = true;
                }
                Poll::Ready(Some(projected))
            }
        }
    }
}

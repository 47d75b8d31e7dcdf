//! RemoteHost - dispatches remote method calls onto an attachment.
//!
//! Only methods present in the attachment's [`MethodTable`] are callable.
//! Calls on the root namespace go through the model (writes are validated
//! by the write pipeline); calls carrying a sublevel `path` run directly
//! against that namespace of the host's store.
//!
//! ## Example
//!
//! ```ignore
//! let host = RemoteHost::new(store.attach::<User>()?);
//! let record = host
//!     .call(RemoteRequest::new("put", json!({ "key": "u1", "value": { "name": "ada" } })))
//!     .await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::RemoteError;
use crate::attach::Attachment;
use crate::methods::{self, MethodKind, MethodTable};
use crate::model::Model;
use crate::store::{BatchOp, EntryStream, KvStore, PutOptions, ReadOptions, WriteOptions};

/// A remote method call: method name plus JSON arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

impl RemoteRequest {
    pub fn new(method: impl Into<String>, args: Value) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

/// Status plus JSON body, for transports that speak status codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: Value,
}

impl RemoteResponse {
    pub fn error(err: &RemoteError) -> Self {
        Self {
            status: err.status_code(),
            body: json!({ "error": err.to_string(), "code": err.code() }),
        }
    }
}

#[derive(Deserialize)]
struct KeyArgs {
    key: String,
    #[serde(default)]
    path: Vec<String>,
}

#[derive(Deserialize)]
struct PutArgs {
    #[serde(default)]
    key: Option<String>,
    value: Value,
    #[serde(default)]
    options: WriteOptions,
    #[serde(default)]
    path: Vec<String>,
}

#[derive(Deserialize)]
struct BatchArgs {
    ops: Vec<BatchOp>,
    #[serde(default)]
    path: Vec<String>,
}

#[derive(Deserialize)]
struct StreamArgs {
    #[serde(default)]
    options: ReadOptions,
    #[serde(default)]
    path: Vec<String>,
}

fn decode<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, RemoteError> {
    let args = if args.is_null() { json!({}) } else { args };
    Ok(serde_json::from_value(args)?)
}

/// Serves an attachment's advertised methods to remote callers.
pub struct RemoteHost<M, S: ?Sized> {
    models: Attachment<M, S>,
}

impl<M: Model, S: KvStore + ?Sized + 'static> RemoteHost<M, S> {
    pub fn new(models: Attachment<M, S>) -> Self {
        Self { models }
    }

    /// The advertised method table.
    pub fn methods(&self) -> &MethodTable {
        self.models.methods()
    }

    pub fn attachment(&self) -> &Attachment<M, S> {
        &self.models
    }

    fn check(&self, method: &str, kind: MethodKind) -> Result<(), RemoteError> {
        if self.methods().kind(method) == Some(kind) {
            return Ok(());
        }
        tracing::warn!(method, model = M::MODEL_NAME, "rejected call to unadvertised method");
        Err(RemoteError::UnknownMethod(method.to_string()))
    }

    fn namespace(&self, path: &[String]) -> Result<Option<Arc<dyn KvStore>>, RemoteError> {
        let Some((first, rest)) = path.split_first() else {
            return Ok(None);
        };
        let missing = || RemoteError::BadRequest(format!("no sublevel at {}", path.join("/")));

        let mut current = self.models.store()?.sublevel(first).ok_or_else(missing)?;
        for name in rest {
            current = current.sublevel(name).ok_or_else(missing)?;
        }
        Ok(Some(current))
    }

    /// Call an `async` (request/response) method.
    pub async fn call(&self, request: RemoteRequest) -> Result<Value, RemoteError> {
        let method = request.method.as_str();
        self.check(method, MethodKind::Async)?;
        tracing::debug!(method, model = M::MODEL_NAME, "remote call");

        match method {
            methods::GET => {
                let args: KeyArgs = decode(request.args)?;
                match self.namespace(&args.path)? {
                    Some(ns) => Ok(ns.get(&args.key).await?),
                    None => Ok(self.models.get(&args.key).await?),
                }
            }
            methods::PUT => {
                let args: PutArgs = decode(request.args)?;
                match self.namespace(&args.path)? {
                    Some(ns) => {
                        let key = args
                            .key
                            .ok_or_else(|| RemoteError::BadRequest("sublevel put needs a key".into()))?;
                        let options = PutOptions::new(self.models.encoding(), args.options);
                        ns.put(&key, args.value.clone(), options).await?;
                        Ok(args.value)
                    }
                    None => Ok(self
                        .models
                        .put(args.key.as_deref(), args.value, args.options)
                        .await?),
                }
            }
            methods::DEL => {
                let args: KeyArgs = decode(request.args)?;
                match self.namespace(&args.path)? {
                    Some(ns) => ns.del(&args.key).await?,
                    None => self.models.del(&args.key).await?,
                }
                Ok(Value::Null)
            }
            methods::BATCH => {
                let args: BatchArgs = decode(request.args)?;
                match self.namespace(&args.path)? {
                    Some(ns) => ns.batch(args.ops).await?,
                    None => self.models.batch(args.ops).await?,
                }
                Ok(Value::Null)
            }
            other => Err(RemoteError::UnknownMethod(other.to_string())),
        }
    }

    /// Open a `readable` (streaming) method. Items are raw store items;
    /// projection into models happens on the caller's side.
    pub fn open(&self, request: RemoteRequest) -> Result<EntryStream, RemoteError> {
        let method = request.method.as_str();
        self.check(method, MethodKind::Readable)?;
        tracing::debug!(method, model = M::MODEL_NAME, "remote stream opened");

        let args: StreamArgs = decode(request.args)?;
        let stream = match (method, self.namespace(&args.path)?) {
            (methods::CREATE_READ_STREAM, Some(ns)) => ns.create_read_stream(args.options)?,
            (methods::CREATE_READ_STREAM, None) => {
                self.models.store()?.create_read_stream(args.options)?
            }
            (methods::CREATE_LIVE_STREAM, Some(ns)) => ns.create_live_stream(args.options)?,
            (methods::CREATE_LIVE_STREAM, None) => {
                self.models.store()?.create_live_stream(args.options)?
            }
            (other, _) => return Err(RemoteError::UnknownMethod(other.to_string())),
        };
        Ok(stream)
    }

    /// Call an `async` method, folding the outcome into a status and body.
    pub async fn respond(&self, request: RemoteRequest) -> RemoteResponse {
        match self.call(request).await {
            Ok(body) => RemoteResponse { status: 200, body },
            Err(e) => RemoteResponse::error(&e),
        }
    }
}

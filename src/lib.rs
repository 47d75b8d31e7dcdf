//! kvmodel - typed models over ordered key-value stores.
//!
//! Attach a [`Model`] to any [`KvStore`] and get validated, keyed writes,
//! model-typed reads and streams, and a [`MethodTable`] describing what a
//! remote caller may invoke.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use kvmodel::{AttachExt, MemoryStore, Model, ModelExt};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Clone, Serialize, Deserialize, Model)]
//! struct User {
//!     id: Option<String>,
//!     name: String,
//! }
//!
//! let users = Arc::new(MemoryStore::new()).attach::<User>()?;
//! let record = users.put_record(None, json!({ "name": "ada" })).await?;
//!
//! let mut user = users.find(record["id"].as_str().unwrap()).await?;
//! user.name = "ada l.".into();
//! user.save(&users).await?;
//! ```

// Lets the derive macro's `::kvmodel::` paths resolve inside this crate.
extern crate self as kvmodel;

mod attach;
mod error;
pub mod methods;
mod model;
pub mod remote;
mod store;
mod stream;

pub use attach::{attach, attach_with, AttachExt, AttachOptions, Attachment, ModelExt, PutValue, Target};
pub use error::{AttachError, ModelError, StoreError};
pub use methods::{MethodDescriptor, MethodKind, MethodTable};
pub use model::{Attribute, Model};
pub use store::{
    BatchOp, BoxFuture, Capability, EntryStream, IndexAccessor, Item, KeyGenerator, KvStore,
    MemoryStore, PutOptions, ReadOptions, ScanIndex, ValueEncoding, WriteOptions,
};
pub use stream::{project, ModelStream, ProjectionPolicy};

// Re-export the derive macro
#[cfg(feature = "macros")]
pub use kvmodel_macros::Model;

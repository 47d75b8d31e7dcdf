//! Remote method surface for attached models.
//!
//! A [`RemoteHost`] serves the methods an attachment advertises in its
//! [`MethodTable`](crate::MethodTable). A [`ClientStore`] on the other side
//! is an ordinary [`KvStore`](crate::KvStore) whose operations travel over a
//! [`Transport`]; models attached to it skip local validation and rely on
//! the host's write pipeline.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kvmodel::remote::{ClientStore, LocalTransport, RemoteHost};
//!
//! let host = Arc::new(RemoteHost::new(store.attach::<User>()?));
//! let client = Arc::new(ClientStore::connect(Arc::new(LocalTransport::new(host))).await?);
//! let users = client.attach::<User>()?;
//!
//! // HTTP transport (requires "http" feature)
//! // remote::serve(host, "0.0.0.0:3000").await?;
//! ```

mod client;
mod error;
mod host;

#[cfg(feature = "http")]
mod http;

pub use client::{ClientStore, LocalTransport, Transport, WireStream};
pub use error::RemoteError;
pub use host::{RemoteHost, RemoteRequest, RemoteResponse};

#[cfg(feature = "http")]
pub use http::{router, serve};

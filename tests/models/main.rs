//! Attachment integration tests against the in-memory store.

mod support;
mod crud;
mod derive;
mod pipeline;

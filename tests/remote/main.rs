//! Remote surface integration tests.

mod support;
mod local;

#[cfg(feature = "http")]
mod http;

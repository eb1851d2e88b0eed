//! Schema registry access
//!
//! [`RegistryClient`] is the facade the rest of the crate talks to. It
//! delegates to a [`RegistryTransport`]: [`HttpTransport`] for a
//! Confluent-compatible REST registry, [`MemoryTransport`] for `mock://` URLs.

mod client;
mod http;
mod memory;
mod transport;

pub use client::RegistryClient;
pub use http::HttpTransport;
pub use memory::{MemoryTransport, MOCK_SCHEME};
pub use transport::{RegistryEntry, RegistryTransport, TransportError, TransportResult};

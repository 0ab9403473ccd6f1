//! Gantry - route compilation and outbound clients for an API gateway.
//!
//! Gantry is the configuration core of a gateway: it turns a declarative
//! routing document into validated, immutable in-memory route definitions,
//! and constructs (and caches) the outbound HTTP client used to forward each
//! request to its downstream service. Request matching, dispatch, rate-limit
//! enforcement and the inbound listener live in the surrounding application;
//! this library produces the objects they consume.
//!
//! # Features
//! - Deterministic compilation of raw route entries into immutable [`core::Route`]
//!   aggregates via ~16 independent option compilers
//! - Upstream path templates (`/orders/{id}`, catch-all `{everything}`) compiled
//!   once and shared between the route and its downstream definition
//! - Per-route outbound clients with ordered delegating-handler chains
//! - Mutual-TLS client identities resolved from a certificate store by thumbprint
//! - Auditable opt-in for disabled server-certificate verification (always warned)
//! - Two-phase build/commit client caching with a 24-hour expiry
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use gantry::{
//!     adapters::{HttpClientCache, HttpClientFactory, PemDirectoryStore, StaticHandlerRegistry},
//!     core::RouteCompiler,
//! };
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config = gantry::config::load_config("gateway.yaml").await?;
//! let routes = RouteCompiler::compile(&config);
//!
//! let factory = HttpClientFactory::new(
//!     Arc::new(StaticHandlerRegistry::new()),
//!     Arc::new(PemDirectoryStore::new("/etc/gantry/certs")),
//!     Arc::new(HttpClientCache::new()),
//! );
//!
//! let route = &routes[0].downstream_routes[0];
//! let (client, token) = factory.create(route).await?;
//! if let Some(token) = token {
//!     factory.commit(token).await;
//! }
//! # let _ = client; Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations)
//! while keeping the compiler inside `core`. Compilation happens once per
//! configuration load and is single-threaded; the client factory and its
//! cache are shared by every in-flight request.
//!
//! # Error Handling
//! Fallible APIs return `eyre::Result<T>` at the application edge or a domain
//! specific error type (`OutboundError`, thiserror-based) at module
//! boundaries. Shape problems in certificate configuration are absorbed into
//! a silent no-certificate default; resolution failures propagate.
//!
//! # Concurrency & Data Structures
//! The client cache uses `scc::HashMap` for shared mutable state under
//! contention. Compiled routes are immutable and freely shareable.
//!
//! # License
//! Apache-2.0.
pub mod config;
pub mod ports;
pub mod tracing_setup;

// These modules are implementation details and should not be directly used by users
pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{GatewayHttpClient, HttpClientCache, HttpClientFactory, PemDirectoryStore},
    core::{DownstreamRoute, Route, RouteCompiler},
    ports::outbound::{OutboundError, OutboundResult},
};

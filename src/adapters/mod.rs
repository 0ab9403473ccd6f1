pub mod certificate;
pub mod client_cache;
pub mod client_factory;
pub mod handler_chain;
pub mod handler_registry;

/// Re-export commonly used types from adapters
pub use certificate::{PemDirectoryStore, resolve_client_certificate};
pub use client_cache::{ClientKey, HttpClientCache};
pub use client_factory::{CommitToken, GatewayHttpClient, HttpClientFactory};
pub use handler_registry::StaticHandlerRegistry;

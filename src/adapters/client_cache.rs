//! Time-bounded cache of constructed outbound clients.
//!
//! Keys are value objects derived from a route's immutable, client-relevant
//! fields, so cache correctness never depends on reference identity. Entries
//! expire after the TTL supplied at insert; an expired entry reads as absent
//! and is removed on lookup. Concurrent lookups and inserts are safe; two
//! racing inserts under one key converge to the last writer.
use std::time::{Duration, Instant};

use scc::{HashMap, hash_map::Entry};

use crate::{adapters::client_factory::GatewayHttpClient, core::route::DownstreamRoute};

/// Stable identity of an outbound client, derived from the fields that decide
/// how the client is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    service_name: String,
    downstream_scheme: String,
    downstream_path_template: String,
    upstream_path_template: String,
    timeout_ms: u64,
    allow_auto_redirect: bool,
    use_cookie_container: bool,
    use_proxy: bool,
    max_connections_per_server: usize,
    certificate_store: String,
    certificate_location: String,
    certificate_thumbprint: String,
    accept_any_server_certificate: bool,
    delegating_handlers: Vec<String>,
}

impl ClientKey {
    pub fn for_route(route: &DownstreamRoute) -> Self {
        let handler = &route.http_handler_options;
        let certificate = &route.client_certificate_options;
        Self {
            service_name: route.service_name.clone(),
            downstream_scheme: route.downstream_scheme.clone(),
            downstream_path_template: route.downstream_path_template.clone(),
            upstream_path_template: route.upstream_template.as_str().to_string(),
            timeout_ms: route.qos_options.timeout_ms,
            allow_auto_redirect: handler.allow_auto_redirect,
            use_cookie_container: handler.use_cookie_container,
            use_proxy: handler.use_proxy,
            max_connections_per_server: handler.max_connections_per_server,
            certificate_store: certificate.store.clone(),
            certificate_location: certificate.location.clone(),
            certificate_thumbprint: certificate.thumbprint.clone(),
            accept_any_server_certificate: route.dangerous_accept_any_server_certificate,
            delegating_handlers: route.delegating_handlers.clone(),
        }
    }
}

struct CacheSlot {
    client: GatewayHttpClient,
    expires_at: Instant,
}

/// Concurrent TTL cache mapping [`ClientKey`] to a constructed client.
#[derive(Default)]
pub struct HttpClientCache {
    entries: HashMap<ClientKey, CacheSlot>,
}

impl HttpClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the live client for `key`, removing it if expired.
    pub async fn get(&self, key: &ClientKey) -> Option<GatewayHttpClient> {
        let entry = self.entries.get_async(key).await?;
        if entry.get().expires_at <= Instant::now() {
            entry.remove();
            return None;
        }
        Some(entry.get().client.clone())
    }

    /// Store `client` under `key` for `ttl`. Replaces any live entry (last
    /// writer wins under a miss race).
    pub async fn insert(&self, key: ClientKey, client: GatewayHttpClient, ttl: Duration) {
        let slot = CacheSlot {
            client,
            expires_at: Instant::now() + ttl,
        };
        match self.entries.entry_async(key).await {
            Entry::Occupied(mut occupied) => {
                *occupied.get_mut() = slot;
            }
            Entry::Vacant(vacant) => {
                vacant.insert_entry(slot);
            }
        }
    }

    /// Number of entries currently held (live or not yet reaped).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Outbound client construction.
//!
//! [`HttpClientFactory`] turns a compiled [`DownstreamRoute`] into a
//! ready-to-use [`GatewayHttpClient`]: cache lookup first, otherwise a fresh
//! transport built from the route's handler options, optional mutual-TLS
//! identity resolved from the certificate store, the route's delegating
//! handlers composed around it, and the per-route timeout (90 s default when
//! the QoS timeout is the 0 sentinel).
//!
//! Construction is two-phase: `create` never touches the cache; the caller
//! decides whether to `commit` the returned token. A client built for a route
//! that then fails can simply be dropped without polluting the cache. The
//! factory keeps no request-scoped state, so a single instance is safe under
//! concurrent, overlapping create/commit pairs.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    adapters::{
        certificate::resolve_client_certificate,
        client_cache::{ClientKey, HttpClientCache},
        handler_chain,
    },
    core::route::DownstreamRoute,
    ports::{
        certificate_store::CertificateStoreProvider,
        outbound::{
            DelegatingHandlerRegistry, OutboundError, OutboundHandler, OutboundResult,
            SharedHandler,
        },
    },
};

/// Applied when the route's QoS timeout is the 0 sentinel.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// Committed clients stay cached for this long.
const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Redirects followed when the route allows auto-redirect.
const MAX_REDIRECTS: usize = 10;

/// A constructed outbound client bound to its composed handler chain and
/// resolved timeout. Cheap to clone; clones share the underlying connection
/// pool and are never mutated after construction.
#[derive(Clone)]
pub struct GatewayHttpClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    handler: SharedHandler,
    timeout: Duration,
    identity_thumbprint: Option<String>,
    accepts_any_server_certificate: bool,
}

impl GatewayHttpClient {
    pub(crate) fn new(
        handler: SharedHandler,
        timeout: Duration,
        identity_thumbprint: Option<String>,
        accepts_any_server_certificate: bool,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                handler,
                timeout,
                identity_thumbprint,
                accepts_any_server_certificate,
            }),
        }
    }

    /// Send a request through the composed handler chain, bounded by the
    /// route's resolved timeout.
    pub async fn send(&self, request: reqwest::Request) -> OutboundResult<reqwest::Response> {
        match tokio::time::timeout(self.inner.timeout, self.inner.handler.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(OutboundError::Timeout(self.inner.timeout)),
        }
    }

    /// The per-request timeout this client enforces.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Thumbprint of the attached client identity certificate, if any.
    pub fn identity_thumbprint(&self) -> Option<&str> {
        self.inner.identity_thumbprint.as_deref()
    }

    /// True when this client was built with server-certificate verification
    /// disabled. Exposed so operators can audit the opt-in.
    pub fn accepts_any_server_certificate(&self) -> bool {
        self.inner.accepts_any_server_certificate
    }

    /// Whether two handles refer to the same constructed client (and thus
    /// share one connection pool).
    pub fn same_instance(&self, other: &GatewayHttpClient) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Opaque token tying a freshly built client to its cache key. Produced by
/// [`HttpClientFactory::create`] on a cache miss, consumed by
/// [`HttpClientFactory::commit`].
pub struct CommitToken {
    key: ClientKey,
    client: GatewayHttpClient,
}

/// Builds and caches outbound clients per downstream route.
pub struct HttpClientFactory {
    registry: Arc<dyn DelegatingHandlerRegistry>,
    store: Arc<dyn CertificateStoreProvider>,
    cache: Arc<HttpClientCache>,
}

impl HttpClientFactory {
    pub fn new(
        registry: Arc<dyn DelegatingHandlerRegistry>,
        store: Arc<dyn CertificateStoreProvider>,
        cache: Arc<HttpClientCache>,
    ) -> Self {
        Self {
            registry,
            store,
            cache,
        }
    }

    /// Fetch or build the outbound client for `route`.
    ///
    /// A cache hit returns the cached client and no token. A miss builds a
    /// new client and returns it with a [`CommitToken`]; the cache stays
    /// untouched until the caller invokes [`commit`](Self::commit). Two
    /// concurrent misses under one key both build; whichever commits last
    /// wins, which is tolerated.
    pub async fn create(
        &self,
        route: &DownstreamRoute,
    ) -> OutboundResult<(GatewayHttpClient, Option<CommitToken>)> {
        let key = ClientKey::for_route(route);

        if let Some(cached) = self.cache.get(&key).await {
            return Ok((cached, None));
        }

        let timeout = resolve_timeout(route.qos_options.timeout_ms);
        let (transport, identity_thumbprint) = self.build_transport(route, timeout)?;

        let factories = self.registry.handlers_for(route);
        let handler = handler_chain::assemble(Arc::new(transport), &factories);

        let client = GatewayHttpClient::new(
            handler,
            timeout,
            identity_thumbprint,
            route.dangerous_accept_any_server_certificate,
        );
        let token = CommitToken {
            key,
            client: client.clone(),
        };
        Ok((client, Some(token)))
    }

    /// Store the built client under its key with the fixed 24-hour expiry.
    pub async fn commit(&self, token: CommitToken) {
        self.cache.insert(token.key, token.client, CACHE_TTL).await;
    }

    /// Build the innermost transport from the route's handler options,
    /// attaching the resolved client identity when one is configured.
    fn build_transport(
        &self,
        route: &DownstreamRoute,
        timeout: Duration,
    ) -> OutboundResult<(ReqwestTransport, Option<String>)> {
        let options = &route.http_handler_options;

        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(if options.allow_auto_redirect {
                reqwest::redirect::Policy::limited(MAX_REDIRECTS)
            } else {
                reqwest::redirect::Policy::none()
            });

        // The cookie store is only allocated when the route asks for it; an
        // unconditionally supplied container is rejected by at least one
        // underlying HTTP stack.
        if options.use_cookie_container {
            builder = builder.cookie_store(true);
        }

        if !options.use_proxy {
            builder = builder.no_proxy();
        }

        if options.max_connections_per_server != usize::MAX {
            builder = builder.pool_max_idle_per_host(options.max_connections_per_server);
        }

        let mut identity_thumbprint = None;
        if let Some(certificate) =
            resolve_client_certificate(self.store.as_ref(), &route.client_certificate_options)?
        {
            let identity = reqwest::Identity::from_pem(&certificate.pem)
                .map_err(|e| OutboundError::ClientBuild(e.to_string()))?;
            builder = builder.identity(identity);
            identity_thumbprint = Some(certificate.thumbprint);
        }

        if route.dangerous_accept_any_server_certificate {
            builder = builder.danger_accept_invalid_certs(true);
            tracing::warn!(
                upstream_template = %route.upstream_template.as_str(),
                downstream_template = %route.downstream_path_template,
                "accepting any downstream server certificate for this route; TLS verification is disabled"
            );
        }

        let client = builder
            .build()
            .map_err(|e| OutboundError::ClientBuild(e.to_string()))?;

        Ok((ReqwestTransport { client }, identity_thumbprint))
    }
}

fn resolve_timeout(timeout_ms: u64) -> Duration {
    if timeout_ms == 0 {
        DEFAULT_TIMEOUT
    } else {
        Duration::from_millis(timeout_ms)
    }
}

/// The innermost handler: dispatches through the configured reqwest client.
struct ReqwestTransport {
    client: reqwest::Client,
}

#[async_trait]
impl OutboundHandler for ReqwestTransport {
    async fn send(&self, request: reqwest::Request) -> OutboundResult<reqwest::Response> {
        self.client.execute(request).await.map_err(|e| {
            if e.is_timeout() {
                OutboundError::Timeout(Duration::ZERO)
            } else {
                OutboundError::Request(e.to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::{self, Write},
        sync::{Arc, Mutex},
    };

    use rcgen::generate_simple_self_signed;
    use tempfile::TempDir;
    use tracing::instrument::WithSubscriber;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::{
        adapters::certificate::{PemDirectoryStore, thumbprint},
        config::models::{GatewayConfig, RouteEntry},
        core::{RouteCompiler, route::ClientCertificateOptions},
        ports::outbound::HandlerFactory,
    };

    struct EmptyRegistry;

    impl DelegatingHandlerRegistry for EmptyRegistry {
        fn handlers_for(&self, _route: &DownstreamRoute) -> Vec<HandlerFactory> {
            Vec::new()
        }
    }

    fn compile_route(mutate: impl FnOnce(&mut RouteEntry)) -> Arc<DownstreamRoute> {
        let mut entry = RouteEntry {
            service_name: "orders".to_string(),
            upstream_path_template: "/orders/{id}".to_string(),
            upstream_http_method: vec!["GET".to_string()],
            downstream_scheme: "https".to_string(),
            downstream_path_template: "/api/orders/{id}".to_string(),
            ..RouteEntry::default()
        };
        mutate(&mut entry);

        let config = GatewayConfig {
            routes: vec![entry],
            ..GatewayConfig::default()
        };
        Arc::clone(&RouteCompiler::compile(&config)[0].downstream_routes[0])
    }

    fn factory_with_store(root: &std::path::Path) -> HttpClientFactory {
        HttpClientFactory::new(
            Arc::new(EmptyRegistry),
            Arc::new(PemDirectoryStore::new(root)),
            Arc::new(HttpClientCache::new()),
        )
    }

    fn empty_store() -> TempDir {
        TempDir::new().unwrap()
    }

    #[tokio::test]
    async fn unset_qos_timeout_resolves_to_90_seconds() {
        let store = empty_store();
        let factory = factory_with_store(store.path());
        let route = compile_route(|_| {});

        let (client, _token) = factory.create(&route).await.unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(90));
    }

    #[tokio::test]
    async fn configured_qos_timeout_is_interpreted_as_milliseconds() {
        let store = empty_store();
        let factory = factory_with_store(store.path());
        let route = compile_route(|entry| entry.qos.timeout_value_ms = 5000);

        let (client, _token) = factory.create(&route).await.unwrap();
        assert_eq!(client.timeout(), Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn empty_certificate_options_attach_nothing() {
        let store = empty_store();
        let factory = factory_with_store(store.path());
        let route = compile_route(|_| {});

        let (client, _token) = factory.create(&route).await.unwrap();
        assert!(client.identity_thumbprint().is_none());
        assert!(!client.accepts_any_server_certificate());
    }

    #[tokio::test]
    async fn matching_certificate_is_attached() {
        let store_root = empty_store();
        let dir = store_root.path().join("local-machine").join("my");
        fs::create_dir_all(&dir).unwrap();
        let certified = generate_simple_self_signed(["localhost".to_string()]).unwrap();
        fs::write(
            dir.join("identity.pem"),
            format!(
                "{}{}",
                certified.cert.pem(),
                certified.signing_key.serialize_pem()
            ),
        )
        .unwrap();
        let print = thumbprint(certified.cert.der().as_ref());

        let factory = factory_with_store(store_root.path());
        let expected = print.clone();
        let route = compile_route(move |entry| {
            entry.client_certificate.store = "My".to_string();
            entry.client_certificate.location = "LocalMachine".to_string();
            entry.client_certificate.thumbprint = print;
        });

        let (client, _token) = factory.create(&route).await.unwrap();
        assert_eq!(client.identity_thumbprint(), Some(expected.as_str()));
    }

    #[tokio::test]
    async fn unresolvable_thumbprint_fails_create() {
        let store_root = empty_store();
        let dir = store_root.path().join("local-machine").join("my");
        fs::create_dir_all(&dir).unwrap();
        let certified = generate_simple_self_signed(["localhost".to_string()]).unwrap();
        fs::write(
            dir.join("identity.pem"),
            format!(
                "{}{}",
                certified.cert.pem(),
                certified.signing_key.serialize_pem()
            ),
        )
        .unwrap();

        let factory = factory_with_store(store_root.path());
        let route = compile_route(|entry| {
            entry.client_certificate.store = "My".to_string();
            entry.client_certificate.location = "LocalMachine".to_string();
            entry.client_certificate.thumbprint = "DEADBEEF".to_string();
        });

        let result = factory.create(&route).await;
        assert!(matches!(
            result,
            Err(OutboundError::CertificateNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn create_then_commit_then_create_reuses_the_client() {
        let store = empty_store();
        let factory = factory_with_store(store.path());
        let route = compile_route(|_| {});

        let (first, token) = factory.create(&route).await.unwrap();
        factory.commit(token.unwrap()).await;

        let (second, token) = factory.create(&route).await.unwrap();
        assert!(second.same_instance(&first));
        assert!(token.is_none(), "cache hit must not return a commit token");
    }

    #[tokio::test]
    async fn create_without_commit_builds_a_new_client_each_time() {
        let store = empty_store();
        let factory = factory_with_store(store.path());
        let route = compile_route(|_| {});

        let (first, _token) = factory.create(&route).await.unwrap();
        let (second, token) = factory.create(&route).await.unwrap();

        assert!(!second.same_instance(&first));
        assert!(token.is_some());
    }

    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl CaptureWriter {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn danger_flag_warns_once_per_create_naming_both_templates() {
        let store = empty_store();
        let factory = factory_with_store(store.path());
        let route =
            compile_route(|entry| entry.dangerous_accept_any_server_certificate_validator = true);

        let writer = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();

        let client = async {
            let (client, _token) = factory.create(&route).await.unwrap();
            client
        }
        .with_subscriber(subscriber)
        .await;

        assert!(client.accepts_any_server_certificate());

        let logged = writer.contents();
        assert_eq!(
            logged
                .matches("accepting any downstream server certificate")
                .count(),
            1
        );
        assert!(logged.contains("/orders/{id}"));
        assert!(logged.contains("/api/orders/{id}"));
    }

    #[tokio::test]
    async fn no_warning_without_the_danger_flag() {
        let store = empty_store();
        let factory = factory_with_store(store.path());
        let route = compile_route(|_| {});

        let writer = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();

        async {
            let _ = factory.create(&route).await.unwrap();
        }
        .with_subscriber(subscriber)
        .await;

        assert!(writer.contents().is_empty());
    }

    #[test]
    fn timeout_sentinel_resolution() {
        assert_eq!(resolve_timeout(0), Duration::from_secs(90));
        assert_eq!(resolve_timeout(5000), Duration::from_millis(5000));
    }

    #[test]
    fn client_key_is_value_derived() {
        let route_a = compile_route(|_| {});
        let route_b = compile_route(|_| {});
        // Distinct compilations, identical fields: same key
        assert_eq!(ClientKey::for_route(&route_a), ClientKey::for_route(&route_b));

        let other = compile_route(|entry| entry.qos.timeout_value_ms = 1);
        assert_ne!(ClientKey::for_route(&route_a), ClientKey::for_route(&other));
    }

    #[test]
    fn certificate_options_completeness() {
        let empty = ClientCertificateOptions::default();
        assert!(!empty.is_fully_specified());
    }
}

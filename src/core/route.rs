//! Compiled, immutable route model.
//!
//! [`Route`] and [`DownstreamRoute`] are produced once per configuration load by the
//! compiler in [`crate::core::compiler`] and are never mutated afterwards; a reload
//! replaces the whole set. The value objects below are the typed results of the
//! individual option compilers.
use std::{collections::HashMap, sync::Arc};

use http::{Method, Version};

use crate::core::path_template::UpstreamPathTemplate;

/// Compiled mapping from an upstream request pattern to one downstream target
/// and its policies.
///
/// `downstream_routes` is a sequence for shape compatibility with multi-target
/// aggregation, but this compiler always produces exactly one entry. The
/// `upstream_template` here and the one embedded in the downstream route are
/// the same `Arc` instance, never two equivalent compilations.
#[derive(Debug, Clone)]
pub struct Route {
    pub downstream_routes: Vec<Arc<DownstreamRoute>>,
    pub upstream_http_methods: Vec<Method>,
    pub upstream_host: Option<String>,
    pub upstream_template: Arc<UpstreamPathTemplate>,
}

/// The slice of a [`Route`] consumed at dispatch time to build or select an
/// outbound client.
#[derive(Debug)]
pub struct DownstreamRoute {
    pub service_name: String,
    pub key: String,
    pub request_id_key: Option<String>,
    pub load_balancer_key: String,
    pub flags: RouteFlags,
    pub authentication_options: AuthenticationOptions,
    pub claims_to_headers: Vec<ClaimToThing>,
    pub claims_to_claims: Vec<ClaimToThing>,
    pub claims_to_queries: Vec<ClaimToThing>,
    pub route_claims_requirement: HashMap<String, String>,
    pub qos_options: QosOptions,
    pub rate_limit_options: RateLimitOptions,
    pub cache_options: CacheOptions,
    pub http_handler_options: HttpHandlerOptions,
    pub header_transformations: HeaderTransformations,
    pub downstream_addresses: Vec<HostAndPort>,
    pub load_balancer_options: LoadBalancerOptions,
    pub security_options: SecurityOptions,
    pub client_certificate_options: ClientCertificateOptions,
    pub dangerous_accept_any_server_certificate: bool,
    pub delegating_handlers: Vec<String>,
    pub downstream_scheme: String,
    pub downstream_path_template: String,
    pub downstream_http_version: Version,
    pub upstream_template: Arc<UpstreamPathTemplate>,
}

/// Boolean policy flags derived from the raw entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteFlags {
    pub is_authenticated: bool,
    pub is_authorized: bool,
    pub is_cached: bool,
    pub enable_rate_limiting: bool,
    pub use_service_discovery: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthenticationOptions {
    pub provider_key: String,
    pub allowed_scopes: Vec<String>,
}

/// One claim-to-target mapping parsed from the `Claims[key] > value[i] > |`
/// configuration syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimToThing {
    /// Header / query / claim name to write
    pub target_key: String,
    /// Source claim name
    pub claim_key: String,
    /// Delimiter used when indexing into a composite claim value
    pub delimiter: String,
    /// Index into the delimited claim value
    pub index: usize,
}

/// Per-route reliability policy. The client factory consumes only
/// `timeout_ms` (0 = unset); the breaker fields are carried for the
/// out-of-scope QoS executor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QosOptions {
    pub timeout_ms: u64,
    pub exceptions_allowed_before_breaking: u32,
    pub duration_of_break_ms: u64,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RateLimitOptions {
    pub enabled: bool,
    pub client_whitelist: Vec<String>,
    pub client_id_header: String,
    pub period: String,
    pub period_timespan_secs: f64,
    pub limit: u64,
    pub http_status_code: u16,
    pub quota_exceeded_message: String,
    pub rate_limit_counter_prefix: String,
    pub disable_rate_limit_headers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheOptions {
    pub region: String,
    pub ttl_seconds: u64,
}

/// Compiled outbound transport handler options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HttpHandlerOptions {
    pub allow_auto_redirect: bool,
    pub use_cookie_container: bool,
    pub use_proxy: bool,
    /// `usize::MAX` means unlimited
    pub max_connections_per_server: usize,
}

impl Default for HttpHandlerOptions {
    fn default() -> Self {
        Self {
            allow_auto_redirect: false,
            use_cookie_container: false,
            use_proxy: true,
            max_connections_per_server: usize::MAX,
        }
    }
}

/// A single find/replace applied to a header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFindAndReplace {
    pub key: String,
    pub find: String,
    pub replace: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddHeader {
    pub key: String,
    pub value: String,
}

/// Header transforms, upstream and downstream directions kept separate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderTransformations {
    pub upstream: Vec<HeaderFindAndReplace>,
    pub downstream: Vec<HeaderFindAndReplace>,
    pub add_to_upstream: Vec<AddHeader>,
    pub add_to_downstream: Vec<AddHeader>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostAndPort {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadBalancerOptions {
    pub kind: String,
    pub key: String,
    pub expiry_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecurityOptions {
    pub ip_allowed_list: Vec<String>,
    pub ip_blocked_list: Vec<String>,
}

/// Store / location / thumbprint triple identifying a client identity
/// certificate for mutual TLS. Free-form strings here; parsing happens at
/// resolution time, so an all-empty or malformed value is valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ClientCertificateOptions {
    pub store: String,
    pub location: String,
    pub thumbprint: String,
}

impl ClientCertificateOptions {
    /// True when store, location and thumbprint are all present. Anything less
    /// is the silent no-certificate case.
    pub fn is_fully_specified(&self) -> bool {
        !self.store.is_empty() && !self.location.is_empty() && !self.thumbprint.is_empty()
    }
}

//! Raw configuration data structures for Gantry.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files. They are
//! intentionally serde‑friendly and include defaults so that minimal configs remain concise.
//! The raw document is treated as read‑only input to route compilation; the compiled,
//! immutable counterparts live in [`crate::core::route`].
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level gateway configuration: a list of raw route entries plus global settings.
///
/// An empty `routes` list is valid and compiles to an empty route set.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GatewayConfig {
    pub routes: Vec<RouteEntry>,
    pub global: GlobalSettings,
}

/// One raw route entry as it appears in the configuration file.
///
/// Every field has a serde default so partially specified routes deserialize cleanly;
/// the option compilers are responsible for turning absent slices into documented
/// default value objects.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RouteEntry {
    /// Downstream service name (used for service discovery; empty = static hosts)
    pub service_name: String,
    /// Upstream path template, e.g. `/orders/{id}`
    pub upstream_path_template: String,
    /// Permitted upstream HTTP methods (empty = all)
    pub upstream_http_method: Vec<String>,
    /// Optional upstream host restriction
    pub upstream_host: Option<String>,
    /// Whether upstream path matching is case sensitive
    pub route_is_case_sensitive: bool,
    /// Route matching priority (higher wins; `/` compiles to 0)
    pub priority: i32,
    /// Stable route key
    pub key: String,
    pub downstream_scheme: String,
    pub downstream_path_template: String,
    pub downstream_host_and_ports: Vec<HostAndPortEntry>,
    /// Downstream HTTP version, e.g. "1.1" or "2" (empty = 1.1)
    pub downstream_http_version: String,
    /// Per-route request-id header key; falls back to the global one
    pub request_id_key: Option<String>,
    pub add_headers_to_request: HashMap<String, String>,
    pub add_claims_to_request: HashMap<String, String>,
    pub add_queries_to_request: HashMap<String, String>,
    pub route_claims_requirement: HashMap<String, String>,
    pub upstream_header_transform: HashMap<String, String>,
    pub downstream_header_transform: HashMap<String, String>,
    /// Ordered delegating-handler names wrapped around the outbound transport
    pub delegating_handlers: Vec<String>,
    /// Opt-in: skip downstream server certificate verification (always logged)
    pub dangerous_accept_any_server_certificate_validator: bool,
    pub authentication: AuthenticationEntry,
    pub qos: QosEntry,
    pub rate_limit: RateLimitEntry,
    pub cache: CacheEntry,
    pub load_balancer: LoadBalancerEntry,
    pub http_handler: HttpHandlerEntry,
    pub client_certificate: ClientCertificateEntry,
    pub security: SecurityEntry,
}

impl Default for RouteEntry {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            upstream_path_template: String::new(),
            upstream_http_method: Vec::new(),
            upstream_host: None,
            route_is_case_sensitive: false,
            priority: 1,
            key: String::new(),
            downstream_scheme: String::new(),
            downstream_path_template: String::new(),
            downstream_host_and_ports: Vec::new(),
            downstream_http_version: String::new(),
            request_id_key: None,
            add_headers_to_request: HashMap::new(),
            add_claims_to_request: HashMap::new(),
            add_queries_to_request: HashMap::new(),
            route_claims_requirement: HashMap::new(),
            upstream_header_transform: HashMap::new(),
            downstream_header_transform: HashMap::new(),
            delegating_handlers: Vec::new(),
            dangerous_accept_any_server_certificate_validator: false,
            authentication: AuthenticationEntry::default(),
            qos: QosEntry::default(),
            rate_limit: RateLimitEntry::default(),
            cache: CacheEntry::default(),
            load_balancer: LoadBalancerEntry::default(),
            http_handler: HttpHandlerEntry::default(),
            client_certificate: ClientCertificateEntry::default(),
            security: SecurityEntry::default(),
        }
    }
}

/// A downstream host/port pair.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HostAndPortEntry {
    pub host: String,
    pub port: u16,
}

/// Raw authentication slice: provider key plus allowed scopes.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AuthenticationEntry {
    pub authentication_provider_key: String,
    pub allowed_scopes: Vec<String>,
}

/// Raw QoS slice. `timeout_value_ms == 0` means "unset" and the client factory
/// substitutes its 90 second default.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct QosEntry {
    pub timeout_value_ms: u64,
    pub exceptions_allowed_before_breaking: u32,
    pub duration_of_break_ms: u64,
}

/// Raw per-route rate-limit rule; global defaults fill the presentation fields.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RateLimitEntry {
    pub enable_rate_limiting: bool,
    pub client_whitelist: Vec<String>,
    /// Human-readable window, e.g. "1s", "5m"
    pub period: String,
    pub period_timespan_secs: f64,
    pub limit: u64,
}

/// Raw cache slice: region name plus TTL. `ttl_seconds == 0` disables caching.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CacheEntry {
    pub region: String,
    pub ttl_seconds: u64,
}

/// Raw load-balancer slice.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoadBalancerEntry {
    /// Strategy name, e.g. "RoundRobin", "LeastConnection", "CookieStickySessions"
    #[serde(rename = "type")]
    pub kind: String,
    pub key: String,
    pub expiry_ms: u64,
}

fn default_use_proxy() -> bool {
    true
}

/// Raw outbound transport handler slice.
///
/// `max_connections_per_server <= 0` compiles to "unlimited".
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HttpHandlerEntry {
    pub allow_auto_redirect: bool,
    pub use_cookie_container: bool,
    #[serde(default = "default_use_proxy")]
    pub use_proxy: bool,
    pub max_connections_per_server: i64,
}

impl Default for HttpHandlerEntry {
    fn default() -> Self {
        Self {
            allow_auto_redirect: false,
            use_cookie_container: false,
            use_proxy: true,
            max_connections_per_server: 0,
        }
    }
}

/// Raw client-certificate slice identifying a mutual-TLS identity in a
/// platform certificate store. All three fields are free-form strings here;
/// parsing and lookup are deferred to resolution time, so a malformed value
/// is not a configuration error.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ClientCertificateEntry {
    pub store: String,
    pub location: String,
    pub thumbprint: String,
}

/// Raw security slice: IP allow/block lists.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SecurityEntry {
    pub ip_allowed_list: Vec<String>,
    pub ip_blocked_list: Vec<String>,
}

/// Global settings applied as fallbacks during route compilation.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GlobalSettings {
    /// Gateway-wide request-id header key
    pub request_id_key: Option<String>,
    pub rate_limit_options: GlobalRateLimitEntry,
}

fn default_client_id_header() -> String {
    "ClientId".to_string()
}

fn default_rate_limit_status_code() -> u16 {
    429
}

fn default_counter_prefix() -> String {
    "gantry".to_string()
}

/// Global rate-limit presentation defaults shared by every route.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GlobalRateLimitEntry {
    #[serde(default = "default_client_id_header")]
    pub client_id_header: String,
    pub disable_rate_limit_headers: bool,
    pub quota_exceeded_message: String,
    #[serde(default = "default_rate_limit_status_code")]
    pub http_status_code: u16,
    #[serde(default = "default_counter_prefix")]
    pub rate_limit_counter_prefix: String,
}

impl Default for GlobalRateLimitEntry {
    fn default() -> Self {
        Self {
            client_id_header: default_client_id_header(),
            disable_rate_limit_headers: false,
            quota_exceeded_message: String::new(),
            http_status_code: default_rate_limit_status_code(),
            rate_limit_counter_prefix: default_counter_prefix(),
        }
    }
}

//! Route compilation.
//!
//! [`RouteCompiler::compile`] fans each raw [`RouteEntry`] out to a set of
//! independent, pure option compilers and assembles their results into one
//! immutable [`Route`] aggregate. Compilation is deterministic: one route per
//! entry, output order equal to input order, no merging or deduplication.
//! Cross-route conflict detection belongs to a separate validator and is not
//! performed here.
use std::{collections::HashMap, sync::Arc};

use http::{Method, Version};

use crate::{
    config::models::{
        CacheEntry, ClientCertificateEntry, GatewayConfig, GlobalSettings, HttpHandlerEntry,
        LoadBalancerEntry, QosEntry, RateLimitEntry, RouteEntry, SecurityEntry,
    },
    core::{
        path_template::UpstreamPathTemplate,
        route::{
            AddHeader, AuthenticationOptions, CacheOptions, ClaimToThing,
            ClientCertificateOptions, DownstreamRoute, HeaderFindAndReplace,
            HeaderTransformations, HostAndPort, HttpHandlerOptions, LoadBalancerOptions,
            QosOptions, RateLimitOptions, Route, RouteFlags, SecurityOptions,
        },
    },
};

/// The top-level configuration compiler.
pub struct RouteCompiler;

impl RouteCompiler {
    /// Compile a raw configuration into the full route set.
    ///
    /// An empty configuration yields an empty vec; this is not an error.
    pub fn compile(config: &GatewayConfig) -> Vec<Route> {
        config
            .routes
            .iter()
            .map(|entry| Self::compile_route(entry, &config.global))
            .collect()
    }

    fn compile_route(entry: &RouteEntry, global: &GlobalSettings) -> Route {
        // Compiled once and shared: the downstream route and the route level
        // must hold the identical pattern instance, not two equivalent ones.
        let template = Arc::new(upstream_template(entry));

        let downstream = Arc::new(DownstreamRoute {
            service_name: entry.service_name.clone(),
            key: entry.key.clone(),
            request_id_key: request_id_key(entry, global),
            load_balancer_key: load_balancer_key(entry),
            flags: route_flags(entry),
            authentication_options: authentication_options(entry),
            claims_to_headers: claims_to_things(&entry.add_headers_to_request),
            claims_to_claims: claims_to_things(&entry.add_claims_to_request),
            claims_to_queries: claims_to_things(&entry.add_queries_to_request),
            route_claims_requirement: entry.route_claims_requirement.clone(),
            qos_options: qos_options(&entry.qos, entry),
            rate_limit_options: rate_limit_options(&entry.rate_limit, global),
            cache_options: cache_options(&entry.cache, entry),
            http_handler_options: http_handler_options(&entry.http_handler),
            header_transformations: header_transformations(entry),
            downstream_addresses: downstream_addresses(entry),
            load_balancer_options: load_balancer_options(&entry.load_balancer),
            security_options: security_options(&entry.security),
            client_certificate_options: client_certificate_options(&entry.client_certificate),
            dangerous_accept_any_server_certificate: entry
                .dangerous_accept_any_server_certificate_validator,
            delegating_handlers: entry.delegating_handlers.clone(),
            downstream_scheme: entry.downstream_scheme.clone(),
            downstream_path_template: entry.downstream_path_template.clone(),
            downstream_http_version: downstream_http_version(&entry.downstream_http_version),
            upstream_template: Arc::clone(&template),
        });

        Route {
            downstream_routes: vec![downstream],
            upstream_http_methods: upstream_methods(&entry.upstream_http_method),
            upstream_host: entry.upstream_host.clone(),
            upstream_template: template,
        }
    }
}

/// Derive the boolean policy flags from a raw entry.
pub fn route_flags(entry: &RouteEntry) -> RouteFlags {
    RouteFlags {
        is_authenticated: !entry.authentication.authentication_provider_key.is_empty(),
        is_authorized: !entry.route_claims_requirement.is_empty(),
        is_cached: entry.cache.ttl_seconds > 0,
        enable_rate_limiting: entry.rate_limit.enable_rate_limiting,
        use_service_discovery: !entry.service_name.is_empty(),
    }
}

/// Per-route request-id key, falling back to the global setting.
pub fn request_id_key(entry: &RouteEntry, global: &GlobalSettings) -> Option<String> {
    entry
        .request_id_key
        .clone()
        .or_else(|| global.request_id_key.clone())
}

/// Stable key identifying the route to the load balancer. Sticky-session
/// routes are keyed by their configured session key; everything else by
/// template and method set.
pub fn load_balancer_key(entry: &RouteEntry) -> String {
    if entry.load_balancer.kind == "CookieStickySessions" && !entry.load_balancer.key.is_empty() {
        format!("CookieStickySessions:{}", entry.load_balancer.key)
    } else {
        format!(
            "{}|{}",
            entry.upstream_path_template,
            entry.upstream_http_method.join(",")
        )
    }
}

/// Compile the upstream path template.
pub fn upstream_template(entry: &RouteEntry) -> UpstreamPathTemplate {
    UpstreamPathTemplate::compile(
        &entry.upstream_path_template,
        entry.route_is_case_sensitive,
        entry.priority,
    )
}

pub fn authentication_options(entry: &RouteEntry) -> AuthenticationOptions {
    AuthenticationOptions {
        provider_key: entry.authentication.authentication_provider_key.clone(),
        allowed_scopes: entry.authentication.allowed_scopes.clone(),
    }
}

/// Parse one claims map (`target -> "Claims[key] > value[i] > |"`) into
/// mappings. Invoked once per of the three maps (headers, claims, queries);
/// an empty map compiles to an empty list. Entries that do not follow the
/// syntax are skipped with a warning.
pub fn claims_to_things(map: &HashMap<String, String>) -> Vec<ClaimToThing> {
    let mut things: Vec<ClaimToThing> = map
        .iter()
        .filter_map(|(target, value)| match parse_claim_mapping(value) {
            Some((claim_key, delimiter, index)) => Some(ClaimToThing {
                target_key: target.clone(),
                claim_key,
                delimiter,
                index,
            }),
            None => {
                tracing::warn!(target_key = %target, value = %value, "skipping malformed claim mapping");
                None
            }
        })
        .collect();
    // HashMap iteration order is unstable; keep the output deterministic
    things.sort_by(|a, b| a.target_key.cmp(&b.target_key));
    things
}

fn parse_claim_mapping(value: &str) -> Option<(String, String, usize)> {
    let parts: Vec<&str> = value.split('>').map(str::trim).collect();

    let claim_key = parts
        .first()?
        .strip_prefix("Claims[")?
        .strip_suffix(']')?
        .to_string();

    match parts.len() {
        // "Claims[sub] > value"
        2 if parts[1] == "value" => Some((claim_key, String::new(), 0)),
        // "Claims[sub] > value[0] > |"
        3 => {
            let index = parts[1]
                .strip_prefix("value[")?
                .strip_suffix(']')?
                .parse()
                .ok()?;
            Some((claim_key, parts[2].to_string(), index))
        }
        _ => None,
    }
}

/// Compile the QoS slice. The timeout keeps its raw sentinel (0 = unset);
/// interpreting it is the client factory's job.
pub fn qos_options(qos: &QosEntry, entry: &RouteEntry) -> QosOptions {
    QosOptions {
        timeout_ms: qos.timeout_value_ms,
        exceptions_allowed_before_breaking: qos.exceptions_allowed_before_breaking,
        duration_of_break_ms: qos.duration_of_break_ms,
        key: format!(
            "{}|{}",
            entry.upstream_path_template,
            entry.upstream_http_method.join(",")
        ),
    }
}

/// Compile the rate-limit slice, filling presentation fields from global
/// settings.
pub fn rate_limit_options(rule: &RateLimitEntry, global: &GlobalSettings) -> RateLimitOptions {
    let defaults = &global.rate_limit_options;
    RateLimitOptions {
        enabled: rule.enable_rate_limiting,
        client_whitelist: rule.client_whitelist.clone(),
        client_id_header: defaults.client_id_header.clone(),
        period: rule.period.clone(),
        period_timespan_secs: rule.period_timespan_secs,
        limit: rule.limit,
        http_status_code: defaults.http_status_code,
        quota_exceeded_message: defaults.quota_exceeded_message.clone(),
        rate_limit_counter_prefix: defaults.rate_limit_counter_prefix.clone(),
        disable_rate_limit_headers: defaults.disable_rate_limit_headers,
    }
}

/// Compile the cache slice. An absent region defaults to a name derived from
/// the method set and the flattened path template.
pub fn cache_options(cache: &CacheEntry, entry: &RouteEntry) -> CacheOptions {
    let region = if cache.region.is_empty() {
        format!(
            "{}{}",
            entry.upstream_http_method.join(""),
            entry.upstream_path_template.replace('/', "")
        )
    } else {
        cache.region.clone()
    };

    CacheOptions {
        region,
        ttl_seconds: cache.ttl_seconds,
    }
}

/// Compile the transport handler slice. A non-positive connection limit means
/// unlimited.
pub fn http_handler_options(raw: &HttpHandlerEntry) -> HttpHandlerOptions {
    HttpHandlerOptions {
        allow_auto_redirect: raw.allow_auto_redirect,
        use_cookie_container: raw.use_cookie_container,
        use_proxy: raw.use_proxy,
        max_connections_per_server: if raw.max_connections_per_server <= 0 {
            usize::MAX
        } else {
            raw.max_connections_per_server as usize
        },
    }
}

/// Split the raw header transform maps into find/replace rules (values
/// containing a comma) and plain add-header rules, per direction.
pub fn header_transformations(entry: &RouteEntry) -> HeaderTransformations {
    let mut transformations = HeaderTransformations::default();

    split_header_map(
        &entry.upstream_header_transform,
        &mut transformations.upstream,
        &mut transformations.add_to_upstream,
    );
    split_header_map(
        &entry.downstream_header_transform,
        &mut transformations.downstream,
        &mut transformations.add_to_downstream,
    );

    transformations
}

fn split_header_map(
    map: &HashMap<String, String>,
    find_and_replace: &mut Vec<HeaderFindAndReplace>,
    add: &mut Vec<AddHeader>,
) {
    for (key, value) in map {
        match value.split_once(',') {
            Some((find, replace)) => find_and_replace.push(HeaderFindAndReplace {
                key: key.clone(),
                find: find.trim().to_string(),
                replace: replace.trim().to_string(),
                index: 0,
            }),
            None => add.push(AddHeader {
                key: key.clone(),
                value: value.clone(),
            }),
        }
    }
    find_and_replace.sort_by(|a, b| a.key.cmp(&b.key));
    add.sort_by(|a, b| a.key.cmp(&b.key));
}

pub fn downstream_addresses(entry: &RouteEntry) -> Vec<HostAndPort> {
    entry
        .downstream_host_and_ports
        .iter()
        .map(|pair| HostAndPort {
            host: pair.host.clone(),
            port: pair.port,
        })
        .collect()
}

pub fn load_balancer_options(raw: &LoadBalancerEntry) -> LoadBalancerOptions {
    LoadBalancerOptions {
        kind: raw.kind.clone(),
        key: raw.key.clone(),
        expiry_ms: raw.expiry_ms,
    }
}

pub fn security_options(raw: &SecurityEntry) -> SecurityOptions {
    SecurityOptions {
        ip_allowed_list: raw.ip_allowed_list.clone(),
        ip_blocked_list: raw.ip_blocked_list.clone(),
    }
}

/// Parse the downstream HTTP version string; anything unrecognized (including
/// empty) falls back to HTTP/1.1.
pub fn downstream_http_version(raw: &str) -> Version {
    match raw.trim() {
        "1.0" => Version::HTTP_10,
        "1.1" => Version::HTTP_11,
        "2" | "2.0" => Version::HTTP_2,
        "3" | "3.0" => Version::HTTP_3,
        _ => Version::HTTP_11,
    }
}

/// Pure field copy of the client-certificate slice. No validation here:
/// resolution against the store decides whether the triple is usable.
pub fn client_certificate_options(raw: &ClientCertificateEntry) -> ClientCertificateOptions {
    ClientCertificateOptions {
        store: raw.store.clone(),
        location: raw.location.clone(),
        thumbprint: raw.thumbprint.clone(),
    }
}

/// Parse the permitted upstream methods; unparseable tokens are dropped with
/// a warning.
pub fn upstream_methods(methods: &[String]) -> Vec<Method> {
    methods
        .iter()
        .filter_map(|raw| match Method::from_bytes(raw.as_bytes()) {
            Ok(method) => Some(method),
            Err(_) => {
                tracing::warn!(method = %raw, "skipping unparseable upstream HTTP method");
                None
            }
        })
        .collect()
}

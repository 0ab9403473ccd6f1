use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::route::DownstreamRoute;

/// Custom error type for outbound client construction and dispatch.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OutboundError {
    /// A fully specified client certificate did not match anything in the
    /// store. This is a configuration error and is never downgraded to the
    /// silent no-certificate case.
    #[error("client certificate with thumbprint '{thumbprint}' not found in {store}/{location}")]
    CertificateNotFound {
        store: String,
        location: String,
        thumbprint: String,
    },

    /// The certificate store itself could not be opened
    #[error("certificate store unavailable: {0}")]
    StoreUnavailable(String),

    /// The outbound client could not be constructed
    #[error("failed to build outbound client: {0}")]
    ClientBuild(String),

    /// A dispatched request failed
    #[error("request failed: {0}")]
    Request(String),

    /// A dispatched request exceeded the route's timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type alias for outbound operations
pub type OutboundResult<T> = Result<T, OutboundError>;

/// OutboundHandler defines the port for one stage of the outbound pipeline.
///
/// The innermost handler is the transport itself; delegating handlers wrap an
/// inner handler and forward to it.
#[async_trait]
pub trait OutboundHandler: Send + Sync + 'static {
    /// Send a request through this stage (and whatever it wraps).
    async fn send(&self, request: reqwest::Request) -> OutboundResult<reqwest::Response>;
}

/// A shareable handler stage.
pub type SharedHandler = Arc<dyn OutboundHandler>;

/// A delegating-handler factory: given the handler it should wrap, return the
/// new outer handler.
pub type HandlerFactory = Arc<dyn Fn(SharedHandler) -> SharedHandler + Send + Sync>;

/// Registry resolving a route's configured delegating-handler names into an
/// ordered list of factories. Name resolution and registration live outside
/// this core; the factory only consumes the ordered result.
pub trait DelegatingHandlerRegistry: Send + Sync {
    /// The factories for this route, in configured order. The first factory
    /// ends up as the outermost handler.
    fn handlers_for(&self, route: &DownstreamRoute) -> Vec<HandlerFactory>;
}

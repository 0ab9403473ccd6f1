//! Static delegating-handler registry.
//!
//! Maps handler names to factories and resolves a route's configured name
//! list, in order. Populating the registry (and rejecting unknown names)
//! happens in the application wiring, before routes are served.
use std::collections::HashMap;

use crate::{
    core::route::DownstreamRoute,
    ports::outbound::{DelegatingHandlerRegistry, HandlerFactory},
};

#[derive(Default)]
pub struct StaticHandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl StaticHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous registration.
    pub fn register(&mut self, name: impl Into<String>, factory: HandlerFactory) {
        self.factories.insert(name.into(), factory);
    }
}

impl DelegatingHandlerRegistry for StaticHandlerRegistry {
    fn handlers_for(&self, route: &DownstreamRoute) -> Vec<HandlerFactory> {
        route
            .delegating_handlers
            .iter()
            .filter_map(|name| {
                let factory = self.factories.get(name).cloned();
                if factory.is_none() {
                    tracing::debug!(handler = %name, "no delegating handler registered under this name");
                }
                factory
            })
            .collect()
    }
}

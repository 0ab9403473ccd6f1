//! Delegating-handler chain assembly.
//!
//! Given a base transport handler and the route's ordered factory list, build
//! one composed handler. Ordering contract: the first factory in the list is
//! the outermost handler, the base transport innermost. With factories
//! `[A, B]` and transport `T`, requests traverse `A -> B -> T` and responses
//! return `T -> B -> A`.
use crate::ports::outbound::{HandlerFactory, SharedHandler};

/// Compose `factories` around `base`. The list is folded back-to-front so the
/// first factory ends up outermost; an empty list returns `base` unchanged.
pub fn assemble(base: SharedHandler, factories: &[HandlerFactory]) -> SharedHandler {
    let mut composed = base;
    for factory in factories.iter().rev() {
        composed = factory(composed);
    }
    composed
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::ports::outbound::{OutboundError, OutboundHandler, OutboundResult};

    /// Records its label on the shared trace when called, then delegates.
    struct Recorder {
        label: &'static str,
        trace: Arc<Mutex<Vec<&'static str>>>,
        inner: Option<SharedHandler>,
    }

    #[async_trait]
    impl OutboundHandler for Recorder {
        async fn send(&self, request: reqwest::Request) -> OutboundResult<reqwest::Response> {
            self.trace.lock().unwrap().push(self.label);
            match &self.inner {
                Some(inner) => inner.send(request).await,
                // Terminal handler: stop here so the test stays offline
                None => Err(OutboundError::Request("terminal".to_string())),
            }
        }
    }

    fn recording_factory(
        label: &'static str,
        trace: Arc<Mutex<Vec<&'static str>>>,
    ) -> HandlerFactory {
        Arc::new(move |inner: SharedHandler| {
            Arc::new(Recorder {
                label,
                trace: Arc::clone(&trace),
                inner: Some(inner),
            }) as SharedHandler
        })
    }

    fn probe_request() -> reqwest::Request {
        reqwest::Request::new(reqwest::Method::GET, "http://localhost/".parse().unwrap())
    }

    #[tokio::test]
    async fn first_factory_is_outermost() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let base: SharedHandler = Arc::new(Recorder {
            label: "T",
            trace: Arc::clone(&trace),
            inner: None,
        });

        let factories = vec![
            recording_factory("A", Arc::clone(&trace)),
            recording_factory("B", Arc::clone(&trace)),
        ];

        let composed = assemble(base, &factories);
        let _ = composed.send(probe_request()).await;

        assert_eq!(*trace.lock().unwrap(), vec!["A", "B", "T"]);
    }

    #[tokio::test]
    async fn empty_factory_list_returns_base_unchanged() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let base: SharedHandler = Arc::new(Recorder {
            label: "T",
            trace: Arc::clone(&trace),
            inner: None,
        });

        let composed = assemble(Arc::clone(&base), &[]);
        assert!(Arc::ptr_eq(&composed, &base));

        let _ = composed.send(probe_request()).await;
        assert_eq!(*trace.lock().unwrap(), vec!["T"]);
    }
}

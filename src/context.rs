//! Request-scoped context handed to every endpoint.
//!
//! A [`Context`] carries what a handler may need that is not part of its typed
//! input: the request id, the matched route, a cancellation token and an
//! optional deadline. The framework never interrupts a handler on its own;
//! handlers that care observe [`Context::cancelled`] or [`Context::deadline`].
//! The one hard cutoff is the shutdown drain timeout, after which remaining
//! connections are aborted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::request::Request;

#[derive(Clone, Debug)]
pub struct Context {
    request_id: u64,
    method: http::Method,
    route: Arc<str>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A detached context: never cancelled, no deadline, request id 0.
    pub fn background(route: impl Into<Arc<str>>) -> Self {
        Self {
            request_id: 0,
            method: http::Method::GET,
            route: route.into(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub(crate) fn for_request(req: &Request, route: Arc<str>) -> Self {
        Self {
            request_id: req.id,
            method: req.method.clone(),
            route,
            cancel: req.cancel.clone(),
            deadline: req.deadline,
        }
    }

    pub fn request_id(&self) -> u64 { self.request_id }
    pub fn method(&self) -> &http::Method { &self.method }

    /// The route pattern this request matched, e.g. `/thing/{id}`.
    pub fn route(&self) -> &str { &self.route }

    pub fn deadline(&self) -> Option<Instant> { self.deadline }

    /// Time left until the deadline; `None` when no deadline is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the server gives up on this request.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_context_is_never_cancelled() {
        let ctx = Context::background("/things");
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.remaining(), None);
        assert_eq!(ctx.route(), "/things");
    }

    #[tokio::test]
    async fn request_cancellation_reaches_context() {
        let token = CancellationToken::new();
        let req = Request::new(http::Method::GET, "/thing/abd").scoped(
            9,
            token.child_token(),
            Some(Instant::now() + Duration::from_secs(5)),
        );
        let ctx = Context::for_request(&req, Arc::from("/thing/{id}"));

        assert_eq!(ctx.request_id(), 9);
        assert!(ctx.remaining().is_some());

        token.cancel();
        ctx.cancelled().await;
        assert!(ctx.is_cancelled());
    }
}

//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. A route is a method, a
//! path pattern and a handler; the router extracts path parameters and
//! hands the request over. It holds no business state.
//!
//! # Patterns
//!
//! `{name}` captures one segment, `{*name}` captures the rest of the path.
//! A capture may carry a constraint, checked after the tree match:
//!
//! | Pattern | Matches |
//! |---|---|
//! | `{id:alpha}` | ASCII letters only |
//! | `{id:digit}` | ASCII digits only |
//! | `{id:alnum}` | ASCII letters and digits |
//!
//! A request that fails a constraint is treated as a miss. On a catch-all
//! the constraint applies to the whole remainder, slashes included, so
//! `{*rest:alpha}` only admits a single all-letter segment.
//!
//! # Misses
//!
//! Unknown methods, unknown paths and failed constraints all produce the same
//! `404` with the same `{"error":"not found"}` body a handler gets when it
//! reports a missing entity. A client cannot tell which case it hit.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::classify::{self, EndpointError};
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::Chain;
use crate::request::Request;
use crate::response::Response;
use crate::service::{EndpointDescriptor, Service};

/// Character class a captured segment must satisfy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Segment {
    Alpha,
    Digit,
    Alnum,
}

impl Segment {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "alpha" => Some(Self::Alpha),
            "digit" => Some(Self::Digit),
            "alnum" => Some(Self::Alnum),
            _ => None,
        }
    }

    fn admits(self, value: &str) -> bool {
        !value.is_empty()
            && match self {
                Self::Alpha => value.bytes().all(|b| b.is_ascii_alphabetic()),
                Self::Digit => value.bytes().all(|b| b.is_ascii_digit()),
                Self::Alnum => value.bytes().all(|b| b.is_ascii_alphanumeric()),
            }
    }
}

struct Route {
    handler: BoxedHandler,
    constraints: Vec<(String, Segment)>,
}

/// The application router.
///
/// Build it once at startup; it is read-only while serving. Each
/// [`Router::on`] call returns `self` so static registrations chain
/// naturally; [`Router::register`] and [`Router::endpoint`] are the fallible
/// forms used when routes come from service descriptors.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a raw handler for a method + path pair. Returns `self` for chaining.
    ///
    /// ```rust
    /// # use waypost::{Method, Request, Response, Router};
    /// # async fn liveness(_: Request) -> Response { Response::text("ok") }
    /// Router::new().on(Method::Get, "/healthz", liveness);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the pattern is invalid or conflicts with an existing route.
    /// Use [`register`](Self::register) for routes not known at compile time.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        if let Err(e) = self.register(method, path, handler.into_boxed_handler()) {
            panic!("{e}");
        }
        self
    }

    /// Registers a handler. A (method, path) pair already taken, or a pattern
    /// the tree considers conflicting, is rejected and the existing route stays.
    pub fn register(&mut self, method: Method, path: &str, handler: BoxedHandler) -> Result<(), Error> {
        let invalid = |reason: String| Error::Route {
            method: method.as_str(),
            path: path.to_owned(),
            reason,
        };

        if !path.starts_with('/') {
            return Err(invalid("path must start with `/`".to_owned()));
        }
        let (pattern, constraints) = parse_pattern(path).map_err(invalid)?;

        self.routes
            .entry(method)
            .or_default()
            .insert(pattern, Route { handler, constraints })
            .map_err(|e| invalid(e.to_string()))
    }

    /// Registers a service endpoint with `chain` folded around it.
    pub fn endpoint(&mut self, descriptor: EndpointDescriptor, chain: &Chain) -> Result<(), Error> {
        let (method, path, adapter) = descriptor.into_parts();
        self.register(method, &path, adapter.bind(chain))
    }

    /// Registers every endpoint `service` exposes, each wrapped in the
    /// service's middleware chain.
    pub fn mount<S: Service + ?Sized>(&mut self, service: &S) -> Result<(), Error> {
        let chain = service.middleware();
        for descriptor in service.endpoints() {
            tracing::debug!(
                method = descriptor.method().as_str(),
                path = descriptor.path(),
                middleware = ?chain.names(),
                "registering endpoint",
            );
            self.endpoint(descriptor, &chain)?;
        }
        Ok(())
    }

    /// Routes one request to its handler, or answers `404`.
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let Some(method) = Method::from_http(&req.method) else {
            return not_found();
        };
        match self.lookup(method, &req.path) {
            Some((handler, params)) => {
                req.params = params;
                handler.call(req).await
            }
            None => not_found(),
        }
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let route = matched.value;

        for (name, segment) in &route.constraints {
            if !matched.params.get(name).is_some_and(|v| segment.admits(v)) {
                return None;
            }
        }

        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((Arc::clone(&route.handler), params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

fn not_found() -> Response {
    classify::render(None, &EndpointError::not_found())
}

/// Strips `:kind` constraints out of `{name:kind}` captures.
fn parse_pattern(path: &str) -> Result<(String, Vec<(String, Segment)>), String> {
    let mut pattern = String::with_capacity(path.len());
    let mut constraints = Vec::new();
    let mut rest = path;

    while let Some(open) = rest.find('{') {
        pattern.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('}') else {
            return Err("unclosed `{`".to_owned());
        };
        let capture = &rest[open + 1..open + close];
        match capture.split_once(':') {
            Some((name, kind)) => {
                let segment = Segment::parse(kind)
                    .ok_or_else(|| format!("unknown segment constraint `{kind}`"))?;
                pattern.push('{');
                pattern.push_str(name);
                pattern.push('}');
                // matchit reports `{*rest}` as `rest`.
                constraints.push((name.trim_start_matches('*').to_owned(), segment));
            }
            None => {
                pattern.push('{');
                pattern.push_str(capture);
                pattern.push('}');
            }
        }
        rest = &rest[open + close + 1..];
    }
    pattern.push_str(rest);

    Ok((pattern, constraints))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counter(hits: &Arc<AtomicUsize>, body: &'static str) -> BoxedHandler {
        let hits = Arc::clone(hits);
        (move |_req: Request| {
            hits.fetch_add(1, Ordering::SeqCst);
            async move { Response::text(body) }
        })
        .into_boxed_handler()
    }

    #[test]
    fn pattern_constraints_are_stripped() {
        let (pattern, constraints) = parse_pattern("/thing/{id:alpha}/{rest}").unwrap();
        assert_eq!(pattern, "/thing/{id}/{rest}");
        assert_eq!(constraints, [("id".to_owned(), Segment::Alpha)]);

        assert!(parse_pattern("/thing/{id:hex}").is_err());
        assert!(parse_pattern("/thing/{id").is_err());
    }

    #[tokio::test]
    async fn catch_all_constraints_apply_to_the_remainder() {
        let (pattern, constraints) = parse_pattern("/files/{*rest:alpha}").unwrap();
        assert_eq!(pattern, "/files/{*rest}");
        assert_eq!(constraints, [("rest".to_owned(), Segment::Alpha)]);

        let router = Router::new().on(Method::Get, "/files/{*rest:alpha}", |req: Request| async move {
            req.param("rest").unwrap_or_default().to_owned()
        });

        let res = router.dispatch(Request::new(http::Method::GET, "/files/abc")).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body(), b"abc");

        for path in ["/files/abc/def", "/files/a1"] {
            let res = router.dispatch(Request::new(http::Method::GET, path)).await;
            assert_eq!(res.status_code(), 404, "{path}");
        }
    }

    #[tokio::test]
    async fn dispatch_invokes_only_the_matching_handler_once() {
        let get = Arc::new(AtomicUsize::new(0));
        let post = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();
        router.register(Method::Get, "/thing/{id}", counter(&get, "get")).unwrap();
        router.register(Method::Post, "/thing", counter(&post, "post")).unwrap();

        let res = router.dispatch(Request::new(http::Method::GET, "/thing/abd")).await;

        assert_eq!(res.body(), b"get");
        assert_eq!(get.load(Ordering::SeqCst), 1);
        assert_eq!(post.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn params_reach_the_handler() {
        let router = Router::new().on(Method::Get, "/thing/{id:alpha}", |req: Request| async move {
            req.param("id").unwrap_or_default().to_owned()
        });

        let res = router.dispatch(Request::new(http::Method::GET, "/thing/eek")).await;
        assert_eq!(res.body(), b"eek");
    }

    #[tokio::test]
    async fn misses_are_indistinguishable() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();
        router.register(Method::Get, "/thing/{id:alpha}", counter(&hits, "x")).unwrap();

        let unknown_path = router.dispatch(Request::new(http::Method::GET, "/nothing")).await;
        let wrong_method = router.dispatch(Request::new(http::Method::PUT, "/thing/abd")).await;
        let bad_segment = router.dispatch(Request::new(http::Method::GET, "/thing/a1")).await;
        let ext_method = router
            .dispatch(Request::new(http::Method::from_bytes(b"PURGE").unwrap(), "/thing/abd"))
            .await;

        for res in [&unknown_path, &wrong_method, &bad_segment, &ext_method] {
            assert_eq!(res.status_code(), 404);
            assert_eq!(res.body(), br#"{"error":"not found"}"#);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn duplicate_routes_are_rejected_and_first_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();
        router.register(Method::Get, "/thing/{id}", counter(&first, "first")).unwrap();

        let dup = router.register(Method::Get, "/thing/{id}", counter(&first, "second"));
        assert!(matches!(dup, Err(Error::Route { .. })));

        let renamed = router.register(Method::Get, "/thing/{name}", counter(&first, "third"));
        assert!(renamed.is_err());

        // Same path under another method is a different route.
        router.register(Method::Delete, "/thing/{id}", counter(&first, "delete")).unwrap();
    }

    #[tokio::test]
    async fn first_registration_stays_in_force() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();
        router.register(Method::Get, "/x", counter(&hits, "first")).unwrap();
        let _ = router.register(Method::Get, "/x", counter(&hits, "second"));

        let res = router.dispatch(Request::new(http::Method::GET, "/x")).await;
        assert_eq!(res.body(), b"first");
    }

    #[test]
    fn paths_must_be_absolute() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();
        assert!(router.register(Method::Get, "", counter(&hits, "x")).is_err());
        assert!(router.register(Method::Get, "thing", counter(&hits, "x")).is_err());
    }
}

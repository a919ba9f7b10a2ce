//! In-process end-to-end tests: requests go through the router, middleware,
//! adapters and the reference service, with no sockets involved.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use waypost::middleware::{Chain, Logging};
use waypost::things::{Thing, ThingService, ThingStore};
use waypost::transport::{self, param};
use waypost::{
    DecodeError, Endpoint, EndpointDescriptor, EndpointError, Method, Request, Router, Service,
};

fn things() -> Router {
    let mut router = Router::new();
    router.mount(&ThingService::seeded()).unwrap();
    router
}

fn get(path: &str) -> Request {
    Request::new(http::Method::GET, path)
}

fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn seeded_thing_is_found() {
    let res = things().dispatch(get("/thing/abd")).await;

    assert_eq!(res.status_code(), 200);
    assert_eq!(res.header("content-type"), Some("application/json"));
    assert!(std::str::from_utf8(res.body()).unwrap().contains(r#""id":"abd""#));
}

#[tokio::test]
async fn unknown_thing_is_not_found() {
    let res = things().dispatch(get("/thing/zzz")).await;

    assert_eq!(res.status_code(), 404);
    assert!(json(res.body())["error"].is_string());
}

#[tokio::test]
async fn route_miss_and_handler_miss_look_the_same() {
    let router = things();
    let handler_miss = router.dispatch(get("/thing/zzz")).await;
    let route_miss = router.dispatch(get("/nowhere")).await;
    let method_miss = router.dispatch(Request::new(http::Method::PATCH, "/thing/abd")).await;

    for res in [&route_miss, &method_miss] {
        assert_eq!(res.status_code(), handler_miss.status_code());
        assert_eq!(res.body(), handler_miss.body());
        assert_eq!(res.header("content-type"), handler_miss.header("content-type"));
    }
}

#[tokio::test]
async fn adding_twice_conflicts() {
    let router = things();
    let add = || Request::new(http::Method::POST, "/thing").with_body(r#"{"id":"go","available":true}"#);

    let first = router.dispatch(add()).await;
    assert_eq!(first.status_code(), 200);
    assert_eq!(json(first.body())["thing"]["id"], "go");

    let second = router.dispatch(add()).await;
    assert_eq!(second.status_code(), 409);
    assert!(json(second.body())["error"].as_str().unwrap().contains("go"));

    let found = router.dispatch(get("/thing/go")).await;
    assert_eq!(found.status_code(), 200);
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let router = things();
    for body in ["", "not json", r#"{"id":"","available":true}"#, r#"{"available":true}"#] {
        let res = router
            .dispatch(Request::new(http::Method::POST, "/thing").with_body(body))
            .await;
        assert_eq!(res.status_code(), 400, "body {body:?}");
        assert!(json(res.body())["error"].is_string());
    }
}

#[tokio::test]
async fn shared_store_sees_writes() {
    let store = Arc::new(ThingStore::new());
    let mut router = Router::new();
    router.mount(&ThingService::with_store(Arc::clone(&store))).unwrap();

    let res = router
        .dispatch(Request::new(http::Method::POST, "/thing").with_body(r#"{"id":"go","available":false}"#))
        .await;
    assert_eq!(res.status_code(), 200);
    assert_eq!(store.find("go"), Some(Thing::new("go", false)));
}

// ── A counting service ────────────────────────────────────────────────────────

struct Counting {
    calls: Arc<AtomicUsize>,
}

impl Service for Counting {
    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        let calls = Arc::clone(&self.calls);
        let echo = Endpoint::new(move |_ctx, id: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, EndpointError>(serde_json::json!({ "id": id })) }
        });
        vec![
            EndpointDescriptor::json(Method::Get, "/echo/{id}", echo.clone(), |req| {
                param(req, "id").map(str::to_owned)
            }),
            // Reads a parameter its route never declares.
            EndpointDescriptor::json(Method::Get, "/broken", echo, |req| {
                param(req, "id").map(str::to_owned)
            }),
        ]
    }

    fn middleware(&self) -> Chain {
        Chain::new().with(Logging::new("counting"))
    }
}

#[tokio::test]
async fn matching_request_invokes_handler_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut router = Router::new();
    router.mount(&Counting { calls: Arc::clone(&calls) }).unwrap();

    let res = router.dispatch(get("/echo/abc")).await;
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.body(), br#"{"id":"abc"}"#);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_parameter_never_reaches_the_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut router = Router::new();
    router.mount(&Counting { calls: Arc::clone(&calls) }).unwrap();

    let res = router.dispatch(get("/broken")).await;
    assert_eq!(res.status_code(), 400);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unregistered_routes_are_not_found_not_internal() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut router = Router::new();
    router.mount(&Counting { calls: Arc::clone(&calls) }).unwrap();

    for req in [
        Request::new(http::Method::POST, "/echo/abc"),
        get("/echo"),
        get("/echo/abc/def"),
    ] {
        assert_eq!(router.dispatch(req).await.status_code(), 404);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn mounting_the_same_service_twice_is_rejected() {
    let mut router = Router::new();
    router.mount(&ThingService::seeded()).unwrap();
    assert!(matches!(router.mount(&ThingService::seeded()), Err(waypost::Error::Route { .. })));
}

#[tokio::test]
async fn no_input_endpoints_ignore_the_body() {
    let hello = Endpoint::new(|_ctx, ()| async { Ok::<_, DecodeError>("hello") });
    let mut router = Router::new();
    router
        .endpoint(EndpointDescriptor::json(Method::Get, "/hello", hello, transport::no_input), &Chain::new())
        .unwrap();

    let res = router.dispatch(get("/hello").with_body("ignored")).await;
    assert_eq!(res.body(), br#""hello""#);
}

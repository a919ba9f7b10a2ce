use std::sync::Arc;

use serde::Serialize;

use super::middleware::{LoggingThings, ObservedThings};
use super::service::{StoreThings, Things};
use super::store::{Thing, ThingStore};
use crate::classify::DecodeError;
use crate::endpoint::Endpoint;
use crate::method::Method;
use crate::middleware::{Chain, Logging, Metrics, compose};
use crate::request::Request;
use crate::service::{EndpointDescriptor, Service, Shutdown};
use crate::transport::{json_body, no_input, param};

#[derive(Debug, Serialize)]
struct ThingBody {
    thing: Thing,
}

#[derive(Debug, Serialize)]
struct ThingsBody {
    things: Vec<Thing>,
}

/// The [`Things`] capability set over HTTP.
pub struct ThingService {
    things: Arc<dyn Things>,
}

impl ThingService {
    pub fn new(things: Arc<dyn Things>) -> Self {
        Self { things }
    }

    /// The seeded in-memory store, with logging and metrics decorators.
    pub fn seeded() -> Self {
        Self::with_store(Arc::new(ThingStore::seeded()))
    }

    pub fn with_store(store: Arc<ThingStore>) -> Self {
        let core: Arc<dyn Things> = Arc::new(StoreThings::new(store));
        Self::new(compose(core, [LoggingThings::layer(), ObservedThings::layer()]))
    }
}

impl Service for ThingService {
    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        let things = &self.things;
        vec![
            EndpointDescriptor::json(Method::Get, "/thing/{id:alpha}", get_thing(things), decode_id),
            EndpointDescriptor::json(Method::Get, "/things", all_things(things), no_input),
            EndpointDescriptor::json(Method::Post, "/thing", add_thing(things), decode_thing),
            EndpointDescriptor::json(Method::Delete, "/thing/{id:alpha}", remove_thing(things), decode_id),
        ]
    }

    fn middleware(&self) -> Chain {
        Chain::new().with(Logging::new("things")).with(Metrics::new("http"))
    }

    fn shutdown_hook(&self) -> Option<&dyn Shutdown> {
        self.things.as_shutdown()
    }
}

// ── Decoders ──────────────────────────────────────────────────────────────────

fn decode_id(req: &Request) -> Result<String, DecodeError> {
    param(req, "id").map(str::to_owned)
}

fn decode_thing(req: &Request) -> Result<Thing, DecodeError> {
    if req.body().is_empty() {
        return Err(DecodeError::Body("empty body".to_owned()));
    }
    let thing: Thing = json_body(req)?;
    if thing.id.is_empty() {
        return Err(DecodeError::Body("`id` must not be empty".to_owned()));
    }
    Ok(thing)
}

// ── Endpoints ─────────────────────────────────────────────────────────────────

fn get_thing(things: &Arc<dyn Things>) -> Endpoint<String, ThingBody> {
    let things = Arc::clone(things);
    Endpoint::new(move |_ctx, id: String| {
        let things = Arc::clone(&things);
        async move { things.get_thing(&id).await.map(|thing| ThingBody { thing }) }
    })
}

fn all_things(things: &Arc<dyn Things>) -> Endpoint<(), ThingsBody> {
    let things = Arc::clone(things);
    Endpoint::new(move |_ctx, ()| {
        let things = Arc::clone(&things);
        async move { things.all_things().await.map(|things| ThingsBody { things }) }
    })
}

fn add_thing(things: &Arc<dyn Things>) -> Endpoint<Thing, ThingBody> {
    let things = Arc::clone(things);
    Endpoint::new(move |_ctx, thing: Thing| {
        let things = Arc::clone(&things);
        async move { things.add_thing(thing).await.map(|thing| ThingBody { thing }) }
    })
}

fn remove_thing(things: &Arc<dyn Things>) -> Endpoint<String, ThingBody> {
    let things = Arc::clone(things);
    Endpoint::new(move |_ctx, id: String| {
        let things = Arc::clone(&things);
        async move { things.remove_thing(&id).await.map(|thing| ThingBody { thing }) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Router;

    fn router() -> Router {
        let mut router = Router::new();
        router.mount(&ThingService::seeded()).unwrap();
        router
    }

    fn post(body: &'static str) -> Request {
        Request::new(http::Method::POST, "/thing").with_body(body)
    }

    #[test]
    fn decode_thing_rejects_bad_bodies() {
        assert!(decode_thing(&post("")).is_err());
        assert!(decode_thing(&post("{")).is_err());
        assert!(decode_thing(&post(r#"{"id":"","available":true}"#)).is_err());
        assert_eq!(
            decode_thing(&post(r#"{"id":"go","available":false}"#)).unwrap(),
            Thing::new("go", false),
        );
    }

    #[tokio::test]
    async fn list_is_sorted() {
        let res = router().dispatch(Request::new(http::Method::GET, "/things")).await;
        assert_eq!(res.status_code(), 200);

        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        let ids: Vec<_> = body["things"].as_array().unwrap().iter()
            .map(|t| t["id"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(ids, ["abd", "eek", "yak", "yik"]);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let router = router();

        let res = router.dispatch(Request::new(http::Method::DELETE, "/thing/yak")).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body(), br#"{"thing":{"id":"yak","available":true}}"#);

        let again = router.dispatch(Request::new(http::Method::DELETE, "/thing/yak")).await;
        assert_eq!(again.status_code(), 404);
        let get = router.dispatch(Request::new(http::Method::GET, "/thing/yak")).await;
        assert_eq!(get.body(), br#"{"error":"not found"}"#);
    }

    #[test]
    fn hook_reaches_the_store() {
        assert!(ThingService::seeded().shutdown_hook().is_some());
    }
}

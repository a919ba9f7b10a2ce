//! Service-level decorators over [`Things`].
//!
//! Each wraps an `Arc<dyn Things>` and is itself a `Things`, so they stack
//! with [`compose`](crate::middleware::compose):
//!
//! ```rust
//! use std::sync::Arc;
//! use waypost::middleware::compose;
//! use waypost::things::{LoggingThings, ObservedThings, StoreThings, ThingStore, Things};
//!
//! let core: Arc<dyn Things> = Arc::new(StoreThings::new(Arc::new(ThingStore::seeded())));
//! let things = compose(core, [LoggingThings::layer(), ObservedThings::layer()]);
//! assert!(things.as_shutdown().is_some());
//! ```

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use tracing::{info, warn};

use super::service::{ThingError, Things};
use super::store::Thing;
use crate::middleware::{ServiceLayer, defer};
use crate::service::Shutdown;

pub const REQUESTS_TOTAL: &str = "things_requests_total";
pub const REQUEST_DURATION: &str = "things_request_duration_seconds";

// ── Logging ───────────────────────────────────────────────────────────────────

/// Logs every call with its method, latency and outcome.
pub struct LoggingThings {
    inner: Arc<dyn Things>,
}

impl LoggingThings {
    pub fn new(inner: Arc<dyn Things>) -> Self {
        Self { inner }
    }

    pub fn layer() -> ServiceLayer<Arc<dyn Things>> {
        Box::new(|inner: Arc<dyn Things>| -> Arc<dyn Things> { Arc::new(Self::new(inner)) })
    }
}

/// Emits one log line when dropped; `outcome` is filled in once the call returns.
struct CallLog {
    method: &'static str,
    start: Instant,
    outcome: Option<Result<(), String>>,
}

impl CallLog {
    fn start(method: &'static str) -> Self {
        Self { method, start: Instant::now(), outcome: None }
    }

    fn finish<T>(mut self, res: &Result<T, ThingError>) {
        self.outcome = Some(res.as_ref().map(|_| ()).map_err(ToString::to_string));
    }
}

impl Drop for CallLog {
    fn drop(&mut self) {
        let took_us = u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX);
        match &self.outcome {
            Some(Ok(())) => info!(method = self.method, took_us, "call"),
            Some(Err(error)) => warn!(method = self.method, took_us, error = %error, "call failed"),
            None => warn!(method = self.method, took_us, "call abandoned"),
        }
    }
}

#[async_trait]
impl Things for LoggingThings {
    async fn get_thing(&self, id: &str) -> Result<Thing, ThingError> {
        let log = CallLog::start("get_thing");
        let res = self.inner.get_thing(id).await;
        log.finish(&res);
        res
    }

    async fn all_things(&self) -> Result<Vec<Thing>, ThingError> {
        let log = CallLog::start("all_things");
        let res = self.inner.all_things().await;
        log.finish(&res);
        res
    }

    async fn add_thing(&self, thing: Thing) -> Result<Thing, ThingError> {
        let log = CallLog::start("add_thing");
        let res = self.inner.add_thing(thing).await;
        log.finish(&res);
        res
    }

    async fn remove_thing(&self, id: &str) -> Result<Thing, ThingError> {
        let log = CallLog::start("remove_thing");
        let res = self.inner.remove_thing(id).await;
        log.finish(&res);
        res
    }

    fn as_shutdown(&self) -> Option<&dyn Shutdown> {
        self.inner.as_shutdown()
    }
}

// ── Metrics ───────────────────────────────────────────────────────────────────

/// Counts calls and records their latency, labelled by method.
///
/// Emits [`REQUESTS_TOTAL`] and [`REQUEST_DURATION`].
pub struct ObservedThings {
    inner: Arc<dyn Things>,
}

impl ObservedThings {
    pub fn new(inner: Arc<dyn Things>) -> Self {
        Self { inner }
    }

    pub fn layer() -> ServiceLayer<Arc<dyn Things>> {
        Box::new(|inner: Arc<dyn Things>| -> Arc<dyn Things> { Arc::new(Self::new(inner)) })
    }
}

fn observe(method: &'static str) -> impl FnOnce() + Send {
    let start = Instant::now();
    move || {
        counter!(REQUESTS_TOTAL, "method" => method).increment(1);
        histogram!(REQUEST_DURATION, "method" => method).record(start.elapsed().as_secs_f64());
    }
}

#[async_trait]
impl Things for ObservedThings {
    async fn get_thing(&self, id: &str) -> Result<Thing, ThingError> {
        let _after = defer(observe("get_thing"));
        self.inner.get_thing(id).await
    }

    async fn all_things(&self) -> Result<Vec<Thing>, ThingError> {
        let _after = defer(observe("all_things"));
        self.inner.all_things().await
    }

    async fn add_thing(&self, thing: Thing) -> Result<Thing, ThingError> {
        let _after = defer(observe("add_thing"));
        self.inner.add_thing(thing).await
    }

    async fn remove_thing(&self, id: &str) -> Result<Thing, ThingError> {
        let _after = defer(observe("remove_thing"));
        self.inner.remove_thing(id).await
    }

    fn as_shutdown(&self) -> Option<&dyn Shutdown> {
        self.inner.as_shutdown()
    }
}

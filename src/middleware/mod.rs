//! Middleware layer.
//!
//! Middleware is the place for cross-cutting concerns: structured logging,
//! timing, metrics. It observes calls; it never rewrites them. A layer sees
//! the [`Context`] before the inner call and the [`Outcome`] after it, and
//! has no way to change the response or swap the error.
//!
//! There are two composition points:
//!
//! - **Endpoint level**: a [`Chain`] of [`Middleware`] folded around one
//!   [`Endpoint`]. The first layer added is the outermost.
//! - **Service level**: [`compose`] folds decorator constructors around a
//!   whole service value (typically an `Arc<dyn SomeTrait>`), so every
//!   operation is observed without per-endpoint wiring.
//!
//! The "after" half of a layer always runs: on success, on error, and when
//! the call is dropped midway (client gone, drain timeout, panic). That is
//! [`Outcome::Abandoned`].
//!
//! Built-in middleware:
//! - [`logging::Logging`]: one `tracing` event per call with route, latency and outcome
//! - [`metrics::Metrics`]: request counter and latency histogram via the `metrics` facade

pub mod logging;
pub mod metrics;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::classify::EndpointError;
use crate::context::Context;
use crate::endpoint::Endpoint;

pub use self::logging::Logging;
pub use self::metrics::Metrics;

// ── Middleware ────────────────────────────────────────────────────────────────

/// How the inner call finished, as seen by a layer's `after` hook.
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    Ok,
    Failed(&'a EndpointError),
    /// The call was dropped before it returned.
    Abandoned,
}

impl Outcome<'_> {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed(_) => "error",
            Self::Abandoned => "abandoned",
        }
    }
}

/// An observing layer around an endpoint.
///
/// Layers are shared across concurrent requests, so any state they update
/// (counters, histograms) must be safe for concurrent use.
pub trait Middleware: Send + Sync + 'static {
    /// Short name used in logs and debugging.
    fn name(&self) -> &'static str;

    /// Runs before the inner layer is invoked.
    fn before(&self, _ctx: &Context) {}

    /// Runs exactly once after the inner layer finishes, however it finishes.
    fn after(&self, ctx: &Context, outcome: Outcome<'_>, elapsed: Duration);
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// An ordered list of middleware, outermost first.
///
/// ```rust
/// use waypost::middleware::{Chain, Logging, Metrics};
///
/// let chain = Chain::new()
///     .with(Logging::new("get-a-thing")) // outermost: sees total latency
///     .with(Metrics::new("things"));
/// assert_eq!(chain.names(), ["logging", "metrics"]);
/// ```
#[derive(Clone, Default)]
pub struct Chain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer inside all layers added so far.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// Appends every layer of `inner` inside this chain's layers.
    pub fn then(mut self, inner: &Chain) -> Self {
        self.layers.extend(inner.layers.iter().cloned());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|m| m.name()).collect()
    }

    /// Folds the chain around `endpoint`, innermost layer first, so the
    /// first layer in the list ends up outermost.
    pub fn apply<Req, Res>(&self, endpoint: Endpoint<Req, Res>) -> Endpoint<Req, Res>
    where
        Req: Send + 'static,
        Res: Send + 'static,
    {
        self.layers
            .iter()
            .rev()
            .fold(endpoint, |next, layer| wrap(Arc::clone(layer), next))
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn wrap<Req, Res>(layer: Arc<dyn Middleware>, next: Endpoint<Req, Res>) -> Endpoint<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    Endpoint::new(move |ctx: Context, req: Req| {
        let layer = Arc::clone(&layer);
        let next = next.clone();
        async move {
            let scope = Scope::enter(layer, ctx.clone());
            let result = next.call(ctx, req).await;
            scope.exit(&result);
            result
        }
    })
}

/// Guard pairing a layer's `before` with exactly one `after`.
struct Scope {
    layer: Arc<dyn Middleware>,
    ctx: Context,
    start: Instant,
    done: bool,
}

impl Scope {
    fn enter(layer: Arc<dyn Middleware>, ctx: Context) -> Self {
        let start = Instant::now();
        layer.before(&ctx);
        Self { layer, ctx, start, done: false }
    }

    fn exit<T>(mut self, result: &Result<T, EndpointError>) {
        self.done = true;
        let outcome = match result {
            Ok(_) => Outcome::Ok,
            Err(e) => Outcome::Failed(e),
        };
        self.layer.after(&self.ctx, outcome, self.start.elapsed());
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !self.done {
            self.layer.after(&self.ctx, Outcome::Abandoned, self.start.elapsed());
        }
    }
}

// ── Service-level composition ─────────────────────────────────────────────────

/// A decorator constructor for a whole service value.
pub type ServiceLayer<S> = Box<dyn FnOnce(S) -> S + Send>;

/// Folds `layers` around `service`; the first layer ends up outermost.
///
/// ```rust
/// use waypost::middleware::{compose, ServiceLayer};
///
/// let layers: Vec<ServiceLayer<String>> = vec![
///     Box::new(|s| format!("a({s})")),
///     Box::new(|s| format!("b({s})")),
/// ];
/// assert_eq!(compose("svc".to_owned(), layers), "a(b(svc))");
/// ```
pub fn compose<S>(service: S, layers: impl IntoIterator<Item = ServiceLayer<S>>) -> S {
    let layers: Vec<_> = layers.into_iter().collect();
    layers.into_iter().rev().fold(service, |inner, layer| layer(inner))
}

/// Runs a closure when dropped: the "after" half of a hand-written decorator.
///
/// ```rust
/// use std::cell::Cell;
/// use waypost::middleware::defer;
///
/// let ran = Cell::new(false);
/// {
///     let _after = defer(|| ran.set(true));
/// }
/// assert!(ran.get());
/// ```
pub fn defer<F: FnOnce()>(f: F) -> Defer<F> {
    Defer { f: Some(f) }
}

#[must_use = "the closure runs when this guard is dropped"]
pub struct Defer<F: FnOnce()> {
    f: Option<F>,
}

impl<F: FnOnce()> Drop for Defer<F> {
    fn drop(&mut self) {
        if let Some(f) = self.f.take() {
            f();
        }
    }
}

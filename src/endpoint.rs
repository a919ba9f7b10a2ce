//! The endpoint pipeline: one unit of business logic as `(Context, Req) -> Result<Res>`.
//!
//! An [`Endpoint`] knows nothing about HTTP. It receives an already-decoded
//! request value and returns a typed response or an [`EndpointError`]. The
//! transport adapter does the decoding and encoding around it, and
//! middleware wraps it without changing its signature.
//!
//! ```text
//! async fn get_thing(ctx: Context, req: GetThing) -> Result<ThingBody, ThingError>
//!        ↓ Endpoint::new(get_thing)
//! Arc<dyn Fn(Context, GetThing) -> BoxFuture<Result<ThingBody, EndpointError>>>
//!        ↓ chain.apply(endpoint)
//! same type, with every middleware layer folded around it
//! ```
//!
//! Cloning an endpoint is one atomic increment; every in-flight request holds
//! its own clone.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::classify::EndpointError;
use crate::context::Context;

/// A heap-allocated, type-erased future.
///
/// `Send + 'a` lets tokio move the future across worker threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type EndpointFn<Req, Res> =
    dyn Fn(Context, Req) -> BoxFuture<'static, Result<Res, EndpointError>> + Send + Sync;

/// A transport-independent, type-erased async operation.
pub struct Endpoint<Req, Res> {
    inner: Arc<EndpointFn<Req, Res>>,
}

impl<Req, Res> Endpoint<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    /// Wraps any async function whose error converts into [`EndpointError`].
    pub fn new<F, Fut, E>(f: F) -> Self
    where
        F: Fn(Context, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, E>> + Send + 'static,
        E: Into<EndpointError> + 'static,
    {
        let inner: Arc<EndpointFn<Req, Res>> = Arc::new(
            move |ctx: Context, req: Req| -> BoxFuture<'static, Result<Res, EndpointError>> {
                let fut = f(ctx, req);
                Box::pin(async move { fut.await.map_err(Into::into) })
            },
        );
        Self { inner }
    }

    /// Runs the operation. Each call is independent; no state is kept between calls.
    pub fn call(&self, ctx: Context, req: Req) -> BoxFuture<'static, Result<Res, EndpointError>> {
        (self.inner)(ctx, req)
    }
}

impl<Req, Res> Clone for Endpoint<Req, Res> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

//! The transport adapter: decode → invoke → encode.
//!
//! An adapter binds one [`Endpoint`] to HTTP. For every request it:
//!
//! 1. decodes the [`Request`] into the endpoint's typed input; a failure
//!    short-circuits with `400` and the endpoint is never called;
//! 2. invokes the middleware-wrapped endpoint with a fresh [`Context`];
//! 3. encodes the typed output, or renders the error through the classifier.
//!
//! Every path ends in a well-formed [`Response`]; there is no way for an
//! adapter to return nothing.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::classify::{self, DecodeError, EndpointError};
use crate::context::Context;
use crate::endpoint::{BoxFuture, Endpoint};
use crate::handler::{BoxedHandler, ErasedHandler};
use crate::middleware::Chain;
use crate::request::Request;
use crate::response::Response;

/// Turns a buffered request into an endpoint's typed input.
pub type Decoder<Req> = Arc<dyn Fn(&Request) -> Result<Req, DecodeError> + Send + Sync>;

/// Turns an endpoint's typed output into a response. Must be total.
pub type Encoder<Res> = Arc<dyn Fn(Res) -> Response + Send + Sync>;

// ── Decoding helpers ──────────────────────────────────────────────────────────

/// Reads a required, non-empty path parameter.
pub fn param<'r>(req: &'r Request, name: &'static str) -> Result<&'r str, DecodeError> {
    match req.param(name) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DecodeError::MissingParam(name)),
    }
}

/// Parses the body as JSON.
pub fn json_body<T: DeserializeOwned>(req: &Request) -> Result<T, DecodeError> {
    serde_json::from_slice(req.body()).map_err(|e| DecodeError::Body(e.to_string()))
}

/// Decoder for operations that take no input.
pub fn no_input(_req: &Request) -> Result<(), DecodeError> {
    Ok(())
}

/// Encoder writing `200 OK` with the value as JSON.
pub fn json<Res: Serialize>(res: Res) -> Response {
    Response::builder().json_value(&res)
}

// ── Adapter ───────────────────────────────────────────────────────────────────

pub(crate) struct Adapter<Req, Res> {
    route: Arc<str>,
    endpoint: Endpoint<Req, Res>,
    decode: Decoder<Req>,
    encode: Encoder<Res>,
}

impl<Req, Res> Adapter<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    pub(crate) fn new(
        route: Arc<str>,
        endpoint: Endpoint<Req, Res>,
        decode: Decoder<Req>,
        encode: Encoder<Res>,
    ) -> Self {
        Self { route, endpoint, decode, encode }
    }
}

impl<Req, Res> ErasedHandler for Adapter<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Response> {
        let ctx = Context::for_request(&req, Arc::clone(&self.route));

        // Decoding is synchronous over the buffered body; failure never
        // reaches the endpoint.
        let input = match (self.decode)(&req) {
            Ok(input) => input,
            Err(e) => {
                let res = classify::render(Some(&ctx), &EndpointError::from(e));
                return Box::pin(async move { res });
            }
        };

        let endpoint = self.endpoint.clone();
        let encode = Arc::clone(&self.encode);
        Box::pin(async move {
            match endpoint.call(ctx.clone(), input).await {
                Ok(out) => encode(out),
                Err(e) => classify::render(Some(&ctx), &e),
            }
        })
    }
}

/// A typed adapter waiting for its service's middleware.
///
/// Object-safe so that descriptors with different `Req`/`Res` can share a
/// list; binding applies the chain to the typed endpoint and erases it.
pub(crate) trait Bind: Send {
    fn bind(self: Box<Self>, chain: &Chain) -> BoxedHandler;
}

impl<Req, Res> Bind for Adapter<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn bind(self: Box<Self>, chain: &Chain) -> BoxedHandler {
        let Adapter { route, endpoint, decode, encode } = *self;
        Arc::new(Adapter { route, endpoint: chain.apply(endpoint), decode, encode })
    }
}

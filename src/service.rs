//! Service descriptors: what a business component exposes to the server.
//!
//! A [`Service`] lists its operations as [`EndpointDescriptor`]s, may supply a
//! middleware [`Chain`] applied to every one of them, and may declare a
//! [`Shutdown`] hook the server calls before draining connections.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::classify::DecodeError;
use crate::endpoint::Endpoint;
use crate::method::Method;
use crate::middleware::Chain;
use crate::request::Request;
use crate::response::Response;
use crate::transport::{self, Adapter, Bind};

/// One network-exposed operation: route, endpoint, decoder and encoder.
///
/// Built once while the service is registered, then consumed by the router.
pub struct EndpointDescriptor {
    method: Method,
    path: String,
    adapter: Box<dyn Bind>,
}

impl EndpointDescriptor {
    pub fn new<Req, Res, D, E>(
        method: Method,
        path: impl Into<String>,
        endpoint: Endpoint<Req, Res>,
        decode: D,
        encode: E,
    ) -> Self
    where
        Req: Send + 'static,
        Res: Send + 'static,
        D: Fn(&Request) -> Result<Req, DecodeError> + Send + Sync + 'static,
        E: Fn(Res) -> Response + Send + Sync + 'static,
    {
        let path = path.into();
        let adapter = Adapter::new(
            Arc::from(path.as_str()),
            endpoint,
            Arc::new(decode),
            Arc::new(encode),
        );
        Self { method, path, adapter: Box::new(adapter) }
    }

    /// Same as [`new`](Self::new) with the JSON encoder.
    pub fn json<Req, Res, D>(
        method: Method,
        path: impl Into<String>,
        endpoint: Endpoint<Req, Res>,
        decode: D,
    ) -> Self
    where
        Req: Send + 'static,
        Res: Serialize + Send + 'static,
        D: Fn(&Request) -> Result<Req, DecodeError> + Send + Sync + 'static,
    {
        Self::new(method, path, endpoint, decode, transport::json::<Res>)
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }

    pub(crate) fn into_parts(self) -> (Method, String, Box<dyn Bind>) {
        (self.method, self.path, self.adapter)
    }
}

impl fmt::Debug for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Hook run once when the server starts shutting down.
pub trait Shutdown: Send + Sync {
    fn shutdown(&self);
}

/// The capability set a business component exposes to the server.
pub trait Service: Send + Sync + 'static {
    /// Every operation this service serves, one descriptor per (method, path).
    fn endpoints(&self) -> Vec<EndpointDescriptor>;

    /// Middleware folded around every endpoint of this service.
    fn middleware(&self) -> Chain {
        Chain::new()
    }

    /// The shutdown hook, if this service has one.
    fn shutdown_hook(&self) -> Option<&dyn Shutdown> {
        None
    }
}

//! # waypost
//!
//! A small HTTP service framework: typed endpoints behind a radix-tree
//! router, observing middleware, uniform error rendering and a lifecycle
//! manager with graceful shutdown.
//!
//! ## The contract
//!
//! A business component implements [`Service`]: it lists its operations as
//! [`EndpointDescriptor`]s (route + [`Endpoint`] + decoder + encoder), may
//! supply a middleware [`Chain`](middleware::Chain) and may declare a
//! [`Shutdown`] hook. waypost owns the rest:
//!
//! - Radix-tree routing: O(path-length) lookup via [`matchit`], with
//!   `{id:alpha}`-style segment constraints
//! - Decode → invoke → encode, with decode failures short-circuiting to `400`
//! - Error classification: every endpoint error maps to one [`ErrorClass`]
//!   and one status, rendered as `{"error": "…"}`
//! - Lifecycle: start, wait for SIGTERM / Ctrl-C, drain in-flight requests
//!   within a deadline, stop
//!
//! TLS, authentication and rate limiting are left to the proxy in front.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use waypost::transport::{self, param};
//! use waypost::{Config, Endpoint, EndpointDescriptor, EndpointError, Method, Server, Service};
//!
//! struct Greeter;
//!
//! impl Service for Greeter {
//!     fn endpoints(&self) -> Vec<EndpointDescriptor> {
//!         let hello = Endpoint::new(|_ctx, name: String| async move {
//!             Ok::<_, EndpointError>(serde_json::json!({ "hello": name }))
//!         });
//!         vec![EndpointDescriptor::json(Method::Get, "/hello/{name:alpha}", hello, |req| {
//!             param(req, "name").map(str::to_owned)
//!         })]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), waypost::Error> {
//!     Server::run(Config::with_addr("0.0.0.0:3000")?, Greeter).await
//! }
//! ```
//!
//! Install a `tracing` subscriber in your binary to see the server's logs;
//! the library never installs one itself.

mod classify;
mod config;
mod context;
mod endpoint;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod service;
mod shutdown;
mod status;
#[cfg(test)]
mod testing;

pub mod health;
pub mod middleware;
pub mod things;
pub mod transport;

pub use classify::{
    BoxError, Classify, DecodeError, EndpointError, ErrorClass, Unimplemented, classify, render,
    status_for,
};
pub use config::Config;
pub use context::Context;
pub use endpoint::{BoxFuture, Endpoint};
pub use error::Error;
pub use handler::Handler;
pub use method::{Method, UnknownMethod};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::{LifecycleState, Server};
pub use service::{EndpointDescriptor, Service, Shutdown};
pub use shutdown::{ShutdownSignal, Trigger};
pub use status::Status;

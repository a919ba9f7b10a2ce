//! Infrastructure error type.

use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;

/// The error type returned by waypost's fallible setup and lifecycle operations.
///
/// Request-level failures (404, 409, …) never show up here: they are
/// [`EndpointError`](crate::EndpointError)s rendered into responses. This
/// type covers the server itself: parsing its address, building its route
/// table, binding, and the listener dying underneath it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid listen address `{addr}`: {source}")]
    InvalidAddr {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error("invalid route `{method} {path}`: {reason}")]
    Route {
        method: &'static str,
        path: String,
        reason: String,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server already started")]
    AlreadyStarted,

    #[error("listener failed: {0}")]
    Listener(#[source] Arc<std::io::Error>),

    #[error("listener task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

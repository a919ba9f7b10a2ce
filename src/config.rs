//! Server configuration.
//!
//! A plain value handed to [`Server::new`](crate::Server::new). Nothing in the
//! library reads the environment; binaries decide where settings come from.
//!
//! ```rust
//! use std::time::Duration;
//! use waypost::Config;
//!
//! let config = Config::with_addr("127.0.0.1:0")?
//!     .shutdown_timeout(Duration::from_secs(5))
//!     .handle_signals(false);
//! assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
//! # Ok::<(), waypost::Error>(())
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::Error;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8833";
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct Config {
    /// Listen address.
    pub addr: SocketAddr,
    /// Drain budget used by [`Server::run`](crate::Server::run).
    pub shutdown_timeout: Duration,
    /// When set, every request context carries `now + request_timeout` as its
    /// deadline. Handlers observe it; nothing is interrupted.
    pub request_timeout: Option<Duration>,
    /// Install the `SIGINT`/`SIGTERM` watcher on start.
    pub handle_signals: bool,
    /// Serve `/healthz` and `/readyz`.
    pub health_routes: bool,
}

impl Config {
    /// Default settings listening on `addr`.
    pub fn with_addr(addr: &str) -> Result<Self, Error> {
        let addr = addr.parse().map_err(|source| Error::InvalidAddr {
            addr: addr.to_owned(),
            source,
        })?;
        Ok(Self { addr, ..Self::default() })
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn handle_signals(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    pub fn health_routes(mut self, enabled: bool) -> Self {
        self.health_routes = enabled;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8833)),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            request_timeout: None,
            handle_signals: true,
            health_routes: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.addr.to_string(), DEFAULT_ADDR);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert!(config.request_timeout.is_none());
        assert!(config.handle_signals);
        assert!(config.health_routes);
    }

    #[test]
    fn bad_addresses_are_errors() {
        let err = Config::with_addr("localhost:port").unwrap_err();
        assert!(matches!(err, Error::InvalidAddr { ref addr, .. } if addr == "localhost:port"));
    }
}

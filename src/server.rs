//! HTTP server and graceful shutdown.
//!
//! # Lifecycle
//!
//! ```text
//! Starting ──start()──▶ Running ──trigger / stop()──▶ ShuttingDown ──▶ Stopped
//!     └──────────────────── bind failure / stop() ──────────────────────▲
//! ```
//!
//! [`Server::start`] binds and hands the listener to a background task, then
//! returns. [`Server::await_shutdown`] waits for the first trigger: `SIGINT`
//! or `SIGTERM`, a fatal listener error, or a [`ShutdownSignal::fire`] call.
//! A signal or a listener failure moves the server to `ShuttingDown` as soon
//! as it arrives, so `/readyz` turns `503` before the drain starts.
//! [`Server::stop`] then:
//! 1. runs the service's shutdown hook, if it declares one;
//! 2. stops `listener.accept()`, so no new connections are made;
//! 3. lets in-flight requests finish until the timeout;
//! 4. cancels every request context and aborts what is left.
//!
//! Aborting ends HTTP/1 connections together with their handlers. An HTTP/2
//! stream runs on its own task, outside the connection; after the cutoff its
//! handler only sees the cancelled context and may keep running after `stop`
//! returns.
//!
//! A drain timeout is logged, never escalated: `stop` always returns within
//! the timeout plus the time it takes to abort the remaining tasks.
//!
//! # Kubernetes
//!
//! Kubernetes sends **SIGTERM** and waits `terminationGracePeriodSeconds`
//! (default 30 s) before SIGKILL. Keep [`Config::shutdown_timeout`] below it.

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classify::{self, DecodeError, EndpointError};
use crate::config::Config;
use crate::error::Error;
use crate::handler::Handler;
use crate::health;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::service::Service;
use crate::shutdown::{self, ShutdownSignal, Trigger};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

/// The HTTP server.
pub struct Server {
    config: Config,
    service: Box<dyn Service>,
    shared: Arc<Shared>,
    state: Arc<watch::Sender<LifecycleState>>,
    signal: ShutdownSignal,
    stop_accepting: CancellationToken,
    local_addr: Option<SocketAddr>,
    accept: Option<JoinHandle<Connections>>,
    signals: Option<JoinHandle<()>>,
}

/// What every connection task shares.
struct Shared {
    router: Router,
    /// Parent of every request's cancellation token.
    requests: CancellationToken,
    next_id: AtomicU64,
    request_timeout: Option<Duration>,
}

/// Live connections handed back by the accept loop for draining.
struct Connections {
    tasks: JoinSet<()>,
    graceful: GracefulShutdown,
}

impl Server {
    /// Builds the routing table for `service`. Nothing is bound yet.
    ///
    /// Fails if two of the service's endpoints claim the same route, or if a
    /// route collides with the health probes.
    pub fn new(config: Config, service: impl Service) -> Result<Self, Error> {
        let (state, _) = watch::channel(LifecycleState::Starting);

        let mut router = Router::new();
        router.mount(&service)?;
        if config.health_routes {
            router.register(Method::Get, "/healthz", health::liveness.into_boxed_handler())?;
            router.register(
                Method::Get,
                "/readyz",
                health::readiness(state.subscribe()).into_boxed_handler(),
            )?;
        }

        let shared = Arc::new(Shared {
            router,
            requests: CancellationToken::new(),
            next_id: AtomicU64::new(0),
            request_timeout: config.request_timeout,
        });

        Ok(Self {
            config,
            service: Box::new(service),
            shared,
            state: Arc::new(state),
            signal: ShutdownSignal::new(),
            stop_accepting: CancellationToken::new(),
            local_addr: None,
            accept: None,
            signals: None,
        })
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// The bound address, once started. Useful with port `0`.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle for requesting shutdown from elsewhere in the application.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    /// Binds the listener and starts accepting in the background.
    ///
    /// Returns the bound address as soon as the listener is up. A bind
    /// failure leaves the server `Stopped`; there is no retry.
    pub async fn start(&mut self) -> Result<SocketAddr, Error> {
        if self.state() != LifecycleState::Starting {
            return Err(Error::AlreadyStarted);
        }

        let addr = self.config.addr;
        let bound = match TcpListener::bind(addr).await {
            Ok(listener) => listener.local_addr().map(|local| (listener, local)),
            Err(e) => Err(e),
        };
        let (listener, local) = match bound {
            Ok(v) => v,
            Err(source) => {
                error!(addr = %addr, error = %source, "bind failed");
                self.state.send_replace(LifecycleState::Stopped);
                return Err(Error::Bind { addr, source });
            }
        };

        self.accept = Some(tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.shared),
            Arc::clone(&self.state),
            self.signal.clone(),
            self.stop_accepting.clone(),
        )));
        if self.config.handle_signals {
            self.signals = Some(tokio::spawn(watch_signals(
                Arc::clone(&self.state),
                self.signal.clone(),
            )));
        }

        self.local_addr = Some(local);
        self.state.send_replace(LifecycleState::Running);
        info!(addr = %local, "listening");
        Ok(local)
    }

    /// Waits for the first shutdown trigger. A running server is
    /// `ShuttingDown` once this returns.
    pub async fn await_shutdown(&self) -> Trigger {
        let trigger = self.signal.triggered().await;
        begin_shutdown(&self.state);
        trigger
    }

    /// Stops the server, draining in-flight requests for up to `timeout`.
    ///
    /// Calling it again once `Stopped` does nothing.
    pub async fn stop(&mut self, timeout: Duration) -> Result<(), Error> {
        if self.state() == LifecycleState::Stopped {
            return Ok(());
        }
        let deadline = tokio::time::Instant::now() + timeout;

        self.state.send_replace(LifecycleState::ShuttingDown);
        // Wakes anyone in await_shutdown; keeps an earlier reason if there is one.
        self.signal.fire(Trigger::Requested);
        info!(timeout_ms = timeout.as_millis() as u64, "shutting down");

        if let Some(hook) = self.service.shutdown_hook() {
            hook.shutdown();
        }
        if let Some(watcher) = self.signals.take() {
            watcher.abort();
        }

        self.stop_accepting.cancel();
        let result = match self.accept.take() {
            Some(accept) => match accept.await {
                Ok(conns) => {
                    self.drain(conns, deadline).await;
                    Ok(())
                }
                Err(e) => Err(Error::Task(e)),
            },
            None => Ok(()),
        };

        self.state.send_replace(LifecycleState::Stopped);
        info!("stopped");
        result
    }

    /// Builds a server and [`serve`](Self::serve)s it.
    ///
    /// ```rust,no_run
    /// # use waypost::{Config, Server, things::ThingService};
    /// # async fn run() -> Result<(), waypost::Error> {
    /// Server::run(Config::default(), ThingService::seeded()).await
    /// # }
    /// ```
    pub async fn run(config: Config, service: impl Service) -> Result<(), Error> {
        Server::new(config, service)?.serve().await
    }

    /// Start, wait for a trigger, stop with [`Config::shutdown_timeout`].
    ///
    /// Returns the listener's error when that is what ended the run.
    pub async fn serve(&mut self) -> Result<(), Error> {
        self.start().await?;

        let trigger = self.await_shutdown().await;
        info!(reason = %trigger, "shutdown triggered");
        self.stop(self.config.shutdown_timeout).await?;

        exit_result(&trigger)
    }

    async fn drain(&self, conns: Connections, deadline: tokio::time::Instant) {
        let Connections { mut tasks, graceful } = conns;
        info!(in_flight = tasks.len(), "draining connections");

        match tokio::time::timeout_at(deadline, graceful.shutdown()).await {
            Ok(()) => info!("drain complete"),
            Err(_) => {
                warn!(remaining = tasks.len(), "drain timeout elapsed, aborting connections");
                self.shared.requests.cancel();
                tasks.abort_all();
            }
        }
        while tasks.join_next().await.is_some() {}
    }
}

/// `Running` becomes `ShuttingDown`; any other state is left alone.
fn begin_shutdown(state: &watch::Sender<LifecycleState>) {
    state.send_if_modified(|s| {
        let running = *s == LifecycleState::Running;
        if running {
            *s = LifecycleState::ShuttingDown;
        }
        running
    });
}

/// How a finished run reports the trigger that ended it.
fn exit_result(trigger: &Trigger) -> Result<(), Error> {
    match trigger {
        Trigger::Listener(e) => Err(Error::Listener(Arc::clone(e))),
        Trigger::Signal(_) | Trigger::Requested => Ok(()),
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop_accepting.cancel();
        if let Some(watcher) = self.signals.take() {
            watcher.abort();
        }
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

async fn accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    state: Arc<watch::Sender<LifecycleState>>,
    signal: ShutdownSignal,
    stop: CancellationToken,
) -> Connections {
    // `auto::Builder` speaks HTTP/1.1 and HTTP/2, whatever the client negotiates.
    let builder = ConnBuilder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            // Stop first, so a queued backlog does not delay shutdown.
            biased;

            () = stop.cancelled() => break,

            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) if is_transient(&e) => {
                        debug!(error = %e, "accept error");
                        continue;
                    }
                    Err(e) => {
                        error!(error = %e, "listener failed");
                        begin_shutdown(&state);
                        signal.fire(Trigger::Listener(Arc::new(e)));
                        break;
                    }
                };

                let shared = Arc::clone(&shared);
                let svc = service_fn(move |req| {
                    let shared = Arc::clone(&shared);
                    async move { Ok::<_, Infallible>(shared.handle(req).await.into_inner()) }
                });
                let conn = builder.serve_connection(TokioIo::new(stream), svc).into_owned();
                let conn = graceful.watch(conn);

                tasks.spawn(async move {
                    if let Err(e) = conn.await {
                        debug!(peer = %peer, error = %e, "connection error");
                    }
                });
            }

            // Reap finished connections so the set does not grow without bound.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    Connections { tasks, graceful }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

async fn watch_signals(state: Arc<watch::Sender<LifecycleState>>, signal: ShutdownSignal) {
    match shutdown::wait_for_signal().await {
        Ok(name) => {
            info!(signal = name, "shutdown signal received");
            begin_shutdown(&state);
            signal.fire(Trigger::Signal(name));
        }
        Err(e) => warn!(error = %e, "could not install signal handlers"),
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

impl Shared {
    /// Buffers the body, scopes the request and routes it. Never fails: body
    /// errors become `400`, everything else is the router's answer.
    async fn handle(&self, req: hyper::Request<Incoming>) -> Response {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (parts, body) = req.into_parts();

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                debug!(request_id = id, error = %e, "failed to read request body");
                let err = EndpointError::from(DecodeError::Body(e.to_string()));
                return classify::render(None, &err);
            }
        };

        let deadline = self.request_timeout.map(|t| std::time::Instant::now() + t);
        let req = Request::from_parts(parts, body)
            .scoped(id, self.requests.child_token(), deadline);
        self.router.dispatch(req).await
    }
}

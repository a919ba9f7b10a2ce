//! Shutdown triggers.
//!
//! A [`ShutdownSignal`] is the one-shot rendezvous between whatever decides the
//! server should stop (an OS signal, a fatal listener error, a caller) and the
//! code waiting for that decision. The first reason recorded wins; later
//! calls to [`ShutdownSignal::fire`] are ignored.

use std::fmt;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Why the server was asked to stop.
#[derive(Clone, Debug)]
pub enum Trigger {
    /// The process received `SIGINT` or `SIGTERM`.
    Signal(&'static str),
    /// [`ShutdownSignal::fire`] was called by the application.
    Requested,
    /// The listener failed with a non-transient error.
    Listener(Arc<io::Error>),
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(name) => write!(f, "signal {name}"),
            Self::Requested => f.write_str("requested"),
            Self::Listener(e) => write!(f, "listener error: {e}"),
        }
    }
}

/// Clonable handle; all clones observe the same trigger.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
    reason: Arc<Mutex<Option<Trigger>>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `reason` and wakes every waiter. Returns `false` if a reason was
    /// already recorded, in which case nothing changes.
    pub fn fire(&self, reason: Trigger) -> bool {
        {
            let mut slot = self.reason.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(reason);
        }
        self.token.cancel();
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The recorded reason, if any.
    pub fn reason(&self) -> Option<Trigger> {
        self.reason.lock().clone()
    }

    /// Waits for the first trigger and returns it. Resolves immediately if
    /// the signal already fired.
    pub async fn triggered(&self) -> Trigger {
        self.token.cancelled().await;
        // The slot is written before the token is cancelled.
        self.reason().unwrap_or(Trigger::Requested)
    }
}

/// Resolves on the first `SIGINT` or `SIGTERM` and returns its name.
///
/// On non-Unix targets only Ctrl-C is available. Fails if a handler could not
/// be installed.
pub(crate) async fn wait_for_signal() -> io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => Ok("SIGTERM"),
            _ = sigint.recv() => Ok("SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("ctrl-c")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn first_reason_wins() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());

        assert!(signal.fire(Trigger::Signal("SIGTERM")));
        assert!(!signal.fire(Trigger::Requested));

        assert!(signal.is_triggered());
        assert!(matches!(signal.triggered().await, Trigger::Signal("SIGTERM")));
    }

    #[tokio::test]
    async fn clones_share_the_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.triggered().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.fire(Trigger::Listener(Arc::new(io::Error::other("boom"))));

        let reason = handle.await.unwrap();
        assert!(matches!(reason, Trigger::Listener(ref e) if e.to_string() == "boom"));
        assert_eq!(reason.to_string(), "listener error: boom");
    }
}

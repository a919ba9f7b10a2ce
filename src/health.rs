//! Built-in Kubernetes health-check handlers.
//!
//! Kubernetes asks two questions. The server answers them when
//! [`Config::health_routes`](crate::Config::health_routes) is on.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Readiness follows the lifecycle: `200 ready` while `Running`, `503 not
//! ready` before start and from the moment shutdown begins, so the load balancer
//! stops routing before connections are drained.

use tokio::sync::watch;

use crate::handler::Handler;
use crate::server::LifecycleState;
use crate::status::Status;
use crate::{Request, Response};

/// Liveness probe. Always `200 OK` with body `"ok"`.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// Readiness probe bound to the server's lifecycle state.
pub fn readiness(state: watch::Receiver<LifecycleState>) -> impl Handler {
    move |_req: Request| {
        let running = *state.borrow() == LifecycleState::Running;
        async move {
            if running {
                Response::text("ready")
            } else {
                Response::builder().status(Status::ServiceUnavailable).text("not ready")
            }
        }
    }
}

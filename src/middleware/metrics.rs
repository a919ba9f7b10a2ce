//! Request counter and latency histogram through the `metrics` facade.
//!
//! Which recorder receives the values (Prometheus, statsd, nothing) is the
//! deployment's choice; without one installed every update is a no-op.

use std::time::Duration;

use metrics::{counter, histogram};

use super::{Middleware, Outcome};
use crate::context::Context;

/// Counts calls and records their latency, labelled by route and outcome.
///
/// Emits `{prefix}_requests_total` and `{prefix}_request_duration_seconds`.
#[derive(Debug, Clone)]
pub struct Metrics {
    requests: String,
    duration: String,
}

impl Metrics {
    pub fn new(prefix: &str) -> Self {
        Self {
            requests: format!("{prefix}_requests_total"),
            duration: format!("{prefix}_request_duration_seconds"),
        }
    }
}

impl Middleware for Metrics {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn after(&self, ctx: &Context, outcome: Outcome<'_>, elapsed: Duration) {
        let route = ctx.route().to_owned();
        let class = match outcome {
            Outcome::Failed(err) => err.class().as_str(),
            other => other.as_str(),
        };

        counter!(self.requests.clone(), "route" => route.clone(), "outcome" => class)
            .increment(1);
        histogram!(self.duration.clone(), "route" => route).record(elapsed.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{EndpointError, ErrorClass};
    use crate::endpoint::Endpoint;
    use crate::middleware::Chain;
    use crate::testing::Capture;

    #[test]
    fn counts_calls_by_route_and_outcome() {
        let capture = Capture::default();
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let endpoint = Chain::new().with(Metrics::new("t")).apply(Endpoint::new(
            |_ctx, fail: bool| async move {
                if fail {
                    Err(EndpointError::new(ErrorClass::Conflict, "dup"))
                } else {
                    Ok(())
                }
            },
        ));

        metrics::with_local_recorder(&capture, || {
            rt.block_on(async {
                let ctx = Context::background("/x");
                endpoint.call(ctx.clone(), false).await.unwrap();
                endpoint.call(ctx.clone(), false).await.unwrap();
                endpoint.call(ctx, true).await.unwrap_err();
            });
        });

        assert_eq!(capture.get("t_requests_total{outcome=ok,route=/x}"), 2);
        assert_eq!(capture.get("t_requests_total{outcome=conflict,route=/x}"), 1);
        assert_eq!(capture.get("t_request_duration_seconds{route=/x}"), 3);
    }
}

//! Per-call structured logging.

use std::time::Duration;

use tracing::{info, warn};

use super::{Middleware, Outcome};
use crate::context::Context;

/// Emits one `tracing` event per call.
///
/// `label` plays the role of a logger scoped with a fixed key, e.g.
/// `Logging::new("get-a-thing")`. Successful calls log at `info`, failed and
/// abandoned calls at `warn`.
#[derive(Debug, Clone)]
pub struct Logging {
    label: &'static str,
}

impl Logging {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl Middleware for Logging {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn after(&self, ctx: &Context, outcome: Outcome<'_>, elapsed: Duration) {
        let took_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        match outcome {
            Outcome::Ok => info!(
                label = self.label,
                request_id = ctx.request_id(),
                route = ctx.route(),
                took_us,
                outcome = outcome.as_str(),
                "call finished",
            ),
            Outcome::Failed(err) => warn!(
                label = self.label,
                request_id = ctx.request_id(),
                route = ctx.route(),
                took_us,
                outcome = outcome.as_str(),
                class = %err.class(),
                error = %err,
                "call failed",
            ),
            Outcome::Abandoned => warn!(
                label = self.label,
                request_id = ctx.request_id(),
                route = ctx.route(),
                took_us,
                outcome = outcome.as_str(),
                "call abandoned before completion",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::EndpointError;
    use crate::endpoint::Endpoint;
    use crate::middleware::Chain;

    #[tokio::test]
    async fn passes_results_through_untouched() {
        let chain = Chain::new().with(Logging::new("echo"));
        let echo = chain.apply(Endpoint::new(|_ctx, s: String| async move {
            Ok::<_, EndpointError>(s)
        }));

        let out = echo.call(Context::background("/echo"), "abd".to_owned()).await.unwrap();
        assert_eq!(out, "abd");
    }
}

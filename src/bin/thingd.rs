//! `thingd`: the thing-lookup service.
//!
//! | Variable | Default |
//! |---|---|
//! | `THINGD_ADDR` | `0.0.0.0:8833` |
//! | `THINGD_SHUTDOWN_TIMEOUT_SECS` | `30` |
//! | `RUST_LOG` | `info` |

use std::process::ExitCode;
use std::time::Duration;

use tracing::error;
use tracing_subscriber::EnvFilter;
use waypost::things::ThingService;
use waypost::{Config, Server};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

fn config_from_env() -> Result<Config, String> {
    let mut config = match std::env::var("THINGD_ADDR") {
        Ok(addr) => Config::with_addr(&addr).map_err(|e| e.to_string())?,
        Err(_) => Config::default(),
    };
    if let Ok(secs) = std::env::var("THINGD_SHUTDOWN_TIMEOUT_SECS") {
        let secs: u64 = secs
            .parse()
            .map_err(|e| format!("THINGD_SHUTDOWN_TIMEOUT_SECS `{secs}`: {e}"))?;
        config = config.shutdown_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match config_from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match Server::run(config, ThingService::seeded()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "thingd exited");
            ExitCode::FAILURE
        }
    }
}

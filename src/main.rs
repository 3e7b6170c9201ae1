//! fmacd - file-operation access control daemon.
//!
//! Admits callers that present a signed, time-boxed challenge and grants
//! them an escalated identity and/or a capability handle. Separately,
//! answers path authorization queries from a rule table administered over
//! a control socket.

mod caller;
mod caps;
mod config;
mod diagnostics;
mod error;
mod handlers;
mod http;
mod metrics;
mod network;
mod privilege;
mod rules;
mod security;
mod state;
mod telemetry;

use crate::config::Config;
use crate::network::Gateway;
use crate::security::{AdmissionEngine, SystemClock};
use crate::state::Gate;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "fmacd.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s) in {}",
            errors.len(),
            config_path
        ));
    }
    config.escalation.warn_inconsistent();

    info!(
        name = %config.server.name,
        scheme = ?config.admission.scheme,
        outcomes = ?config.admission.outcomes,
        "Starting fmacd"
    );

    // SECURITY: Refuse to start with a short TOTP secret.
    // A short secret makes codes guessable offline from a few observed signatures.
    let allow_weak_secret = std::env::var("FMACD_ALLOW_WEAK_SECRET").is_ok();
    let engine = match AdmissionEngine::from_config(
        &config.admission,
        Arc::new(SystemClock),
        allow_weak_secret,
    ) {
        Ok(engine) => engine,
        Err(e @ crate::error::KeyError::WeakSecret(_)) => {
            error!("FATAL: {e}");
            error!("  Generate a secure secret with:");
            error!("    head -c 20 /dev/urandom | base32");
            error!("");
            error!("  For testing only, set FMACD_ALLOW_WEAK_SECRET=1 to bypass this check.");
            return Err(e.into());
        }
        Err(e) => {
            error!(code = e.error_code(), error = %e, "Unusable admission key material");
            return Err(e.into());
        }
    };
    if allow_weak_secret && config.admission.totp_key().len() < security::admission::MIN_SECRET_LEN {
        tracing::warn!("INSECURE: Running with a weak totp_secret (allowed via FMACD_ALLOW_WEAK_SECRET)");
    }

    let (gate, issue_worker) = Gate::new(&config, engine);
    let gate = Arc::new(gate);

    // Prometheus metrics are optional.
    // Convention: metrics_port = 0 disables the HTTP endpoint (used by tests).
    let metrics_port = config.server.metrics_port;
    if metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        metrics::init();
        info!("Metrics initialized");

        tokio::spawn(async move {
            http::run_http_server(metrics_port).await;
        });
        info!(port = metrics_port, "Prometheus HTTP server started");
    }

    // Deferred capability issuance runs on its own task.
    tokio::spawn(issue_worker.run());

    // Start rate limiter pruning task (runs every 5 minutes)
    {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                gate.limiter.cleanup();
                tracing::debug!(tracked = gate.limiter.tracked(), "Rate limiters pruned");
            }
        });
    }
    info!("Rate limiter pruning task started");

    let gateway = Gateway::bind(&config.listen, Arc::clone(&gate))?;

    gateway
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("fmacd stopped");
    Ok(())
}

//! Start command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use keylink_core::gate::AccessGate;
use keylink_core::rate_limit::RateLimiter;
use keylink_core::web::WebServer;

use super::{GlobalArgs, StartArgs};

/// Run the start command.
pub async fn run(global: &GlobalArgs, args: StartArgs) -> Result<()> {
    let mut config = super::load_config(global)?;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    let db = super::open_database(&config)?;

    let limiter = Arc::new(RateLimiter::new(
        config.security.rate_limit,
        config.security.rate_window,
    ));
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let reset_task = limiter.spawn_reset_task(shutdown_tx.subscribe());

    let gate = AccessGate::new(
        Arc::clone(&limiter),
        db.attempts(),
        db.links(),
        config.security.failed_attempt_limit,
    );

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    println!();
    println!("Keylink v{}", keylink_core::VERSION);
    println!("{}", "-".repeat(37));
    println!("  Listening on   {addr}");
    println!("  Database       {}", config.database_path().display());
    println!(
        "  Rate limit     {} requests / {}s",
        config.security.rate_limit,
        config.security.rate_window.as_secs()
    );
    println!("  Lockout after  {} failures", config.security.failed_attempt_limit);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    let result = WebServer::new(gate).run(listener, shutdown_signal()).await;

    let _ = shutdown_tx.send(());
    if let Err(e) = reset_task.await {
        tracing::warn!(error = %e, "Rate window task ended abnormally");
    }

    result.context("Server error")
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}

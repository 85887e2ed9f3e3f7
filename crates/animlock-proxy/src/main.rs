//! Animation-lock mitigation proxy binary.
//!
//! Takes no command-line flags; all configuration is environment-provided
//! (see [`animlock_proxy::config`]). Runs until interrupted, then removes
//! the redirect rule it installed at startup and exits.

use std::sync::Arc;

use animlock_core::DialectTable;
use animlock_proxy::{Config, ProxyError, SessionRegistry, acceptor, redirect};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "proxy exited with an error");
            std::process::ExitCode::FAILURE
        },
    }
}

async fn run() -> Result<(), ProxyError> {
    let config = Config::load()?;

    let filter = EnvFilter::try_new(&config.log).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("animation-lock mitigation proxy starting");

    let dialects = Arc::new(DialectTable::resolve()?);
    let networks = dialects.all_networks();

    let listener =
        acceptor::bind_ephemeral(config.listen_port_min, config.listen_port_max).await?;
    let port = listener.local_addr()?.port();
    tracing::info!(port, "listening");

    if config.skip_redirect {
        tracing::warn!("ANIMLOCK_SKIP_REDIRECT set; not installing the NAT rule");
    } else if let Err(err) = redirect::install(&networks, port) {
        tracing::error!("this program requires root permissions");
        return Err(err);
    } else {
        redirect::enable_ipv4_forwarding();
    }

    let registry = Arc::new(SessionRegistry::new());
    let cancel = CancellationToken::new();

    let accept_task = tokio::spawn(acceptor::run(
        listener,
        Arc::clone(&dialects),
        config.extra_delay_secs,
        Arc::clone(&registry),
        cancel.clone(),
    ));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::warn!(%err, "failed to install ctrl-c handler");
            }
        },
        () = cancel.cancelled() => {},
    }

    tracing::info!("shutting down");
    cancel.cancel();
    let _ = accept_task.await;
    registry.shutdown_all().await;

    if config.skip_redirect {
        tracing::info!("cleanup complete");
        return Ok(());
    }

    match redirect::remove(&networks, port) {
        Ok(()) => {
            tracing::info!("cleanup complete");
            Ok(())
        },
        Err(err) => {
            tracing::error!(%err, "failed to remove iptables rule");
            Err(err)
        },
    }
}

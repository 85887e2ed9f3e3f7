//! Acceptor (C6): binds an ephemeral listening port, and for each inbound
//! connection recovers the original destination, classifies it via the
//! dialect table, connects upstream, and spawns a session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use animlock_core::clock::SystemClock;
use animlock_core::{AnimLockTracker, DialectTable, Region};
use rand::Rng;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::ProxyError;
use crate::original_dst::original_dst;
use crate::registry::SessionRegistry;
use crate::relay::run_session;

const UPSTREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Bind a listener on a random port within `[min, max]`, retrying on bind
/// conflicts per spec.
pub async fn bind_ephemeral(min: u16, max: u16) -> Result<TcpListener, ProxyError> {
    if min > max {
        return Err(ProxyError::BindExhausted { min, max });
    }

    let span = u32::from(max - min) + 1;
    for _ in 0..256 {
        let port = min + u16::try_from(rand::thread_rng().gen_range(0..span)).unwrap_or(0);
        if let Ok(listener) = TcpListener::bind(("0.0.0.0", port)).await {
            return Ok(listener);
        }
    }

    Err(ProxyError::BindExhausted { min, max })
}

/// Accept connections until `cancel` fires, spawning one session per
/// connection. Never returns an error for a single failed accept/classify/
/// connect — those are logged and the loop continues.
pub async fn run(
    listener: TcpListener,
    dialects: Arc<DialectTable>,
    extra_delay_secs: f64,
    registry: Arc<SessionRegistry>,
    cancel: CancellationToken,
) {
    let next_id = AtomicU64::new(1);

    loop {
        let accepted = tokio::select! {
            result = listener.accept() => result,
            () = cancel.cancelled() => break,
        };

        let (client, peer) = match accepted {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(%err, "accept failed");
                continue;
            },
        };

        let connection_id = next_id.fetch_add(1, Ordering::Relaxed);
        let dialects = Arc::clone(&dialects);
        let registry_for_task = Arc::clone(&registry);
        let session_cancel = cancel.child_token();
        let cancel_for_registry = session_cancel.clone();

        tracing::debug!(connection_id, %peer, "accepted connection");

        let handle = tokio::spawn(async move {
            if let Err(err) = accept_one(
                connection_id,
                client,
                &dialects,
                extra_delay_secs,
                session_cancel,
            )
            .await
            {
                tracing::warn!(connection_id, %err, "session setup failed");
            }
            registry_for_task.remove(connection_id);
        });

        registry.insert(connection_id, handle, cancel_for_registry);
    }
}

async fn accept_one(
    connection_id: u64,
    client: TcpStream,
    dialects: &DialectTable,
    extra_delay_secs: f64,
    cancel: CancellationToken,
) -> Result<(), ProxyError> {
    let dest = original_dst(&client)?;
    let region = dialects.classify(*dest.ip());
    let dialect = DialectTable::dialect_for(region);

    if matches!(region, Region::NonGame) {
        tracing::debug!(connection_id, %dest, "non-game destination; opaque byte pipe");
    } else {
        tracing::debug!(connection_id, %dest, ?region, "classified game destination");
    }

    let upstream = tokio::time::timeout(UPSTREAM_CONNECT_TIMEOUT, TcpStream::connect(dest))
        .await
        .map_err(|_elapsed| {
            ProxyError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "upstream connect timed out",
            ))
        })??;

    let tracker = Arc::new(Mutex::new(AnimLockTracker::with_extra_delay(
        SystemClock::new(),
        extra_delay_secs,
    )));

    run_session(connection_id, client, upstream, dialect, tracker, cancel).await;
    Ok(())
}

//! Relay pump (C5): two half-duplex loops per session, driving the framer
//! and the tracker between a client socket and the upstream socket.

use std::sync::Arc;
use std::time::Duration;

use animlock_core::clock::SystemClock;
use animlock_core::{AnimLockTracker, Dialect, Direction, observe_bundle};
use animlock_proto::framer::{FramerItem, scan};
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

const READ_CHUNK: usize = 65536;
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared per-session tracker, behind an async mutex held only across the
/// synchronous portion of tracker logic, never across an `.await`.
pub type SharedTracker = Arc<Mutex<AnimLockTracker<SystemClock>>>;

/// Run both direction loops for one session to completion. Returns once
/// either loop observes EOF, an I/O error, the idle timeout, or
/// cancellation; tears down the other loop via `cancel`.
pub async fn run_session(
    connection_id: u64,
    client: TcpStream,
    upstream: TcpStream,
    dialect: Option<Dialect>,
    tracker: SharedTracker,
    cancel: CancellationToken,
) {
    let (client_rd, client_wr) = tokio::io::split(client);
    let (upstream_rd, upstream_wr) = tokio::io::split(upstream);

    let s2d = pump(
        connection_id,
        "S2D",
        client_rd,
        upstream_wr,
        Direction::ClientToServer,
        dialect,
        Arc::clone(&tracker),
        cancel.clone(),
    );
    let d2s = pump(
        connection_id,
        "D2S",
        upstream_rd,
        client_wr,
        Direction::ServerToClient,
        dialect,
        tracker,
        cancel.clone(),
    );

    tokio::select! {
        () = s2d => {},
        () = d2s => {},
        () = cancel.cancelled() => {},
    }

    cancel.cancel();
    tracing::debug!(connection_id, "session closed");
}

#[allow(clippy::too_many_arguments)]
async fn pump(
    connection_id: u64,
    label: &'static str,
    mut reader: ReadHalf<TcpStream>,
    mut writer: WriteHalf<TcpStream>,
    direction: Direction,
    dialect: Option<Dialect>,
    tracker: SharedTracker,
    cancel: CancellationToken,
) {
    let mut accumulator = BytesMut::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let read = tokio::select! {
            result = tokio::time::timeout(IDLE_TIMEOUT, reader.read(&mut buf)) => result,
            () = cancel.cancelled() => break,
        };

        let n = match read {
            Ok(Ok(0)) => {
                tracing::debug!(connection_id, label, "orderly EOF");
                break;
            },
            Ok(Ok(n)) => n,
            Ok(Err(err)) => {
                tracing::debug!(connection_id, label, %err, "read error; session broken");
                break;
            },
            Err(_elapsed) => {
                tracing::debug!(connection_id, label, "idle timeout; session broken");
                break;
            },
        };

        let Some(dialect) = dialect else {
            // Non-game connection: opaque byte pipe, no decoding attempted.
            if writer.write_all(&buf[..n]).await.is_err() {
                break;
            }
            continue;
        };

        accumulator.put_slice(&buf[..n]);
        let (items, tail) = scan(&accumulator);

        let mut out = BytesMut::new();
        for item in items {
            match item {
                FramerItem::Discarded(span) => {
                    tracing::warn!(connection_id, label, len = span.len(), "discarded unframable span");
                },
                FramerItem::Bundle(mut bundle) => {
                    {
                        let mut tracker = tracker.lock().await;
                        observe_bundle(&mut bundle, direction, dialect, &mut tracker);
                    }
                    if let Err(err) = bundle.encode(&mut out) {
                        tracing::warn!(connection_id, label, %err, "failed to re-encode bundle; dropping");
                    }
                },
            }
        }

        accumulator = BytesMut::from(tail.as_ref());

        if !out.is_empty() && writer.write_all(&out).await.is_err() {
            tracing::debug!(connection_id, label, "write error; session broken");
            break;
        }
    }

    // Flush whatever couldn't be framed before this loop ends, matching the
    // "flush any accumulator as-is" behavior on orderly EOF.
    if !accumulator.is_empty() {
        let _ignored: Result<(), std::io::Error> = writer.write_all(&accumulator).await;
    }
    let _ignored: Result<(), std::io::Error> = writer.shutdown().await;
    cancel.cancel();
}

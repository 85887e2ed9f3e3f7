//! Process-level session registry (C10). Tracks live sessions only for
//! enumeration at shutdown; the acceptor never mutates a running session's
//! state through it (the registry itself never touches `pending` or
//! `lock_deadline`).
//!
//! This replaces the source's `Connection.all_connections` class variable,
//! whose shutdown path tried to `.join()` connection objects as if they were
//! threads. Here shutdown explicitly `.await`s the per-session `JoinHandle`s
//! tracked below, not the session values themselves.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One registered session: its task handle (awaited at shutdown) and the
/// token used to signal it to tear down early.
struct Entry {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Guards the live-session map with a plain mutex; contention is negligible
/// (sessions open/close far less often than the per-direction event rate
/// within one session).
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<u64, Entry>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly spawned session's task handle and cancellation token.
    pub fn insert(&self, session_id: u64, handle: JoinHandle<()>, cancel: CancellationToken) {
        let mut sessions = self.sessions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions.insert(session_id, Entry { handle, cancel });
    }

    /// Remove a session once its task has completed.
    pub fn remove(&self, session_id: u64) {
        let mut sessions = self.sessions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions.remove(&session_id);
    }

    /// Number of currently-registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        let sessions = self.sessions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions.len()
    }

    /// Whether the registry is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signal every live session to tear down, then await completion of all
    /// their tasks. Used by the acceptor's shutdown path.
    pub async fn shutdown_all(&self) {
        let entries: Vec<Entry> = {
            let mut sessions = self.sessions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            sessions.drain().map(|(_, entry)| entry).collect()
        };

        for entry in &entries {
            entry.cancel.cancel();
        }

        for entry in entries {
            if let Err(err) = entry.handle.await {
                tracing::warn!(%err, "session task panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_remove_tracks_length() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty());

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(async {});
        registry.insert(1, handle, cancel);
        assert_eq!(registry.len(), 1);

        registry.remove(1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn shutdown_all_cancels_and_awaits_every_session() {
        let registry = SessionRegistry::new();
        let cancel = CancellationToken::new();
        let child = cancel.clone();

        let handle = tokio::spawn(async move {
            child.cancelled().await;
        });
        registry.insert(1, handle, cancel);

        registry.shutdown_all().await;
        assert!(registry.is_empty());
    }
}

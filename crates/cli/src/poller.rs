//! Recurring presence poll against the coordination server.
//!
//! Each round re-registers this peer (the heartbeat that keeps it inside the
//! server's liveness window) and then fetches the online peer list, minus
//! ourselves. Rounds run strictly one at a time: the next tick fires only
//! after the previous round finished, so a slow server never piles up
//! overlapping polls.

use crate::api_client::{ApiClient, PeerResponse, RegisterPeerRequest};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A running presence poll, cancellable at any time.
pub struct PresencePoller {
    cancel: CancellationToken,
    peers: watch::Receiver<Vec<PeerResponse>>,
    task: JoinHandle<()>,
}

impl PresencePoller {
    /// Start polling. The first round runs immediately.
    pub fn spawn(client: ApiClient, registration: RegisterPeerRequest, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(Vec::new());

        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                poll_once(&client, &registration, &tx).await;
            }
        });

        Self { cancel, peers: rx, task }
    }

    /// Latest published online peer list.
    pub fn peers(&self) -> watch::Receiver<Vec<PeerResponse>> {
        self.peers.clone()
    }

    /// Block until the next round publishes a peer list.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.peers.changed().await
    }

    /// Current snapshot without waiting.
    pub fn current(&self) -> Vec<PeerResponse> {
        self.peers.borrow().clone()
    }

    /// Cancel the poll and wait for the in-flight round, if any, to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

async fn poll_once(
    client: &ApiClient,
    registration: &RegisterPeerRequest,
    tx: &watch::Sender<Vec<PeerResponse>>,
) {
    // Heartbeat first so this round's listing already reflects us as fresh.
    if let Err(e) = client.register_peer(registration).await {
        tracing::warn!(peer = %registration.name, error = %e, "presence heartbeat failed");
        return;
    }

    match client.list_online_peers(Some(&registration.name)).await {
        Ok(peers) => {
            tracing::debug!(count = peers.len(), "presence poll complete");
            let _ = tx.send(peers);
        }
        Err(e) => {
            // Keep the previous snapshot; a transient server error should not
            // blank out the peer list mid-session.
            tracing::warn!(error = %e, "presence poll failed");
        }
    }
}

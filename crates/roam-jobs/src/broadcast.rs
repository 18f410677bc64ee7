//! Per-job progress broadcasting
//!
//! Maintains `jobId -> set<client>` and delivers events best-effort: sends
//! never block, a stalled or closed client is dropped from its sets, and an
//! empty set is lazily discarded. Per-client ordering follows publish order
//! (one unbounded channel per client); there is no cross-client ordering.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::model::{JobStatus, Progress};

/// Opaque handle for one connected client
pub type ClientId = u64;

/// What a job event announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Counters moved
    Progress,
    /// Terminal success
    Completed,
    /// Terminal failure (including cancellation)
    Failed,
}

/// One published job event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    /// Job the event belongs to
    pub job_id: String,
    /// Event kind
    pub kind: EventKind,
    /// Counters at publish time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    /// Status at publish time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
}

/// Fan-out hub for job events
#[derive(Debug, Default)]
pub struct Broadcaster {
    /// jobId -> clientId -> event sender
    subscriptions: RwLock<HashMap<String, HashMap<ClientId, mpsc::UnboundedSender<JobEvent>>>>,
    /// Client handle allocator
    next_client: AtomicU64,
}

impl Broadcaster {
    /// Create an empty broadcaster
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh client handle
    pub fn register_client(&self) -> ClientId {
        self.next_client.fetch_add(1, Ordering::Relaxed)
    }

    /// Subscribe a client to a job's events
    ///
    /// Subscribing twice replaces the previous sender. Job identifiers are
    /// matched case-sensitively.
    pub fn subscribe(
        &self,
        job_id: &str,
        client: ClientId,
        sender: mpsc::UnboundedSender<JobEvent>,
    ) {
        self.subscriptions
            .write()
            .entry(job_id.to_string())
            .or_default()
            .insert(client, sender);
        tracing::debug!(job_id = %job_id, client, "client subscribed");
    }

    /// Remove a client from one job's subscriber set
    ///
    /// Returns true if the client was subscribed.
    pub fn unsubscribe(&self, job_id: &str, client: ClientId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let Some(set) = subscriptions.get_mut(job_id) else {
            return false;
        };
        let removed = set.remove(&client).is_some();
        if set.is_empty() {
            subscriptions.remove(job_id);
        }
        removed
    }

    /// Remove a client from every subscriber set it appears in
    pub fn disconnect(&self, client: ClientId) {
        let mut subscriptions = self.subscriptions.write();
        subscriptions.retain(|_, set| {
            set.remove(&client);
            !set.is_empty()
        });
    }

    /// Discard a job's subscriber set entirely
    pub fn drop_job(&self, job_id: &str) {
        self.subscriptions.write().remove(job_id);
    }

    /// Deliver an event to every current subscriber of its job
    ///
    /// Non-blocking: each delivery is an unbounded channel send. Clients
    /// whose channel has closed are pruned on the way through. Returns the
    /// number of successful deliveries.
    pub fn publish(&self, event: &JobEvent) -> usize {
        let mut dead: Vec<ClientId> = Vec::new();
        let mut delivered = 0;

        {
            let subscriptions = self.subscriptions.read();
            let Some(set) = subscriptions.get(&event.job_id) else {
                return 0;
            };
            for (client, sender) in set {
                if sender.send(event.clone()).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(*client);
                }
            }
        }

        if !dead.is_empty() {
            let mut subscriptions = self.subscriptions.write();
            if let Some(set) = subscriptions.get_mut(&event.job_id) {
                for client in dead {
                    set.remove(&client);
                }
                if set.is_empty() {
                    subscriptions.remove(&event.job_id);
                }
            }
        }

        delivered
    }

    /// Number of clients subscribed to a job
    pub fn subscriber_count(&self, job_id: &str) -> usize {
        self.subscriptions
            .read()
            .get(job_id)
            .map_or(0, HashMap::len)
    }
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod broadcast_test;

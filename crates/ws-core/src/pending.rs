use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::oneshot;
use ws_protocol::Envelope;

/// One in-flight server -> client message awaiting a correlated reply.
///
/// The waiter that created the entry is the only one that removes it on
/// the happy path; the sweeper and manager shutdown remove abandoned
/// entries by closing the channel, which the waiter observes as `Closed`.
struct PendingEntry {
    tx: oneshot::Sender<Envelope>,
    inserted_at: Instant,
}

/// A table of pids awaiting either a `client_ack` or a full client reply.
/// Used for both the ack table and the response table; the two are kept
/// as separate instances so an ack can never satisfy a response waiter.
pub struct PendingTable {
    entries: DashMap<String, PendingEntry>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Registers `pid` and returns the receiving half of its delivery
    /// channel. Must be called before the correlated message is sent.
    pub fn insert(&self, pid: String) -> oneshot::Receiver<Envelope> {
        let (tx, rx) = oneshot::channel();
        self.entries.insert(
            pid,
            PendingEntry {
                tx,
                inserted_at: Instant::now(),
            },
        );
        rx
    }

    /// Removes `pid` without completing its channel. Used by the waiter
    /// itself once it is done (success, timeout, or closed).
    pub fn remove(&self, pid: &str) {
        self.entries.remove(pid);
    }

    /// Delivers `envelope` to the waiter registered for `envelope`'s
    /// correlation target, if any. Returns `true` if a waiter was found.
    /// The waiter, not this method, removes the entry.
    pub fn deliver(&self, pid: &str, envelope: Envelope) -> bool {
        if let Some((_, entry)) = self.entries.remove(pid) {
            // The waiter already removed itself from the table by the
            // time this fires in the common case; removing here too
            // covers the race where delivery beats insertion's caller.
            let _ = entry.tx.send(envelope);
            true
        } else {
            false
        }
    }

    /// Removes and closes every entry older than `timeout`. Returns the
    /// number of entries reclaimed.
    pub fn sweep(&self, timeout: Duration) -> usize {
        let now = Instant::now();
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| now.duration_since(entry.inserted_at) >= timeout)
            .map(|entry| entry.key().clone())
            .collect();
        for pid in &stale {
            // Dropping the sender closes the channel; the waiter's
            // select observes this as a closed-channel error.
            self.entries.remove(pid);
        }
        stale.len()
    }

    /// Removes and closes every entry, regardless of age. Used by
    /// manager shutdown.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn contains(&self, pid: &str) -> bool {
        self.entries.contains_key(pid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

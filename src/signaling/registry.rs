use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::signaling::channel::PeerChannel;
use crate::signaling::types::{ConnectionId, Identity, Role};

/// One registered connection.
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub identity: Identity,
    pub role: Role,
    pub channel: PeerChannel,
    /// Registration order, used to keep role lookups in insertion order.
    seq: u64,
}

impl ConnectionEntry {
    pub fn conn_id(&self) -> ConnectionId {
        self.channel.conn_id()
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    by_identity: HashMap<Identity, ConnectionEntry>,
    next_seq: u64,
}

/// Live mapping from client identity to (channel, role).
///
/// Shared by every connection thread behind an `Arc`. All operations take one
/// short-lived lock; nothing blocks while it is held, and lookups hand out
/// clones so callers send after the guard is released.
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        // Every critical section leaves the map consistent, so a panic in
        // another holder does not invalidate it.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces the entry for `identity` (last writer wins).
    ///
    /// The replaced connection is not closed; it simply stops being reachable.
    /// Returns the id of the connection that previously held `identity`, if any.
    pub fn register(
        &self,
        identity: impl Into<Identity>,
        role: impl Into<Role>,
        channel: PeerChannel,
    ) -> Option<ConnectionId> {
        let identity = identity.into();
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let entry = ConnectionEntry {
            identity: identity.clone(),
            role: role.into(),
            channel,
            seq,
        };
        inner
            .by_identity
            .insert(identity, entry)
            .map(|old| old.conn_id())
    }

    pub fn lookup_by_identity(&self, identity: &str) -> Option<ConnectionEntry> {
        self.lock().by_identity.get(identity).cloned()
    }

    /// Every entry with `role`, except `exclude_identity`, in registration order.
    pub fn lookup_by_role(
        &self,
        role: &str,
        exclude_identity: Option<&str>,
    ) -> Vec<ConnectionEntry> {
        let mut matches: Vec<ConnectionEntry> = self
            .lock()
            .by_identity
            .values()
            .filter(|e| e.role == role && Some(e.identity.as_str()) != exclude_identity)
            .cloned()
            .collect();
        matches.sort_by_key(|e| e.seq);
        matches
    }

    /// Deletes the entry for `identity`. Returns whether one existed.
    pub fn remove(&self, identity: &str) -> bool {
        self.lock().by_identity.remove(identity).is_some()
    }

    /// Deletes the entry for `identity` only while it still belongs to `conn_id`.
    ///
    /// A connection tearing down must not evict a newer connection that has
    /// since registered under the same identity.
    pub fn remove_owned(&self, identity: &str, conn_id: ConnectionId) -> bool {
        let mut inner = self.lock();
        let owned = inner
            .by_identity
            .get(identity)
            .is_some_and(|e| e.conn_id() == conn_id);
        if owned {
            inner.by_identity.remove(identity);
        }
        owned
    }

    pub fn len(&self) -> usize {
        self.lock().by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().by_identity.is_empty()
    }

    /// Registered identities, in registration order.
    pub fn identities(&self) -> Vec<Identity> {
        let inner = self.lock();
        let mut entries: Vec<&ConnectionEntry> = inner.by_identity.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.identity.clone()).collect()
    }
}

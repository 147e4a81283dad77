//! Process-wide set of active play sessions.
//!
//! This module tracks which connections have completed login so status
//! queries can report an online count. It handles:
//! - Capacity reservations taken before a login is acknowledged
//! - Atomic capacity-checked registration
//! - Idempotent removal from any exit path
//! - Automatic removal when a session's guard is dropped, including on panic
//!
//! Entries are opaque to the rest of the server; nothing iterates them for
//! broadcast.

use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Server-assigned key of a registry entry, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

/// A logged-in player as seen by the registry.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique registry key
    pub id: SessionId,
    /// Offline identity derived from the username
    pub uuid: Uuid,
    /// Name the client declared in login start
    pub username: String,
    /// Client address, as reported by the PROXY line when one was sent
    pub peer: SocketAddr,
    /// When login completed; only used for logging
    pub established_at: Instant,
}

/// Error returned when the registry is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryFull;

/// Manages the set of active sessions
///
/// A session is present if and only if its connection is open and has
/// completed login. Registration hands back a [`SessionGuard`] that owns
/// the entry; dropping the guard removes it.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    state: Mutex<RegistryState>,
    /// Next id to hand out
    next_id: AtomicU64,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Active sessions indexed by their id
    sessions: HashMap<SessionId, Session>,
    /// Logins holding a slot that are not active yet
    reserved: usize,
}

impl SessionRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a slot for a login in progress
    ///
    /// Reserved slots count against `limit` but not toward [`len`](Self::len),
    /// so a login can be refused before it is acknowledged and only shows up
    /// as online once it is activated. Returns [`RegistryFull`] when active
    /// and reserved slots together reach the limit.
    pub fn reserve(self: &Arc<Self>, limit: Option<usize>) -> Result<Reservation, RegistryFull> {
        let mut state = self.state.lock();
        if limit.is_some_and(|limit| state.sessions.len() + state.reserved >= limit) {
            return Err(RegistryFull);
        }
        state.reserved += 1;

        Ok(Reservation {
            registry: Arc::clone(self),
            activated: false,
        })
    }

    /// Registers a new session in one step
    ///
    /// The slot is reserved under the lock before the insert, so concurrent
    /// logins can never push the registry past `limit`.
    pub fn register(
        self: &Arc<Self>,
        uuid: Uuid,
        username: &str,
        peer: SocketAddr,
        limit: Option<usize>,
    ) -> Result<SessionGuard, RegistryFull> {
        Ok(self.reserve(limit)?.activate(uuid, username, peer))
    }

    /// Removes a session
    ///
    /// Returns true if the session was present. Removing an absent session
    /// is a no-op, so every exit path may call this without coordination.
    pub fn remove(&self, id: SessionId) -> bool {
        let removed = self.state.lock().sessions.remove(&id).is_some();
        if removed {
            debug!("Removed session {:?}", id);
        }
        removed
    }

    /// Returns true if the session is currently registered
    pub fn contains(&self, id: SessionId) -> bool {
        self.state.lock().sessions.contains_key(&id)
    }

    /// Returns the number of active sessions
    pub fn len(&self) -> usize {
        self.state.lock().sessions.len()
    }

    /// Returns true if no sessions are active
    pub fn is_empty(&self) -> bool {
        self.state.lock().sessions.is_empty()
    }

    /// Returns the number of slots held by logins not yet active
    pub fn reserved(&self) -> usize {
        self.state.lock().reserved
    }
}

/// A capacity slot held between the capacity check and login success.
///
/// Dropping an unused reservation gives the slot back.
#[derive(Debug)]
pub struct Reservation {
    registry: Arc<SessionRegistry>,
    activated: bool,
}

impl Reservation {
    /// Turns the slot into an active session
    pub fn activate(mut self, uuid: Uuid, username: &str, peer: SocketAddr) -> SessionGuard {
        let registry = Arc::clone(&self.registry);
        let id = SessionId(registry.next_id.fetch_add(1, Ordering::Relaxed));
        let session = Session {
            id,
            uuid,
            username: username.to_string(),
            peer,
            established_at: Instant::now(),
        };
        {
            let mut state = registry.state.lock();
            state.reserved -= 1;
            state.sessions.insert(id, session.clone());
        }
        self.activated = true;
        debug!("Registered session {:?} for {}", id, username);

        SessionGuard { registry, session }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.activated {
            self.registry.state.lock().reserved -= 1;
        }
    }
}

/// Owns one registry entry for the lifetime of a session.
///
/// Dropping the guard removes the entry, which makes cleanup independent of
/// how the owning task ends.
#[derive(Debug)]
pub struct SessionGuard {
    registry: Arc<SessionRegistry>,
    session: Session,
}

impl SessionGuard {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn id(&self) -> SessionId {
        self.session.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(self.session.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::offline_uuid;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:25565".parse().unwrap()
    }

    fn register(registry: &Arc<SessionRegistry>, name: &str) -> SessionGuard {
        registry
            .register(offline_uuid(name), name, test_addr(), None)
            .unwrap()
    }

    #[test]
    fn test_registry_creation() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_and_drop() {
        let registry = Arc::new(SessionRegistry::new());

        let guard = register(&registry, "alice");
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(guard.id()));
        assert_eq!(guard.session().username, "alice");
        assert_eq!(guard.session().uuid, offline_uuid("alice"));

        drop(guard);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unique_ids() {
        let registry = Arc::new(SessionRegistry::new());
        let first = register(&registry, "same");
        let second = register(&registry, "same");

        assert_ne!(first.id(), second.id());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = Arc::new(SessionRegistry::new());
        let guard = register(&registry, "bob");
        let id = guard.id();

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert_eq!(registry.len(), 0);

        // The guard's own removal is a no-op now.
        drop(guard);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_remove_nonexistent_session() {
        let registry = SessionRegistry::new();
        assert!(!registry.remove(SessionId(999)));
    }

    #[test]
    fn test_capacity_enforced() {
        let registry = Arc::new(SessionRegistry::new());
        let _first = registry
            .register(offline_uuid("a"), "a", test_addr(), Some(1))
            .unwrap();

        let second = registry.register(offline_uuid("b"), "b", test_addr(), Some(1));
        assert_eq!(second.unwrap_err(), RegistryFull);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reservation_holds_capacity_without_counting_online() {
        let registry = Arc::new(SessionRegistry::new());
        let reservation = registry.reserve(Some(1)).unwrap();

        assert!(registry.is_empty());
        assert_eq!(registry.reserved(), 1);
        assert_eq!(
            registry
                .register(offline_uuid("late"), "late", test_addr(), Some(1))
                .unwrap_err(),
            RegistryFull
        );

        let guard = reservation.activate(offline_uuid("early"), "early", test_addr());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.reserved(), 0);
        assert!(registry.contains(guard.id()));
    }

    #[test]
    fn test_dropped_reservation_frees_slot() {
        let registry = Arc::new(SessionRegistry::new());
        let reservation = registry.reserve(Some(1)).unwrap();
        assert!(registry.reserve(Some(1)).is_err());

        drop(reservation);
        assert_eq!(registry.reserved(), 0);
        assert!(registry.is_empty());
        assert!(registry.reserve(Some(1)).is_ok());
    }

    #[test]
    fn test_concurrent_register_respects_limit() {
        let registry = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let name = format!("p{}", i);
                    registry
                        .register(offline_uuid(&name), &name, test_addr(), Some(8))
                        .ok()
                })
            })
            .collect();

        let guards: Vec<SessionGuard> = handles
            .into_iter()
            .filter_map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(guards.len(), 8);
        assert_eq!(registry.len(), 8);

        drop(guards);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_guard_removed_on_panic() {
        let registry = Arc::new(SessionRegistry::new());
        let inner = Arc::clone(&registry);

        let result = std::thread::spawn(move || {
            let _guard = register(&inner, "doomed");
            assert_eq!(inner.len(), 1);
            panic!("connection task blew up");
        })
        .join();

        assert!(result.is_err());
        assert!(registry.is_empty());
    }
}

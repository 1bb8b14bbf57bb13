//! Server push planning
//!
//! A pushing request expands into an ordered list of [`PushCandidate`]s.
//! With cache-aware push, the list is filtered through a [`PushAdvisor`]
//! owned by the client's [`Session`], so that a client is not pushed the
//! same sub-resource again while it is likely still cached.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

pub use self::advisor::PushAdvisor;
pub use self::candidate::{candidates, PushCandidate};

mod advisor;
mod candidate;

/// Default number of identities tracked per client.
pub const DEFAULT_CAPACITY: usize = 1 << 6;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// State owned by one client connection.
///
/// The push advisor is created on the first cache-aware request of the
/// connection and dropped with the connection. It is never shared between
/// connections.
#[derive(Debug)]
pub struct Session {
    id: u64,
    capacity: usize,
    advisor: Mutex<Option<PushAdvisor>>,
}

impl Session {
    /// Creates the session of a new connection.
    pub fn new(capacity: usize) -> Session {
        Session {
            id: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            capacity,
            advisor: Mutex::new(None),
        }
    }

    /// Identifier of this session, for logs.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Runs `batch` through the session's advisor and returns the
    /// candidates to push.
    ///
    /// Concurrent calls for the same session are serialized, so each batch
    /// sees and updates the advisor atomically.
    pub fn advise(&self, batch: Vec<PushCandidate>) -> Vec<PushCandidate> {
        let mut guard = self
            .advisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let advisor = guard.get_or_insert_with(|| PushAdvisor::new(self.capacity, batch.len()));
        advisor.decide(batch)
    }

    /// Stops tracking candidates whose push failed, so that a later request
    /// offers them again.
    pub fn forget(&self, failed: &[PushCandidate]) {
        let mut guard = self
            .advisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(advisor) = guard.as_mut() {
            advisor.forget(failed);
        }
    }

    /// Number of identities currently tracked for this session.
    pub fn tracked(&self) -> usize {
        self.advisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, PushAdvisor::len)
    }
}

impl Default for Session {
    fn default() -> Session {
        Session::new(DEFAULT_CAPACITY)
    }
}

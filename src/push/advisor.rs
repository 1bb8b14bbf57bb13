use std::collections::{BTreeMap, HashMap};

use tracing::trace;

/// Decides which sub-resources still need pushing to one client.
///
/// The advisor remembers up to `capacity` resource identities it has
/// approved for push, ordered by recency. An identity it remembers is
/// assumed to sit in the client's cache and is skipped; when a new
/// identity is admitted into a full advisor, the least recently used one
/// is forgotten. A capacity of zero remembers nothing and approves
/// everything.
#[derive(Debug)]
pub struct PushAdvisor {
    capacity: usize,
    clock: u64,
    // identity -> recency stamp
    entries: HashMap<String, u64>,
    // recency stamp -> identity, oldest first
    order: BTreeMap<u64, String>,
}

impl PushAdvisor {
    /// Creates an advisor tracking at most `capacity` identities.
    ///
    /// `size_hint` is the expected batch size and only sizes the index.
    pub fn new(capacity: usize, size_hint: usize) -> PushAdvisor {
        PushAdvisor {
            capacity,
            clock: 0,
            entries: HashMap::with_capacity(size_hint.min(capacity)),
            order: BTreeMap::new(),
        }
    }

    /// Splits `candidates` into push and skip, returning the ones to push
    /// in their original order.
    ///
    /// Candidates are handled left to right: a tracked identity is skipped
    /// and becomes most recently used, an untracked one is approved and
    /// admitted. A duplicate later in the same batch is therefore skipped.
    pub fn decide<C, I>(&mut self, candidates: I) -> Vec<C>
    where
        C: AsRef<str>,
        I: IntoIterator<Item = C>,
    {
        let mut approved = Vec::new();
        for candidate in candidates {
            if self.touch(candidate.as_ref()) {
                trace!("push skipped, assumed cached: {}", candidate.as_ref());
                continue;
            }
            self.admit(candidate.as_ref());
            approved.push(candidate);
        }
        approved
    }

    /// Whether `identity` is currently tracked. Does not refresh recency.
    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// Number of tracked identities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stops tracking `identities`, so that they are approved again by the
    /// next decision. Used when an approved push did not reach the client.
    pub fn forget<C, I>(&mut self, identities: I)
    where
        C: AsRef<str>,
        I: IntoIterator<Item = C>,
    {
        for identity in identities {
            if let Some(stamp) = self.entries.remove(identity.as_ref()) {
                trace!("push advisor forgot {}", identity.as_ref());
                self.order.remove(&stamp);
            }
        }
    }

    /// Tracked identities from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.values().map(String::as_str)
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn touch(&mut self, identity: &str) -> bool {
        let stamp = self.tick();
        match self.entries.get_mut(identity) {
            Some(old) => {
                let name = self
                    .order
                    .remove(&*old)
                    .unwrap_or_else(|| identity.to_owned());
                *old = stamp;
                self.order.insert(stamp, name);
                true
            }
            None => false,
        }
    }

    fn admit(&mut self, identity: &str) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_first() {
                Some((_, evicted)) => {
                    trace!("push advisor evicted {}", evicted);
                    self.entries.remove(&evicted);
                }
                None => break,
            }
        }
        let stamp = self.tick();
        self.entries.insert(identity.to_owned(), stamp);
        self.order.insert(stamp, identity.to_owned());
        debug_assert_eq!(self.entries.len(), self.order.len());
    }
}

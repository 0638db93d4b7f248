//! Process-wide query id allocation

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier correlating a submission with later status/result lookups
pub type QueryId = u64;

/// Hands out unique, strictly increasing query ids for the lifetime of the process.
///
/// The allocator is seeded once from the datastore's latest id and then
/// advanced on every accepted submission.
#[derive(Debug, Default)]
pub struct QueryIdAllocator {
    next: AtomicU64,
}

impl QueryIdAllocator {
    /// Create an allocator whose first id is `next`
    pub fn new(next: QueryId) -> Self {
        Self {
            next: AtomicU64::new(next),
        }
    }

    /// Seed from the latest id known to the datastore.
    ///
    /// `None` (datastore unreachable) leaves the allocator at its current
    /// position. Seeding never moves the allocator backwards.
    pub fn seed(&self, latest: Option<QueryId>) -> QueryId {
        let candidate = latest.map_or(0, |id| id.saturating_add(1));
        let previous = self.next.fetch_max(candidate, Ordering::SeqCst);
        previous.max(candidate)
    }

    /// Take the next id
    pub fn reserve(&self) -> QueryId {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// The id the next reservation will return
    pub fn peek(&self) -> QueryId {
        self.next.load(Ordering::SeqCst)
    }
}

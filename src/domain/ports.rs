use crate::domain::financing::HistoryRecord;
use crate::domain::listing::{Listing, ListingId, VersionedListing};
use crate::domain::request::TransitionEvent;
use crate::error::Result;
use async_trait::async_trait;

/// Durable, versioned listing storage.
///
/// `compare_and_set` is the sole concurrency-control primitive the rest of
/// the engine depends on: it must be linearizable per key, and a caller
/// either observes the fully-updated listing at the new version or a
/// `VersionConflict`. No partial writes.
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn get(&self, id: &ListingId) -> Result<Option<VersionedListing>>;

    /// Creates the listing at version 1; fails with `DuplicateListing` if
    /// the id is already present.
    async fn create(&self, listing: Listing) -> Result<u64>;

    /// Commits `listing` iff the stored version equals `expected_version`,
    /// returning the new version; fails with `VersionConflict` otherwise.
    async fn compare_and_set(
        &self,
        id: &ListingId,
        expected_version: u64,
        listing: Listing,
    ) -> Result<u64>;

    async fn all(&self) -> Result<Vec<VersionedListing>>;
}

/// External event sink. At-least-once, fire-and-forget from the
/// orchestrator's perspective; a failed notify never rolls back a commit.
#[async_trait]
pub trait EventNotifier: Send + Sync {
    async fn notify(&self, event: TransitionEvent) -> Result<()>;
}

/// Exporter repayment-history lookup. `None` means unknown exporter and is
/// treated as neutral risk input, not an error.
#[async_trait]
pub trait ExporterHistory: Send + Sync {
    async fn history(&self, exporter: &str) -> Result<Option<HistoryRecord>>;
}

pub type ListingStoreBox = Box<dyn ListingStore>;
pub type EventNotifierBox = Box<dyn EventNotifier>;
pub type ExporterHistoryBox = Box<dyn ExporterHistory>;

use crate::domain::financing::HistoryRecord;
use crate::domain::listing::{Listing, ListingId, VersionedListing};
use crate::domain::ports::{EventNotifier, ExporterHistory, ListingStore};
use crate::domain::request::TransitionEvent;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedSender;

/// A thread-safe in-memory listing store.
///
/// The write lock makes each compare-and-set atomic, which is all the
/// linearizability the engine asks of a backend. Ideal for tests and single
/// process deployments.
#[derive(Default, Clone)]
pub struct InMemoryListingStore {
    listings: Arc<RwLock<HashMap<ListingId, VersionedListing>>>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListingStore for InMemoryListingStore {
    async fn get(&self, id: &ListingId) -> Result<Option<VersionedListing>> {
        let listings = self.listings.read().await;
        Ok(listings.get(id).cloned())
    }

    async fn create(&self, listing: Listing) -> Result<u64> {
        let mut listings = self.listings.write().await;
        if listings.contains_key(&listing.id) {
            return Err(EngineError::DuplicateListing(listing.id.clone()));
        }
        let id = listing.id.clone();
        listings.insert(id, VersionedListing { listing, version: 1 });
        Ok(1)
    }

    async fn compare_and_set(
        &self,
        id: &ListingId,
        expected_version: u64,
        listing: Listing,
    ) -> Result<u64> {
        let mut listings = self.listings.write().await;
        let current = listings
            .get_mut(id)
            .ok_or_else(|| EngineError::ListingNotFound(id.clone()))?;
        if current.version != expected_version {
            return Err(EngineError::VersionConflict {
                listing: id.clone(),
                expected: expected_version,
                actual: current.version,
            });
        }
        current.listing = listing;
        current.version += 1;
        Ok(current.version)
    }

    async fn all(&self) -> Result<Vec<VersionedListing>> {
        let listings = self.listings.read().await;
        let mut out: Vec<VersionedListing> = listings.values().cloned().collect();
        out.sort_by(|a, b| a.listing.id.cmp(&b.listing.id));
        Ok(out)
    }
}

/// In-memory exporter repayment records.
#[derive(Default, Clone)]
pub struct InMemoryExporterHistory {
    records: Arc<RwLock<HashMap<String, HistoryRecord>>>,
}

impl InMemoryExporterHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, exporter: impl Into<String>, record: HistoryRecord) {
        self.records.write().await.insert(exporter.into(), record);
    }
}

#[async_trait]
impl ExporterHistory for InMemoryExporterHistory {
    async fn history(&self, exporter: &str) -> Result<Option<HistoryRecord>> {
        Ok(self.records.read().await.get(exporter).copied())
    }
}

/// Discards events. For tests and the CLI's default wiring.
pub struct NoopNotifier;

#[async_trait]
impl EventNotifier for NoopNotifier {
    async fn notify(&self, _event: TransitionEvent) -> Result<()> {
        Ok(())
    }
}

/// Forwards events over a tokio channel to an in-process collaborator.
pub struct ChannelNotifier {
    sender: UnboundedSender<TransitionEvent>,
}

impl ChannelNotifier {
    pub fn new(sender: UnboundedSender<TransitionEvent>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl EventNotifier for ChannelNotifier {
    async fn notify(&self, event: TransitionEvent) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|e| EngineError::Internal(Box::new(e)))
    }
}

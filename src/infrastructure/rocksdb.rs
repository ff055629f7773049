use crate::domain::listing::{Listing, ListingId, VersionedListing};
use crate::domain::ports::ListingStore;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column family for versioned listing records.
pub const CF_LISTINGS: &str = "listings";

/// A persistent listing store backed by RocksDB.
///
/// Versioned listings are stored as JSON under their id. RocksDB has no
/// native compare-and-set, so commits are serialized through a store-level
/// mutex; reads go straight to the database. That keeps every key
/// linearizable, which is the only guarantee the orchestrator needs.
#[derive(Clone)]
pub struct RocksDbListingStore {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDbListingStore {
    /// Opens or creates a RocksDB instance at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf = ColumnFamilyDescriptor::new(CF_LISTINGS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf])
            .map_err(|e| EngineError::Internal(Box::new(e)))?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_LISTINGS).ok_or_else(|| {
            EngineError::Internal(Box::new(std::io::Error::other(
                "listings column family not found",
            )))
        })
    }

    fn read(&self, id: &ListingId) -> Result<Option<VersionedListing>> {
        let cf = self.cf()?;
        let bytes = self
            .db
            .get_cf(cf, id.0.as_bytes())
            .map_err(|e| EngineError::Internal(Box::new(e)))?;
        match bytes {
            Some(bytes) => {
                let versioned = serde_json::from_slice(&bytes)
                    .map_err(|e| EngineError::Internal(Box::new(e)))?;
                Ok(Some(versioned))
            }
            None => Ok(None),
        }
    }

    fn write(&self, versioned: &VersionedListing) -> Result<()> {
        let cf = self.cf()?;
        let bytes =
            serde_json::to_vec(versioned).map_err(|e| EngineError::Internal(Box::new(e)))?;
        self.db
            .put_cf(cf, versioned.listing.id.0.as_bytes(), bytes)
            .map_err(|e| EngineError::Internal(Box::new(e)))
    }
}

#[async_trait]
impl ListingStore for RocksDbListingStore {
    async fn get(&self, id: &ListingId) -> Result<Option<VersionedListing>> {
        self.read(id)
    }

    async fn create(&self, listing: Listing) -> Result<u64> {
        let _guard = self.commit_lock.lock().await;
        if self.read(&listing.id)?.is_some() {
            return Err(EngineError::DuplicateListing(listing.id.clone()));
        }
        self.write(&VersionedListing { listing, version: 1 })?;
        Ok(1)
    }

    async fn compare_and_set(
        &self,
        id: &ListingId,
        expected_version: u64,
        listing: Listing,
    ) -> Result<u64> {
        let _guard = self.commit_lock.lock().await;
        let current = self
            .read(id)?
            .ok_or_else(|| EngineError::ListingNotFound(id.clone()))?;
        if current.version != expected_version {
            return Err(EngineError::VersionConflict {
                listing: id.clone(),
                expected: expected_version,
                actual: current.version,
            });
        }
        let next = VersionedListing {
            listing,
            version: expected_version + 1,
        };
        self.write(&next)?;
        Ok(next.version)
    }

    async fn all(&self) -> Result<Vec<VersionedListing>> {
        let cf = self.cf()?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item.map_err(|e| EngineError::Internal(Box::new(e)))?;
            let versioned: VersionedListing =
                serde_json::from_slice(&value).map_err(|e| EngineError::Internal(Box::new(e)))?;
            out.push(versioned);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::listing::{GoodsCategory, ListingIntake, Money, Stage};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn listing(id: &str) -> Listing {
        Listing::submit(
            ListingIntake {
                id: ListingId::new(id),
                exporter: "exp-1".to_string(),
                description: "moldy paper rolls".to_string(),
                hs_code: "4802.55".to_string(),
                quantity: 60,
                port_of_rejection: "Cochin".to_string(),
                rejection_reason: "moisture ingress".to_string(),
                category: GoodsCategory::Paper,
                original_price: Money::new(dec!(12000)).unwrap(),
                valuation_override_percent: None,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn open_creates_column_family() {
        let dir = tempdir().unwrap();
        let store = RocksDbListingStore::open(dir.path()).unwrap();
        assert!(store.db.cf_handle(CF_LISTINGS).is_some());
    }

    #[tokio::test]
    async fn create_get_and_cas() {
        let dir = tempdir().unwrap();
        let store = RocksDbListingStore::open(dir.path()).unwrap();

        let l = listing("lst-1");
        assert_eq!(store.create(l.clone()).await.unwrap(), 1);
        assert!(matches!(
            store.create(l.clone()).await,
            Err(EngineError::DuplicateListing(_))
        ));

        let mut updated = l.clone();
        updated.stage = Stage::Inspection;
        assert_eq!(store.compare_and_set(&l.id, 1, updated.clone()).await.unwrap(), 2);

        // Stale expected version conflicts.
        assert!(matches!(
            store.compare_and_set(&l.id, 1, updated).await,
            Err(EngineError::VersionConflict { .. })
        ));

        let got = store.get(&l.id).await.unwrap().unwrap();
        assert_eq!(got.version, 2);
        assert_eq!(got.listing.stage, Stage::Inspection);
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempdir().unwrap();
        let id = ListingId::new("lst-1");
        {
            let store = RocksDbListingStore::open(dir.path()).unwrap();
            store.create(listing("lst-1")).await.unwrap();
        }
        let store = RocksDbListingStore::open(dir.path()).unwrap();
        let got = store.get(&id).await.unwrap().unwrap();
        assert_eq!(got.version, 1);
        assert_eq!(store.all().await.unwrap().len(), 1);
    }
}

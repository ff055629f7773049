#![cfg(feature = "storage-rocksdb")]

mod common;

use common::*;
use dge_engine::domain::listing::{FinancingState, ListingId, Stage};
use dge_engine::domain::stage_graph::Role;
use dge_engine::infrastructure::rocksdb::RocksDbListingStore;
use tempfile::tempdir;

#[tokio::test]
async fn lifecycle_survives_process_restart() {
    let dir = tempdir().unwrap();
    let id = "lst-1";

    {
        let store = RocksDbListingStore::open(dir.path()).unwrap();
        let orch = orchestrator_with_store(Box::new(store));
        orch.submit_listing(intake(id)).await.unwrap();
        inspect(&orch, id).await;
    }

    // Reopen: evidence, financing state and version all come back.
    let store = RocksDbListingStore::open(dir.path()).unwrap();
    let orch = orchestrator_with_store(Box::new(store));
    let snapshot = orch.listings().await.unwrap().remove(0);
    assert_eq!(snapshot.version, 2);
    assert_eq!(snapshot.listing.financing, FinancingState::Approved);
    assert!(snapshot.listing.completed(Stage::Inspection));

    // And the workflow continues where it left off.
    orch.submit_transition(complete(id, Stage::Packaging, "pack-1", Role::Packer))
        .await
        .unwrap();
    let snapshot = orch.listings().await.unwrap().remove(0);
    assert_eq!(snapshot.version, 3);
    assert_eq!(snapshot.listing.id, ListingId::new(id));
}

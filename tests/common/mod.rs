#![allow(dead_code)]

use dge_engine::application::financing::{FinancingConfig, FinancingEngine};
use dge_engine::application::orchestrator::Orchestrator;
use dge_engine::domain::financing::DamageGrade;
use dge_engine::domain::listing::{GoodsCategory, ListingId, ListingIntake, Money, Stage};
use dge_engine::domain::ports::{EventNotifierBox, ListingStoreBox};
use dge_engine::domain::request::{TransitionEvent, TransitionRequest};
use dge_engine::domain::stage_graph::{Role, StageGraph};
use dge_engine::infrastructure::in_memory::{
    ChannelNotifier, InMemoryExporterHistory, InMemoryListingStore, NoopNotifier,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

pub fn intake(id: &str) -> ListingIntake {
    intake_with_price(id, dec!(100000))
}

pub fn intake_with_price(id: &str, original_price: Decimal) -> ListingIntake {
    ListingIntake {
        id: ListingId::new(id),
        exporter: "exp-1".to_string(),
        description: "water-damaged laptops".to_string(),
        hs_code: "8471.30".to_string(),
        quantity: 120,
        port_of_rejection: "Nhava Sheva".to_string(),
        rejection_reason: "container flooding".to_string(),
        category: GoodsCategory::Electronics,
        original_price: Money::new(original_price).unwrap(),
        valuation_override_percent: None,
    }
}

pub fn orchestrator() -> Orchestrator {
    orchestrator_with_store(Box::new(InMemoryListingStore::new()))
}

pub fn orchestrator_with_store(store: ListingStoreBox) -> Orchestrator {
    let notifier: EventNotifierBox = Box::new(NoopNotifier);
    build(store, notifier)
}

/// Orchestrator wired to a channel notifier, plus the receiving end for
/// asserting on emitted events.
pub fn orchestrator_with_events() -> (Orchestrator, UnboundedReceiver<TransitionEvent>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let orch = build(
        Box::new(InMemoryListingStore::new()),
        Box::new(ChannelNotifier::new(tx)),
    );
    (orch, rx)
}

pub fn orchestrator_with_history(history: InMemoryExporterHistory) -> Orchestrator {
    Orchestrator::new(
        Box::new(InMemoryListingStore::new()),
        Arc::new(StageGraph::standard()),
        FinancingEngine::new(FinancingConfig::default(), Box::new(history)),
        Box::new(NoopNotifier),
    )
}

fn build(store: ListingStoreBox, notifier: EventNotifierBox) -> Orchestrator {
    Orchestrator::new(
        store,
        Arc::new(StageGraph::standard()),
        FinancingEngine::new(
            FinancingConfig::default(),
            Box::new(InMemoryExporterHistory::new()),
        ),
        notifier,
    )
}

pub fn complete(id: &str, stage: Stage, actor: &str, role: Role) -> TransitionRequest {
    TransitionRequest::complete_stage(ListingId::new(id), stage, actor, role)
}

/// Runs a listing up to a completed grade-A inspection (version 2, financing
/// approved for the standard intake).
pub async fn inspect(orch: &Orchestrator, id: &str) {
    orch.submit_transition(
        complete(id, Stage::Inspection, "insp-9", Role::Inspector).with_grade(DamageGrade::A),
    )
    .await
    .unwrap();
}

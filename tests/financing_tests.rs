mod common;

use common::*;
use dge_engine::domain::financing::{DamageGrade, HistoryRecord, ReasonCode};
use dge_engine::domain::listing::{FinancingState, ListingId, Stage};
use dge_engine::domain::request::{TransitionAction, TransitionOutcome, TransitionRequest};
use dge_engine::domain::stage_graph::Role;
use dge_engine::error::EngineError;
use dge_engine::infrastructure::in_memory::InMemoryExporterHistory;

#[tokio::test]
async fn declined_listing_still_progresses_to_liquidation() {
    let history = InMemoryExporterHistory::new();
    history
        .insert(
            "exp-1",
            HistoryRecord {
                settled_advances: 1,
                defaulted_advances: 9,
            },
        )
        .await;
    let orch = orchestrator_with_history(history);
    let id = "lst-1";
    orch.submit_listing(intake(id)).await.unwrap();

    orch.submit_transition(complete(id, Stage::Inspection, "insp-9", Role::Inspector))
        .await
        .unwrap();
    let snapshot = orch.listings().await.unwrap().remove(0);
    assert_eq!(snapshot.listing.financing, FinancingState::Declined);
    assert_eq!(snapshot.listing.advance, None);
    assert_eq!(
        snapshot.listing.latest_decision().unwrap().reason,
        ReasonCode::ExporterDefaultHistory
    );

    // Decline does not halt the workflow; the lot moves on and liquidates.
    orch.submit_transition(complete(id, Stage::Warehousing, "wh-1", Role::WarehouseOperator))
        .await
        .unwrap();
    let outcome = orch
        .submit_transition(TransitionRequest {
            listing_id: ListingId::new(id),
            action: TransitionAction::Liquidate,
            actor: "system".to_string(),
            role: Role::System,
            observed_version: None,
            attachment: None,
            notes: None,
            grade: None,
        })
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Applied {
            stage: Stage::Closed,
            financing: FinancingState::Declined,
            ..
        }
    ));
}

#[tokio::test]
async fn decision_history_is_append_only() {
    let orch = orchestrator();
    let id = "lst-1";
    orch.submit_listing(intake(id)).await.unwrap();
    inspect(&orch, id).await;

    let snapshot = orch.listings().await.unwrap().remove(0);
    assert_eq!(snapshot.listing.decisions.len(), 1);
    let decision = &snapshot.listing.decisions[0];
    assert_eq!(decision.evaluated_version, 1);
    assert!(decision.approved);

    // A duplicate inspection completion is a no-op and must not re-evaluate.
    orch.submit_transition(
        complete(id, Stage::Inspection, "insp-2", Role::Inspector).with_grade(DamageGrade::C),
    )
    .await
    .unwrap();
    let snapshot = orch.listings().await.unwrap().remove(0);
    assert_eq!(snapshot.listing.decisions.len(), 1);
    assert_eq!(snapshot.listing.financing, FinancingState::Approved);
}

#[tokio::test]
async fn settlement_requires_prior_disbursement() {
    let orch = orchestrator();
    let id = "lst-1";
    orch.submit_listing(intake(id)).await.unwrap();
    inspect(&orch, id).await;

    let err = orch
        .submit_transition(TransitionRequest::financing(
            ListingId::new(id),
            TransitionAction::ConfirmSettlement,
            "fin-1",
        ))
        .await
        .unwrap_err();
    match err {
        EngineError::InvalidFinancingState { state, .. } => assert_eq!(state, "approved"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn financing_confirmations_need_the_financier_role() {
    let orch = orchestrator();
    let id = "lst-1";
    orch.submit_listing(intake(id)).await.unwrap();
    inspect(&orch, id).await;

    let mut request = TransitionRequest::financing(
        ListingId::new(id),
        TransitionAction::ConfirmDisbursement,
        "exp-1",
    );
    request.role = Role::Exporter;
    let err = orch.submit_transition(request).await.unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { .. }));
}

#[tokio::test]
async fn disbursement_and_settlement_remain_valid_after_close() {
    let orch = orchestrator();
    let id = "lst-1";
    orch.submit_listing(intake(id)).await.unwrap();
    inspect(&orch, id).await;
    for (stage, actor, role) in [
        (Stage::Trucking, "truck-1", Role::Trucker),
        (Stage::Documentation, "doc-1", Role::DocumentationAgent),
        (Stage::BuyerSwap, "buyer-7", Role::Buyer),
    ] {
        orch.submit_transition(complete(id, stage, actor, role))
            .await
            .unwrap();
    }
    assert!(orch.listings().await.unwrap()[0].listing.is_closed());

    orch.submit_transition(TransitionRequest::financing(
        ListingId::new(id),
        TransitionAction::ConfirmDisbursement,
        "fin-1",
    ))
    .await
    .unwrap();
    orch.submit_transition(TransitionRequest::financing(
        ListingId::new(id),
        TransitionAction::ConfirmSettlement,
        "fin-1",
    ))
    .await
    .unwrap();

    let snapshot = orch.listings().await.unwrap().remove(0);
    assert_eq!(snapshot.listing.financing, FinancingState::Settled);
    assert!(snapshot.listing.advance_consistent());
}

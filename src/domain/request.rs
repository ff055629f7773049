use crate::domain::financing::DamageGrade;
use crate::domain::listing::{CompletionRecord, FinancingState, ListingId, Stage};
use crate::domain::stage_graph::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a transition request asks the orchestrator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    /// Record completion of an ancillary-service stage.
    CompleteStage(Stage),
    /// Financier confirms the approved advance was paid out.
    ConfirmDisbursement,
    /// Settlement rails confirm repayment of a disbursed advance.
    ConfirmSettlement,
    /// Close the listing on the non-financed disposal path.
    Liquidate,
}

/// Ephemeral transition input; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub listing_id: ListingId,
    pub action: TransitionAction,
    pub actor: String,
    pub role: Role,
    /// Listing version the requester last observed. Staleness is not an
    /// error; the request is re-validated against the fresh snapshot.
    #[serde(default)]
    pub observed_version: Option<u64>,
    #[serde(default)]
    pub attachment: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub grade: Option<DamageGrade>,
}

impl TransitionRequest {
    pub fn complete_stage(
        listing_id: ListingId,
        stage: Stage,
        actor: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            listing_id,
            action: TransitionAction::CompleteStage(stage),
            actor: actor.into(),
            role,
            observed_version: None,
            attachment: None,
            notes: None,
            grade: None,
        }
    }

    pub fn financing(listing_id: ListingId, action: TransitionAction, actor: impl Into<String>) -> Self {
        Self {
            listing_id,
            action,
            actor: actor.into(),
            role: Role::Financier,
            observed_version: None,
            attachment: None,
            notes: None,
            grade: None,
        }
    }

    pub fn with_grade(mut self, grade: DamageGrade) -> Self {
        self.grade = Some(grade);
        self
    }

    pub fn with_observed_version(mut self, version: u64) -> Self {
        self.observed_version = Some(version);
        self
    }
}

/// Result of a successfully handled transition request.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// A new state was committed at `version`.
    Applied {
        version: u64,
        stage: Stage,
        financing: FinancingState,
    },
    /// The stage was already complete; the existing evidence is returned and
    /// nothing was written.
    AlreadyComplete { record: CompletionRecord },
}

/// Record emitted to the external notifier after each committed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub listing_id: ListingId,
    pub stage: Stage,
    pub financing: FinancingState,
    pub version: u64,
    pub timestamp: DateTime<Utc>,
}

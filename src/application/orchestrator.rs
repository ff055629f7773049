use crate::application::financing::FinancingEngine;
use crate::domain::listing::{
    CompletionRecord, FinancingState, Listing, ListingIntake, Stage, VersionedListing,
};
use crate::domain::ports::{EventNotifierBox, ListingStoreBox};
use crate::domain::request::{
    TransitionAction, TransitionEvent, TransitionOutcome, TransitionRequest,
};
use crate::domain::stage_graph::{Role, StageGraph};
use crate::error::{EngineError, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_RETRIES: u32 = 4;

/// The coordination core. Accepts transition requests, validates them
/// against the stage graph and the current listing snapshot, consults the
/// financing engine where the graph requires it, and commits each new state
/// with a single compare-and-set.
///
/// There is no per-listing lock: concurrent requests on the same listing are
/// serialized entirely by the store's CAS, with a bounded optimistic retry
/// loop on version conflicts.
pub struct Orchestrator {
    store: ListingStoreBox,
    graph: Arc<StageGraph>,
    financing: FinancingEngine,
    notifier: EventNotifierBox,
    max_retries: u32,
}

impl Orchestrator {
    pub fn new(
        store: ListingStoreBox,
        graph: Arc<StageGraph>,
        financing: FinancingEngine,
        notifier: EventNotifierBox,
    ) -> Self {
        Self {
            store,
            graph,
            financing,
            notifier,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Creates a listing from exporter intake at stage `submitted`,
    /// financing `none`.
    pub async fn submit_listing(&self, intake: ListingIntake) -> Result<VersionedListing> {
        let listing = Listing::submit(intake, Utc::now());
        let version = self.store.create(listing.clone()).await?;
        info!(listing = %listing.id, version, "listing submitted");
        self.emit(&listing, version).await;
        Ok(VersionedListing { listing, version })
    }

    /// Snapshot of every stored listing, for reporting.
    pub async fn listings(&self) -> Result<Vec<VersionedListing>> {
        self.store.all().await
    }

    /// Applies one transition request. Validation always runs against the
    /// freshly loaded snapshot; a stale `observed_version` on the request is
    /// not an error. On a version conflict the whole sequence reloads and
    /// retries up to the configured bound, then fails `ContentionExhausted`.
    pub async fn submit_transition(&self, request: TransitionRequest) -> Result<TransitionOutcome> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let VersionedListing {
                mut listing,
                version,
            } = self
                .store
                .get(&request.listing_id)
                .await?
                .ok_or_else(|| EngineError::ListingNotFound(request.listing_id.clone()))?;

            if let Some(observed) = request.observed_version
                && observed != version
            {
                debug!(
                    listing = %request.listing_id,
                    observed,
                    current = version,
                    "request carries stale version, re-validating against current state"
                );
            }

            match self.apply(&request, &mut listing, version).await? {
                Applied::No(outcome) => return Ok(outcome),
                Applied::Yes => {}
            }

            match self
                .store
                .compare_and_set(&request.listing_id, version, listing.clone())
                .await
            {
                Ok(new_version) => {
                    info!(
                        listing = %listing.id,
                        version = new_version,
                        stage = %listing.stage,
                        financing = %listing.financing,
                        "transition committed"
                    );
                    self.emit(&listing, new_version).await;
                    return Ok(TransitionOutcome::Applied {
                        version: new_version,
                        stage: listing.stage,
                        financing: listing.financing,
                    });
                }
                Err(err) if err.is_retryable() && attempts <= self.max_retries => {
                    warn!(
                        listing = %request.listing_id,
                        attempts,
                        "commit lost a version race, retrying"
                    );
                }
                Err(err) if err.is_retryable() => {
                    return Err(EngineError::ContentionExhausted {
                        listing: request.listing_id.clone(),
                        attempts,
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Validates and applies the request to the in-memory copy. The copy is
    /// only persisted by the caller's compare-and-set, so any error here
    /// leaves the stored state untouched.
    async fn apply(
        &self,
        request: &TransitionRequest,
        listing: &mut Listing,
        version: u64,
    ) -> Result<Applied> {
        match request.action {
            TransitionAction::CompleteStage(stage) => {
                self.apply_stage_completion(request, listing, version, stage)
                    .await
            }
            TransitionAction::ConfirmDisbursement => {
                // Financing confirmations stay valid after close: rails
                // confirm after disposition.
                self.require_financier(request, listing)?;
                if listing.financing != FinancingState::Approved {
                    return Err(self.bad_financing_state(listing));
                }
                listing.financing = FinancingState::Disbursed;
                Ok(Applied::Yes)
            }
            TransitionAction::ConfirmSettlement => {
                self.require_financier(request, listing)?;
                if listing.financing != FinancingState::Disbursed {
                    return Err(self.bad_financing_state(listing));
                }
                listing.financing = FinancingState::Settled;
                Ok(Applied::Yes)
            }
            TransitionAction::Liquidate => {
                if listing.is_closed() {
                    return Err(EngineError::TerminalListing {
                        listing: listing.id.clone(),
                    });
                }
                if !matches!(request.role, Role::Exporter | Role::System) {
                    return Err(EngineError::Unauthorized {
                        listing: listing.id.clone(),
                        role: request.role,
                        stage: listing.stage,
                    });
                }
                listing.stage = Stage::Closed;
                Ok(Applied::Yes)
            }
        }
    }

    async fn apply_stage_completion(
        &self,
        request: &TransitionRequest,
        listing: &mut Listing,
        version: u64,
        stage: Stage,
    ) -> Result<Applied> {
        let roles = self.graph.authorized_roles(stage)?;
        if !roles.contains(&request.role) {
            return Err(EngineError::Unauthorized {
                listing: listing.id.clone(),
                role: request.role,
                stage,
            });
        }

        if listing.is_closed() {
            return Err(EngineError::TerminalListing {
                listing: listing.id.clone(),
            });
        }
        let missing: Vec<Stage> = self
            .graph
            .prerequisites_of(stage)?
            .iter()
            .copied()
            .filter(|prereq| !listing.completed(*prereq))
            .collect();
        if !missing.is_empty() {
            return Err(EngineError::PrerequisiteNotMet {
                listing: listing.id.clone(),
                stage,
                missing,
            });
        }

        // Duplicate completions succeed as no-ops so at-least-once delivery
        // from external triggers stays safe.
        if let Some(record) = listing.completion_record(stage) {
            debug!(listing = %listing.id, %stage, "stage already complete, no-op");
            return Ok(Applied::No(TransitionOutcome::AlreadyComplete {
                record: record.clone(),
            }));
        }

        listing.evidence.insert(
            stage,
            CompletionRecord {
                stage,
                actor: request.actor.clone(),
                completed_at: Utc::now(),
                attachment: request.attachment.clone(),
                notes: request.notes.clone(),
                grade: request.grade,
            },
        );
        // Completing the buyer swap is the confirmed-swap disposal path.
        listing.stage = if stage == Stage::BuyerSwap {
            Stage::Closed
        } else {
            stage
        };

        if self.graph.triggers_financing(stage)? {
            listing.financing = FinancingState::Pending;
            let decision = self.financing.evaluate(listing, version).await?;
            if decision.approved {
                listing.financing = FinancingState::Approved;
                listing.advance = Some(decision.advance);
            } else {
                listing.financing = FinancingState::Declined;
                listing.advance = None;
            }
            listing.decisions.push(decision);
        }

        Ok(Applied::Yes)
    }

    fn require_financier(&self, request: &TransitionRequest, listing: &Listing) -> Result<()> {
        if request.role == Role::Financier {
            Ok(())
        } else {
            Err(EngineError::Unauthorized {
                listing: listing.id.clone(),
                role: request.role,
                stage: listing.stage,
            })
        }
    }

    fn bad_financing_state(&self, listing: &Listing) -> EngineError {
        EngineError::InvalidFinancingState {
            listing: listing.id.clone(),
            state: listing.financing.to_string(),
        }
    }

    /// Best-effort event emission; the commit is the source of truth and a
    /// notifier failure never rolls it back.
    async fn emit(&self, listing: &Listing, version: u64) {
        let event = TransitionEvent {
            listing_id: listing.id.clone(),
            stage: listing.stage,
            financing: listing.financing,
            version,
            timestamp: Utc::now(),
        };
        if let Err(err) = self.notifier.notify(event).await {
            warn!(listing = %listing.id, %err, "event notification failed");
        }
    }
}

enum Applied {
    Yes,
    No(TransitionOutcome),
}

use crate::domain::listing::{ListingId, Stage};
use crate::domain::stage_graph::Role;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown stage: {0}")]
    InvalidStage(String),

    #[error("malformed stage graph: {0}")]
    MalformedGraph(String),

    #[error("role {role:?} is not authorized for {stage:?} on listing {listing}")]
    Unauthorized {
        listing: ListingId,
        role: Role,
        stage: Stage,
    },

    #[error("listing {listing}: prerequisites not met for {stage:?}, missing {missing:?}")]
    PrerequisiteNotMet {
        listing: ListingId,
        stage: Stage,
        missing: Vec<Stage>,
    },

    #[error("listing {listing} is closed and accepts no further stage transitions")]
    TerminalListing { listing: ListingId },

    #[error("listing {listing} has no completed inspection and is ineligible for financing")]
    IneligibleForFinancing { listing: ListingId },

    #[error("listing {listing}: financing action not valid in state {state}")]
    InvalidFinancingState { listing: ListingId, state: String },

    #[error("listing {listing}: expected version {expected}, store is at {actual}")]
    VersionConflict {
        listing: ListingId,
        expected: u64,
        actual: u64,
    },

    #[error("listing {listing}: gave up after {attempts} contended commit attempts")]
    ContentionExhausted { listing: ListingId, attempts: u32 },

    #[error("listing {listing}: exporter history lookup timed out during financing evaluation")]
    FinancingEngineTimeout { listing: ListingId },

    #[error("listing {0} not found")]
    ListingNotFound(ListingId),

    #[error("listing {0} already exists")]
    DuplicateListing(ListingId),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EngineError {
    /// True for errors the orchestrator recovers from by reloading and retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::VersionConflict { .. })
    }
}

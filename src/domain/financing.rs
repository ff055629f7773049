use crate::domain::listing::{ListingId, Money};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Damage grade assessed at inspection. A is cosmetic damage, C is severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageGrade {
    A,
    B,
    C,
}

/// Machine-readable reason attached to a financing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    RiskAcceptable,
    RiskScoreBelowThreshold,
    SevereDamage,
    ExporterDefaultHistory,
}

/// Exporter repayment track record, supplied by an external lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub settled_advances: u32,
    pub defaulted_advances: u32,
}

impl HistoryRecord {
    pub fn total(&self) -> u32 {
        self.settled_advances + self.defaulted_advances
    }
}

/// Outcome of one financing evaluation at a specific listing version.
///
/// Immutable once produced; a later evaluation appends a superseding record,
/// it never edits this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingDecision {
    pub listing_id: ListingId,
    pub evaluated_version: u64,
    pub risk_score: u8,
    pub advance: Money,
    pub approved: bool,
    pub reason: ReasonCode,
}

impl FinancingDecision {
    /// Simple-interest preview for an advance held over `days` at an annual
    /// percentage rate.
    pub fn interest_preview(&self, annual_rate_percent: Decimal, days: u32) -> Money {
        let interest =
            self.advance.value() * annual_rate_percent * Decimal::from(days) / dec!(36500);
        Money::new(interest).unwrap_or(Money::ZERO)
    }
}

use crate::domain::financing::{DamageGrade, FinancingDecision, HistoryRecord, ReasonCode};
use crate::domain::listing::{Listing, Money, Stage};
use crate::domain::ports::ExporterHistoryBox;
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;
use tracing::debug;

/// Policy knobs for financing evaluation. Rates are fractions of declared
/// value; the ceiling caps the advance regardless of score.
#[derive(Debug, Clone)]
pub struct FinancingConfig {
    pub approval_threshold: u8,
    pub base_advance_rate: Decimal,
    pub enhanced_advance_rate: Decimal,
    pub enhanced_score: u8,
    pub advance_ceiling: Money,
    pub history_timeout: Duration,
}

impl Default for FinancingConfig {
    fn default() -> Self {
        Self {
            approval_threshold: 60,
            base_advance_rate: dec!(0.6),
            enhanced_advance_rate: dec!(0.7),
            enhanced_score: 85,
            advance_ceiling: Money::new(dec!(250000)).expect("non-negative ceiling"),
            history_timeout: Duration::from_secs(2),
        }
    }
}

/// Computes financing eligibility and advance amounts.
///
/// Scoring is a pure function of the listing snapshot and the exporter
/// history record, so re-evaluation after an optimistic-concurrency retry
/// yields the same decision for the same inputs. The only blocking call is
/// the history lookup, which is bounded by `history_timeout`.
pub struct FinancingEngine {
    config: FinancingConfig,
    history: ExporterHistoryBox,
}

impl FinancingEngine {
    pub fn new(config: FinancingConfig, history: ExporterHistoryBox) -> Self {
        Self { config, history }
    }

    /// Evaluates a listing whose evidence already contains an inspection
    /// record, at the given store version.
    pub async fn evaluate(&self, listing: &Listing, version: u64) -> Result<FinancingDecision> {
        let inspection = listing.completion_record(Stage::Inspection).ok_or_else(|| {
            EngineError::IneligibleForFinancing {
                listing: listing.id.clone(),
            }
        })?;
        let grade = inspection.grade;

        let history = tokio::time::timeout(
            self.config.history_timeout,
            self.history.history(&listing.exporter),
        )
        .await
        .map_err(|_| EngineError::FinancingEngineTimeout {
            listing: listing.id.clone(),
        })??;

        let risk_score = score(listing.declared_value, history, grade);
        let approved = risk_score >= self.config.approval_threshold;
        let advance = if approved {
            let rate = if risk_score >= self.config.enhanced_score {
                self.config.enhanced_advance_rate
            } else {
                self.config.base_advance_rate
            };
            listing
                .declared_value
                .scale(rate)
                .min(self.config.advance_ceiling)
        } else {
            Money::ZERO
        };
        let reason = if approved {
            ReasonCode::RiskAcceptable
        } else if grade == Some(DamageGrade::C) {
            ReasonCode::SevereDamage
        } else if history.is_some_and(|h| h.defaulted_advances > h.settled_advances) {
            ReasonCode::ExporterDefaultHistory
        } else {
            ReasonCode::RiskScoreBelowThreshold
        };

        debug!(
            listing = %listing.id,
            risk_score,
            approved,
            "financing evaluated"
        );

        Ok(FinancingDecision {
            listing_id: listing.id.clone(),
            evaluated_version: version,
            risk_score,
            advance,
            approved,
            reason,
        })
    }
}

/// Risk score in 0..=100, higher is safer. Base 40, plus up to 30 from the
/// exporter's settlement ratio (12 when unknown), a declared-value band
/// adjustment, and the inspection damage grade.
fn score(declared_value: Money, history: Option<HistoryRecord>, grade: Option<DamageGrade>) -> u8 {
    let mut score: i32 = 40;

    score += match history {
        None => 12,
        Some(h) if h.total() == 0 => 12,
        Some(h) => {
            let ratio = f64::from(h.settled_advances) / f64::from(h.total());
            (ratio * 30.0).round() as i32
        }
    };

    let value = declared_value.value();
    score += if value < dec!(10000) {
        10
    } else if value < dec!(100000) {
        5
    } else {
        0
    };

    score += match grade {
        Some(DamageGrade::A) => 15,
        Some(DamageGrade::B) => 5,
        Some(DamageGrade::C) => -20,
        None => 0,
    };

    score.clamp(0, 100) as u8
}

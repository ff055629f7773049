use crate::domain::financing::{DamageGrade, FinancingDecision};
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique, immutable identifier of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl ListingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents a non-negative monetary value in USD.
///
/// Wrapper around `rust_decimal::Decimal` to enforce domain rules and keep
/// advance/valuation arithmetic exact.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, EngineError> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(EngineError::Validation(
                "monetary value must be non-negative".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Scales by a fractional rate, e.g. an advance rate of 0.6.
    pub fn scale(&self, rate: Decimal) -> Self {
        Self(self.0 * rate)
    }

    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 { self } else { other }
    }
}

impl TryFrom<Decimal> for Money {
    type Error = EngineError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(m: Money) -> Self {
        m.0
    }
}

/// Lifecycle stage of a listing. `Submitted` is the intake state, `Closed`
/// is terminal; the rest are ancillary service stages from the stage graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Submitted,
    Inspection,
    Packaging,
    Trucking,
    Warehousing,
    Documentation,
    BuyerSwap,
    Closed,
}

impl Stage {
    /// The six completable ancillary-service stages, i.e. valid targets of a
    /// stage-completion request.
    pub const SERVICES: [Stage; 6] = [
        Stage::Inspection,
        Stage::Packaging,
        Stage::Trucking,
        Stage::Warehousing,
        Stage::Documentation,
        Stage::BuyerSwap,
    ];

    pub fn is_service(&self) -> bool {
        Self::SERVICES.contains(self)
    }

    pub fn parse(name: &str) -> Result<Self, EngineError> {
        match name {
            "submitted" => Ok(Stage::Submitted),
            "inspection" => Ok(Stage::Inspection),
            "packaging" => Ok(Stage::Packaging),
            "trucking" => Ok(Stage::Trucking),
            "warehousing" => Ok(Stage::Warehousing),
            "documentation" => Ok(Stage::Documentation),
            "buyer_swap" => Ok(Stage::BuyerSwap),
            "closed" => Ok(Stage::Closed),
            other => Err(EngineError::InvalidStage(other.to_string())),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Submitted => "submitted",
            Stage::Inspection => "inspection",
            Stage::Packaging => "packaging",
            Stage::Trucking => "trucking",
            Stage::Warehousing => "warehousing",
            Stage::Documentation => "documentation",
            Stage::BuyerSwap => "buyer_swap",
            Stage::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Financing state, orthogonal to the service stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FinancingState {
    #[default]
    None,
    Pending,
    Approved,
    Disbursed,
    Settled,
    Declined,
}

impl FinancingState {
    /// States in which an advance amount must be attached to the listing.
    pub fn carries_advance(&self) -> bool {
        matches!(
            self,
            FinancingState::Approved | FinancingState::Disbursed | FinancingState::Settled
        )
    }
}

impl fmt::Display for FinancingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FinancingState::None => "none",
            FinancingState::Pending => "pending",
            FinancingState::Approved => "approved",
            FinancingState::Disbursed => "disbursed",
            FinancingState::Settled => "settled",
            FinancingState::Declined => "declined",
        };
        f.write_str(name)
    }
}

/// Goods category with its default valuation percentage, the fraction of the
/// original price a damaged/rejected lot is assumed to retain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoodsCategory {
    Electronics,
    Automobile,
    Textiles,
    Furniture,
    Machinery,
    PlasticGoods,
    Chemicals,
    FoodAndBeverage,
    Metals,
    Paper,
    Pharmaceuticals,
    Toys,
    Glassware,
    Footwear,
    LeatherProducts,
}

impl GoodsCategory {
    pub fn default_valuation_percent(&self) -> Decimal {
        match self {
            GoodsCategory::Electronics => dec!(50),
            GoodsCategory::Automobile => dec!(55),
            GoodsCategory::Textiles => dec!(40),
            GoodsCategory::Furniture => dec!(60),
            GoodsCategory::Machinery => dec!(45),
            GoodsCategory::PlasticGoods => dec!(35),
            GoodsCategory::Chemicals => dec!(30),
            GoodsCategory::FoodAndBeverage => dec!(25),
            GoodsCategory::Metals => dec!(50),
            GoodsCategory::Paper => dec!(30),
            GoodsCategory::Pharmaceuticals => dec!(40),
            GoodsCategory::Toys => dec!(35),
            GoodsCategory::Glassware => dec!(45),
            GoodsCategory::Footwear => dec!(38),
            GoodsCategory::LeatherProducts => dec!(42),
        }
    }
}

/// Evidence that an ancillary-service stage was completed on a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub stage: Stage,
    pub actor: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Damage grade assessed during inspection; feeds the risk score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<DamageGrade>,
}

/// Intake data supplied by the exporter when submitting a lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingIntake {
    pub id: ListingId,
    pub exporter: String,
    pub description: String,
    pub hs_code: String,
    pub quantity: u32,
    pub port_of_rejection: String,
    pub rejection_reason: String,
    pub category: GoodsCategory,
    pub original_price: Money,
    /// Overrides the category's default valuation percentage when set.
    #[serde(default)]
    pub valuation_override_percent: Option<Decimal>,
}

/// One damaged-goods lot offered by an exporter, tracked through the service
/// stages and the financing lifecycle.
///
/// Mutated exclusively through orchestrator-committed transitions; the
/// version counter lives in [`VersionedListing`] and is managed by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub exporter: String,
    pub description: String,
    pub hs_code: String,
    pub quantity: u32,
    pub port_of_rejection: String,
    pub rejection_reason: String,
    pub category: GoodsCategory,
    pub original_price: Money,
    pub valuation_percent: Decimal,
    /// original_price scaled by valuation_percent; the base for financing.
    pub declared_value: Money,
    pub stage: Stage,
    pub financing: FinancingState,
    /// Set iff financing is approved, disbursed or settled.
    pub advance: Option<Money>,
    /// Stage-completion evidence, keyed by stage.
    pub evidence: BTreeMap<Stage, CompletionRecord>,
    /// Append-only history of financing decisions, newest last.
    pub decisions: Vec<FinancingDecision>,
    pub submitted_at: DateTime<Utc>,
}

impl Listing {
    pub fn submit(intake: ListingIntake, now: DateTime<Utc>) -> Self {
        let valuation_percent = intake
            .valuation_override_percent
            .unwrap_or_else(|| intake.category.default_valuation_percent());
        let declared_value = intake
            .original_price
            .scale(valuation_percent / dec!(100));
        Self {
            id: intake.id,
            exporter: intake.exporter,
            description: intake.description,
            hs_code: intake.hs_code,
            quantity: intake.quantity,
            port_of_rejection: intake.port_of_rejection,
            rejection_reason: intake.rejection_reason,
            category: intake.category,
            original_price: intake.original_price,
            valuation_percent,
            declared_value,
            stage: Stage::Submitted,
            financing: FinancingState::None,
            advance: None,
            evidence: BTreeMap::new(),
            decisions: Vec::new(),
            submitted_at: now,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.stage == Stage::Closed
    }

    pub fn completed(&self, stage: Stage) -> bool {
        self.evidence.contains_key(&stage)
    }

    pub fn completion_record(&self, stage: Stage) -> Option<&CompletionRecord> {
        self.evidence.get(&stage)
    }

    pub fn latest_decision(&self) -> Option<&FinancingDecision> {
        self.decisions.last()
    }

    /// Advance amount is attached exactly in the financing states that
    /// carry one.
    pub fn advance_consistent(&self) -> bool {
        self.advance.is_some() == self.financing.carries_advance()
    }
}

/// A listing paired with the store's optimistic-concurrency token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedListing {
    pub listing: Listing,
    pub version: u64,
}

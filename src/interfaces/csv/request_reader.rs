use crate::domain::financing::DamageGrade;
use crate::domain::listing::{GoodsCategory, ListingId, ListingIntake, Money, Stage};
use crate::domain::request::{TransitionAction, TransitionRequest};
use crate::domain::stage_graph::Role;
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct IntakeRow {
    id: String,
    exporter: String,
    description: String,
    hs_code: String,
    quantity: u32,
    port_of_rejection: String,
    rejection_reason: String,
    category: GoodsCategory,
    original_price: Decimal,
    valuation_override_percent: Option<Decimal>,
}

impl TryFrom<IntakeRow> for ListingIntake {
    type Error = EngineError;

    fn try_from(row: IntakeRow) -> Result<Self> {
        Ok(ListingIntake {
            id: ListingId::new(row.id),
            exporter: row.exporter,
            description: row.description,
            hs_code: row.hs_code,
            quantity: row.quantity,
            port_of_rejection: row.port_of_rejection,
            rejection_reason: row.rejection_reason,
            category: row.category,
            original_price: Money::new(row.original_price)?,
            valuation_override_percent: row.valuation_override_percent,
        })
    }
}

/// Reads exporter intake rows from CSV.
pub struct IntakeReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> IntakeReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn intakes(self) -> impl Iterator<Item = Result<ListingIntake>> {
        self.reader.into_deserialize().map(|result| {
            result
                .map_err(EngineError::from)
                .and_then(|row: IntakeRow| row.try_into())
        })
    }
}

#[derive(Debug, Deserialize)]
struct RequestRow {
    listing: String,
    action: String,
    stage: Option<String>,
    actor: String,
    role: String,
    observed_version: Option<u64>,
    attachment: Option<String>,
    notes: Option<String>,
    grade: Option<String>,
}

impl TryFrom<RequestRow> for TransitionRequest {
    type Error = EngineError;

    fn try_from(row: RequestRow) -> Result<Self> {
        let action = match row.action.as_str() {
            "complete_stage" => {
                let stage = row.stage.as_deref().ok_or_else(|| {
                    EngineError::Validation("complete_stage rows need a stage column".to_string())
                })?;
                TransitionAction::CompleteStage(Stage::parse(stage)?)
            }
            "confirm_disbursement" => TransitionAction::ConfirmDisbursement,
            "confirm_settlement" => TransitionAction::ConfirmSettlement,
            "liquidate" => TransitionAction::Liquidate,
            other => {
                return Err(EngineError::Validation(format!(
                    "unknown transition action: {other}"
                )));
            }
        };
        let grade = match row.grade.as_deref() {
            None | Some("") => None,
            Some("A") => Some(DamageGrade::A),
            Some("B") => Some(DamageGrade::B),
            Some("C") => Some(DamageGrade::C),
            Some(other) => {
                return Err(EngineError::Validation(format!(
                    "unknown damage grade: {other}"
                )));
            }
        };
        Ok(TransitionRequest {
            listing_id: ListingId::new(row.listing),
            action,
            actor: row.actor,
            role: Role::parse(&row.role)?,
            observed_version: row.observed_version,
            attachment: row.attachment.filter(|s| !s.is_empty()),
            notes: row.notes.filter(|s| !s.is_empty()),
            grade,
        })
    }
}

/// Reads transition requests from CSV, one service event per row.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn requests(self) -> impl Iterator<Item = Result<TransitionRequest>> {
        self.reader.into_deserialize().map(|result| {
            result
                .map_err(EngineError::from)
                .and_then(|row: RequestRow| row.try_into())
        })
    }
}

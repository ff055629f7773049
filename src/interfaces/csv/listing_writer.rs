use crate::domain::listing::VersionedListing;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct ReportRow {
    id: String,
    exporter: String,
    stage: String,
    financing: String,
    declared_value: Decimal,
    advance: Option<Decimal>,
    risk_score: Option<u8>,
    version: u64,
}

impl From<&VersionedListing> for ReportRow {
    fn from(v: &VersionedListing) -> Self {
        let listing = &v.listing;
        Self {
            id: listing.id.to_string(),
            exporter: listing.exporter.clone(),
            stage: listing.stage.to_string(),
            financing: listing.financing.to_string(),
            declared_value: listing.declared_value.value().normalize(),
            advance: listing.advance.map(|a| a.value().normalize()),
            risk_score: listing.latest_decision().map(|d| d.risk_score),
            version: v.version,
        }
    }
}

/// Writes the final state of all listings as a CSV report.
pub struct ListingWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ListingWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_listings(&mut self, listings: &[VersionedListing]) -> Result<()> {
        for versioned in listings {
            self.writer.serialize(ReportRow::from(versioned))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::listing::{
        GoodsCategory, Listing, ListingId, ListingIntake, Money,
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn writes_header_and_rows() {
        let listing = Listing::submit(
            ListingIntake {
                id: ListingId::new("lst-1"),
                exporter: "exp-1".to_string(),
                description: "rusted metal sheets".to_string(),
                hs_code: "7208.10".to_string(),
                quantity: 300,
                port_of_rejection: "Kandla".to_string(),
                rejection_reason: "corrosion".to_string(),
                category: GoodsCategory::Metals,
                original_price: Money::new(dec!(60000)).unwrap(),
                valuation_override_percent: None,
            },
            Utc::now(),
        );
        let versioned = VersionedListing {
            listing,
            version: 1,
        };

        let mut buf = Vec::new();
        ListingWriter::new(&mut buf)
            .write_listings(std::slice::from_ref(&versioned))
            .unwrap();

        let out = String::from_utf8(buf).unwrap();
        let mut lines = out.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,exporter,stage,financing,declared_value,advance,risk_score,version"
        );
        assert_eq!(
            lines.next().unwrap(),
            "lst-1,exp-1,submitted,none,30000,,,1"
        );
    }
}

use crate::domain::due::Due;
use crate::domain::money::Balance;
use crate::domain::period::Period;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct DueRow {
    id: u32,
    member: u32,
    period: Period,
    amount_due: Decimal,
    #[serde(default)]
    amount_paid: Option<Decimal>,
}

impl From<DueRow> for Due {
    fn from(row: DueRow) -> Self {
        let mut due = Due::new(row.id, row.member, row.period, Balance::new(row.amount_due));
        due.amount_paid = row.amount_paid.map(Balance::new).unwrap_or_default();
        due
    }
}

/// Reads contribution dues from a CSV source.
///
/// Expected columns: `id, member, period, amount_due, amount_paid`. An empty
/// `amount_paid` reads as zero. Rows are not validated here; the ledger does that
/// when they are registered.
pub struct DueReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> DueReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes dues.
    pub fn dues(self) -> impl Iterator<Item = Result<Due>> {
        self.reader
            .into_deserialize::<DueRow>()
            .map(|result| result.map(Due::from).map_err(LedgerError::from))
    }
}

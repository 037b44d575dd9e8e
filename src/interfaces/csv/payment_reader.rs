use crate::domain::payment::{PaymentRequest, PaymentRow};
use crate::error::{LedgerError, Result};
use std::io::Read;

/// Reads payments from a CSV source.
///
/// Each row is deserialized into a raw [`PaymentRow`] and then validated into a
/// [`PaymentRequest`]; either step can fail per row without ending the stream.
pub struct PaymentReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn payments(self) -> impl Iterator<Item = Result<PaymentRequest>> {
        self.reader.into_deserialize::<PaymentRow>().map(|result| {
            result
                .map_err(LedgerError::from)
                .and_then(PaymentRequest::try_from)
        })
    }
}

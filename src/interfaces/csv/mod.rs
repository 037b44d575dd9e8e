//! CSV adapters used by the batch CLI.

pub mod due_reader;
pub mod payment_reader;
pub mod writer;

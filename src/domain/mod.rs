//! Domain model of the contribution ledger: money, periods, dues, payments and the
//! allocator that distributes a payment across dues.

pub mod allocation;
pub mod due;
pub mod money;
pub mod payment;
pub mod period;
pub mod ports;

use super::money::Balance;
use super::period::Period;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum DueStatus {
    Unpaid,
    Partial,
    Paid,
    Cancelled,
}

impl fmt::Display for DueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DueStatus::Unpaid => "unpaid",
            DueStatus::Partial => "partial",
            DueStatus::Paid => "paid",
            DueStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A contribution owed by a member for one reference period.
///
/// The status is never stored: it is recomputed from `amount_due`, `amount_paid`
/// and the cancellation flag every time it is read.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Due {
    pub id: u32,
    pub member: u32,
    pub period: Period,
    pub amount_due: Balance,
    pub amount_paid: Balance,
    #[serde(default)]
    pub cancelled: bool,
}

impl Due {
    pub fn new(id: u32, member: u32, period: Period, amount_due: Balance) -> Self {
        Self {
            id,
            member,
            period,
            amount_due,
            amount_paid: Balance::ZERO,
            cancelled: false,
        }
    }

    /// Amount still owed. Negative only when stored data is corrupt.
    pub fn remaining(&self) -> Balance {
        self.amount_due - self.amount_paid
    }

    pub fn status(&self) -> DueStatus {
        if self.cancelled {
            DueStatus::Cancelled
        } else if self.amount_paid.is_zero() {
            DueStatus::Unpaid
        } else if self.amount_paid >= self.amount_due {
            DueStatus::Paid
        } else {
            DueStatus::Partial
        }
    }

    pub fn is_outstanding(&self) -> bool {
        !self.cancelled && self.remaining() > Balance::ZERO
    }

    /// Checks the invariants a due must hold before it enters the ledger.
    pub fn validate(&self) -> Result<()> {
        if self.amount_due <= Balance::ZERO {
            return Err(LedgerError::ValidationError(format!(
                "Due {} must have a positive amount due",
                self.id
            )));
        }
        if self.amount_paid < Balance::ZERO || self.amount_paid > self.amount_due {
            return Err(LedgerError::ValidationError(format!(
                "Due {} has amount paid {} outside 0..={}",
                self.id, self.amount_paid, self.amount_due
            )));
        }
        Ok(())
    }

    /// Records a payment share against this due.
    pub fn apply(&mut self, amount: Balance) -> Result<()> {
        if amount < Balance::ZERO {
            return Err(LedgerError::IntegrityError(format!(
                "Negative allocation {} for due {}",
                amount, self.id
            )));
        }
        if amount.is_zero() {
            return Ok(());
        }
        if self.cancelled {
            return Err(LedgerError::IntegrityError(format!(
                "Due {} is cancelled",
                self.id
            )));
        }
        if amount > self.remaining() {
            return Err(LedgerError::IntegrityError(format!(
                "Allocation {} exceeds remaining {} on due {}",
                amount,
                self.remaining(),
                self.id
            )));
        }
        self.amount_paid += amount;
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }
}

use super::allocation::Allocation;
use super::due::Due;
use super::money::{Amount, Balance};
use crate::error::{LedgerError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A payment tendered by a member. Immutable once recorded.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub id: u32,
    pub member: u32,
    pub amount: Amount,
    pub method: String,
    pub bank_account: u32,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

/// Raw payment row as it arrives from an input source, before validation.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct PaymentRow {
    pub payment: u32,
    pub member: u32,
    pub amount: Decimal,
    #[serde(default)]
    pub method: Option<String>,
    pub bank_account: u32,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Optional `;`-separated due ids the payment is restricted to.
    #[serde(default)]
    pub dues: Option<String>,
}

/// Parses a `;`-separated list of due ids, e.g. `3;7;12`. Blank entries are ignored.
pub fn parse_due_ids(list: &str) -> Result<Vec<u32>> {
    list.split(';')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<u32>().map_err(|_| {
                LedgerError::ValidationError(format!("Invalid due id '{}' in selection", id))
            })
        })
        .collect()
}

/// A validated request to settle a payment.
///
/// `selection` restricts the payment to specific dues; `None` means every
/// outstanding due of the member.
#[derive(Debug, PartialEq, Clone)]
pub struct PaymentRequest {
    pub payment: Payment,
    pub selection: Option<Vec<u32>>,
}

impl TryFrom<PaymentRow> for PaymentRequest {
    type Error = LedgerError;

    fn try_from(row: PaymentRow) -> Result<Self> {
        let amount = Amount::new(row.amount)?;
        let method = row
            .method
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| {
                LedgerError::ValidationError(format!(
                    "Payment {} is missing a method",
                    row.payment
                ))
            })?;
        let selection = match row.dues.as_deref().map(parse_due_ids).transpose()? {
            Some(ids) if ids.is_empty() => None,
            other => other,
        };

        Ok(Self {
            payment: Payment {
                id: row.payment,
                member: row.member,
                amount,
                method,
                bank_account: row.bank_account,
                date: row
                    .date
                    .unwrap_or_else(|| chrono::Utc::now().date_naive()),
                notes: row.notes.filter(|n| !n.trim().is_empty()),
            },
            selection,
        })
    }
}

/// Balance of a bank account that receives member payments.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct BankAccount {
    pub account: u32,
    pub balance: Balance,
}

impl BankAccount {
    pub fn new(account: u32) -> Self {
        Self {
            account,
            balance: Balance::ZERO,
        }
    }

    pub fn credit(&mut self, amount: Amount) {
        self.balance += amount.into();
    }
}

/// Everything a settled payment changes, committed to storage as one unit.
///
/// The store applies `allocations` to the dues as they are stored at commit time;
/// a settlement never carries due snapshots of its own.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Settlement {
    pub payment: Payment,
    pub allocations: Vec<Allocation>,
    pub remainder: Balance,
}

impl Settlement {
    /// Applies the non-zero allocations to the dues as `current` returns them, and
    /// returns the updated dues.
    ///
    /// `current` reads the stored due; callers run this under the same lock as the
    /// write that follows. A due that was cancelled or paid down since allocation
    /// yields [`LedgerError::Conflict`].
    pub fn apply_to<F>(&self, mut current: F) -> Result<Vec<Due>>
    where
        F: FnMut(u32) -> Result<Option<Due>>,
    {
        let mut updated: Vec<Due> = Vec::new();
        for allocation in self.allocations.iter().filter(|a| !a.applied.is_zero()) {
            let mut due = match updated.iter().position(|d| d.id == allocation.due) {
                Some(i) => updated.swap_remove(i),
                None => current(allocation.due)?
                    .ok_or_else(|| LedgerError::NotFound(format!("Due {}", allocation.due)))?,
            };
            if due.member != self.payment.member {
                return Err(LedgerError::IntegrityError(format!(
                    "Due {} does not belong to member {}",
                    due.id, self.payment.member
                )));
            }
            if due.cancelled {
                return Err(LedgerError::Conflict(format!(
                    "Due {} was cancelled",
                    due.id
                )));
            }
            if allocation.applied > due.remaining() {
                return Err(LedgerError::Conflict(format!(
                    "Due {} has {} left, cannot take {}",
                    due.id,
                    due.remaining(),
                    allocation.applied
                )));
            }
            due.apply(allocation.applied)?;
            updated.push(due);
        }
        Ok(updated)
    }
}

/// A recorded payment together with the part of it no due absorbed.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentRecord {
    pub payment: Payment,
    pub remainder: Balance,
}

/// What the caller gets back after a payment is settled.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Receipt {
    pub payment: u32,
    pub allocations: Vec<Allocation>,
    pub remainder: Balance,
}

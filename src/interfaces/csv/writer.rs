use crate::domain::allocation::AllocationPlan;
use crate::domain::due::{Due, DueStatus};
use crate::domain::money::Balance;
use crate::domain::payment::BankAccount;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct DueRecord<'a> {
    id: u32,
    member: u32,
    period: String,
    amount_due: &'a Balance,
    amount_paid: &'a Balance,
    status: DueStatus,
}

#[derive(Serialize)]
struct PlanRecord {
    due: Option<u32>,
    period: Option<String>,
    applied: Balance,
}

/// Writes ledger state as CSV to any `Write` sink.
pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LedgerWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Columns: `id, member, period, amount_due, amount_paid, status`.
    pub fn write_dues(&mut self, dues: &[Due]) -> Result<()> {
        for due in dues {
            self.writer.serialize(DueRecord {
                id: due.id,
                member: due.member,
                period: due.period.to_string(),
                amount_due: &due.amount_due,
                amount_paid: &due.amount_paid,
                status: due.status(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Columns: `account, balance`.
    pub fn write_bank_accounts(&mut self, accounts: &[BankAccount]) -> Result<()> {
        for account in accounts {
            self.writer.serialize(account)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Columns: `due, period, applied`. The remainder is the final row, with empty
    /// `due` and `period`.
    pub fn write_plan(&mut self, plan: &AllocationPlan) -> Result<()> {
        for allocation in &plan.allocations {
            self.writer.serialize(PlanRecord {
                due: Some(allocation.due),
                period: Some(allocation.period.to_string()),
                applied: allocation.applied,
            })?;
        }
        self.writer.serialize(PlanRecord {
            due: None,
            period: None,
            applied: plan.remainder,
        })?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes a plan as pretty-printed JSON.
pub fn write_plan_json<W: Write>(mut sink: W, plan: &AllocationPlan) -> Result<()> {
    serde_json::to_writer_pretty(&mut sink, plan)?;
    writeln!(sink)?;
    Ok(())
}

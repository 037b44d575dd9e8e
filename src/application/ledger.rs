use crate::domain::allocation::{AllocationPlan, allocate};
use crate::domain::due::Due;
use crate::domain::money::Amount;
use crate::domain::payment::{BankAccount, Payment, PaymentRequest, Receipt, Settlement};
use crate::domain::ports::{DueStoreBox, SettlementStoreBox};
use crate::error::{LedgerError, Result};
use tracing::{debug, info, warn};

/// How many times a payment is re-allocated when its dues change before it commits.
const MAX_SETTLE_ATTEMPTS: usize = 3;

/// Entry point for recording contribution dues and settling member payments.
///
/// `ContributionLedger` owns its storage handles, which are injected at
/// construction. Every payment runs the allocator against the member's outstanding
/// dues and is committed as a single settlement.
pub struct ContributionLedger {
    due_store: DueStoreBox,
    settlement_store: SettlementStoreBox,
}

impl ContributionLedger {
    /// Creates a new `ContributionLedger` instance.
    ///
    /// # Arguments
    ///
    /// * `due_store` - The store for contribution dues.
    /// * `settlement_store` - The store for payments, allocations and bank balances.
    pub fn new(due_store: DueStoreBox, settlement_store: SettlementStoreBox) -> Self {
        Self {
            due_store,
            settlement_store,
        }
    }

    /// Adds a new due to the ledger.
    pub async fn register_due(&self, due: Due) -> Result<()> {
        due.validate()?;
        debug!(due = due.id, member = due.member, period = %due.period, "registering due");
        self.due_store.insert(due).await
    }

    pub async fn cancel_due(&self, due_id: u32) -> Result<Due> {
        let due = self.due_store.cancel(due_id).await?;
        info!(due = due_id, "due cancelled");
        Ok(due)
    }

    /// Outstanding dues of a member, oldest period first.
    pub async fn outstanding(&self, member: u32) -> Result<Vec<Due>> {
        let mut dues: Vec<Due> = self
            .due_store
            .for_member(member)
            .await?
            .into_iter()
            .filter(Due::is_outstanding)
            .collect();
        dues.sort_by_key(|d| (d.period, d.id));
        Ok(dues)
    }

    /// Computes how `amount` would be distributed, without persisting anything.
    pub async fn preview(
        &self,
        member: u32,
        amount: Amount,
        selection: Option<&[u32]>,
    ) -> Result<AllocationPlan> {
        let dues = self.candidate_dues(member, selection).await?;
        allocate(amount, &dues)
    }

    /// Settles a payment: allocates it and commits the resulting settlement.
    ///
    /// If another writer pays or cancels one of the dues between allocation and
    /// commit, the store reports a conflict and the payment is allocated again
    /// against the fresh dues.
    pub async fn pay(&self, request: PaymentRequest) -> Result<Receipt> {
        let PaymentRequest { payment, selection } = request;
        if self.settlement_store.payment(payment.id).await?.is_some() {
            return Err(LedgerError::Duplicate(format!(
                "Payment {} already recorded",
                payment.id
            )));
        }

        let mut attempt = 1;
        loop {
            let dues = self
                .candidate_dues(payment.member, selection.as_deref())
                .await?;
            let plan = allocate(payment.amount, &dues)?;
            let receipt = Receipt {
                payment: payment.id,
                allocations: plan.allocations.clone(),
                remainder: plan.remainder,
            };
            let settlement = Settlement {
                payment: payment.clone(),
                allocations: plan.allocations,
                remainder: plan.remainder,
            };

            match self.settlement_store.commit(settlement).await {
                Ok(()) => {
                    log_settled(&payment, &receipt);
                    return Ok(receipt);
                }
                Err(LedgerError::Conflict(reason)) if attempt < MAX_SETTLE_ATTEMPTS => {
                    debug!(payment = payment.id, attempt, %reason, "dues changed, re-allocating");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// All dues in the ledger, ordered by id.
    pub async fn dues(&self) -> Result<Vec<Due>> {
        let mut dues = self.due_store.all().await?;
        dues.sort_by_key(|d| d.id);
        Ok(dues)
    }

    /// All bank accounts that received payments, ordered by id.
    pub async fn bank_accounts(&self) -> Result<Vec<BankAccount>> {
        let mut accounts = self.settlement_store.bank_accounts().await?;
        accounts.sort_by_key(|a| a.account);
        Ok(accounts)
    }

    async fn candidate_dues(&self, member: u32, selection: Option<&[u32]>) -> Result<Vec<Due>> {
        let outstanding = self.outstanding(member).await?;
        let Some(selection) = selection else {
            return Ok(outstanding);
        };

        for id in selection {
            match self.due_store.get(*id).await? {
                Some(due) if due.member == member => {}
                _ => {
                    return Err(LedgerError::ValidationError(format!(
                        "Due {} does not belong to member {}",
                        id, member
                    )));
                }
            }
        }
        Ok(outstanding
            .into_iter()
            .filter(|d| selection.contains(&d.id))
            .collect())
    }
}

fn log_settled(payment: &Payment, receipt: &Receipt) {
    let applied: Vec<_> = receipt
        .allocations
        .iter()
        .filter(|a| !a.applied.is_zero())
        .collect();
    for allocation in &applied {
        debug!(
            payment = payment.id,
            due = allocation.due,
            period = %allocation.period,
            applied = %allocation.applied,
            "allocation"
        );
    }
    if !receipt.remainder.is_zero() {
        warn!(
            payment = payment.id,
            member = payment.member,
            remainder = %receipt.remainder,
            "payment exceeds outstanding dues"
        );
    }
    info!(
        payment = payment.id,
        member = payment.member,
        amount = %payment.amount,
        dues = applied.len(),
        "payment settled"
    );
}

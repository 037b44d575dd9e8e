use crate::domain::allocation::Allocation;
use crate::domain::due::Due;
use crate::domain::payment::{BankAccount, PaymentRecord, Settlement};
use crate::domain::ports::{DueStore, SettlementStore};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    dues: HashMap<u32, Due>,
    payments: HashMap<u32, PaymentRecord>,
    // due id -> (payment id, allocation)
    allocations: HashMap<u32, Vec<(u32, Allocation)>>,
    bank_accounts: HashMap<u32, BankAccount>,
}

/// A thread-safe in-memory ledger.
///
/// Implements both [`DueStore`] and [`SettlementStore`] over one shared state, so a
/// settlement is committed under a single write lock. `Clone` shares the state.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DueStore for InMemoryLedgerStore {
    async fn store(&self, due: Due) -> Result<()> {
        let mut state = self.state.write().await;
        state.dues.insert(due.id, due);
        Ok(())
    }

    async fn insert(&self, due: Due) -> Result<()> {
        let mut state = self.state.write().await;
        if state.dues.contains_key(&due.id) {
            return Err(LedgerError::Duplicate(format!("Due {} already exists", due.id)));
        }
        state.dues.insert(due.id, due);
        Ok(())
    }

    async fn cancel(&self, due_id: u32) -> Result<Due> {
        let mut state = self.state.write().await;
        let due = state
            .dues
            .get_mut(&due_id)
            .ok_or_else(|| LedgerError::NotFound(format!("Due {}", due_id)))?;
        due.cancel();
        Ok(due.clone())
    }

    async fn get(&self, due_id: u32) -> Result<Option<Due>> {
        let state = self.state.read().await;
        Ok(state.dues.get(&due_id).cloned())
    }

    async fn for_member(&self, member: u32) -> Result<Vec<Due>> {
        let state = self.state.read().await;
        Ok(state
            .dues
            .values()
            .filter(|d| d.member == member)
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<Due>> {
        let state = self.state.read().await;
        Ok(state.dues.values().cloned().collect())
    }
}

#[async_trait]
impl SettlementStore for InMemoryLedgerStore {
    async fn commit(&self, settlement: Settlement) -> Result<()> {
        let mut state = self.state.write().await;

        // Validate everything before touching the state.
        if state.payments.contains_key(&settlement.payment.id) {
            return Err(LedgerError::Duplicate(format!(
                "Payment {} already recorded",
                settlement.payment.id
            )));
        }
        let updated = settlement.apply_to(|id| Ok(state.dues.get(&id).cloned()))?;

        let Settlement {
            payment,
            allocations,
            remainder,
        } = settlement;
        for due in updated {
            state.dues.insert(due.id, due);
        }
        for allocation in allocations {
            state
                .allocations
                .entry(allocation.due)
                .or_default()
                .push((payment.id, allocation));
        }
        state
            .bank_accounts
            .entry(payment.bank_account)
            .or_insert_with(|| BankAccount::new(payment.bank_account))
            .credit(payment.amount);
        state
            .payments
            .insert(payment.id, PaymentRecord { payment, remainder });

        Ok(())
    }

    async fn payment(&self, payment_id: u32) -> Result<Option<PaymentRecord>> {
        let state = self.state.read().await;
        Ok(state.payments.get(&payment_id).cloned())
    }

    async fn allocations_for_due(&self, due_id: u32) -> Result<Vec<(u32, Allocation)>> {
        let state = self.state.read().await;
        Ok(state.allocations.get(&due_id).cloned().unwrap_or_default())
    }

    async fn bank_accounts(&self) -> Result<Vec<BankAccount>> {
        let state = self.state.read().await;
        Ok(state.bank_accounts.values().cloned().collect())
    }
}

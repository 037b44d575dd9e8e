use super::allocation::Allocation;
use super::due::Due;
use super::payment::{BankAccount, PaymentRecord, Settlement};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait DueStore: Send + Sync {
    async fn store(&self, due: Due) -> Result<()>;
    /// Stores a new due, failing with `Duplicate` if the id is taken.
    async fn insert(&self, due: Due) -> Result<()>;
    /// Marks a stored due cancelled in place and returns it.
    async fn cancel(&self, due_id: u32) -> Result<Due>;
    async fn get(&self, due_id: u32) -> Result<Option<Due>>;
    /// All dues of one member, in no particular order.
    async fn for_member(&self, member: u32) -> Result<Vec<Due>>;
    async fn all(&self) -> Result<Vec<Due>>;
}

#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Applies the allocations to the currently stored dues and persists them with
    /// the payment and the bank credit, atomically.
    ///
    /// Fails with `Conflict`, leaving everything untouched, if a due was cancelled
    /// or no longer has room for its allocation.
    async fn commit(&self, settlement: Settlement) -> Result<()>;
    async fn payment(&self, payment_id: u32) -> Result<Option<PaymentRecord>>;
    async fn allocations_for_due(&self, due_id: u32) -> Result<Vec<(u32, Allocation)>>;
    async fn bank_accounts(&self) -> Result<Vec<BankAccount>>;
}

pub type DueStoreBox = Box<dyn DueStore>;
pub type SettlementStoreBox = Box<dyn SettlementStore>;

pub type DueStoreFactory = Box<dyn Fn() -> DueStoreBox + Send + Sync>;
pub type SettlementStoreFactory = Box<dyn Fn() -> SettlementStoreBox + Send + Sync>;

use crate::domain::allocation::Allocation;
use crate::domain::due::Due;
use crate::domain::payment::{BankAccount, PaymentRecord, Settlement};
use crate::domain::ports::{DueStore, SettlementStore};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing dues.
pub const CF_DUES: &str = "dues";
/// Column Family for storing payments.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for storing allocations, keyed by due id then payment id.
pub const CF_ALLOCATIONS: &str = "allocations";
/// Column Family for storing bank account balances.
pub const CF_BANK_ACCOUNTS: &str = "bank_accounts";

/// A persistent ledger store using RocksDB.
///
/// Each entity lives in its own Column Family, serialized as JSON. Settlements are
/// written with a single `WriteBatch`, so they land atomically.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    // Serializes every write, so a commit sees dues and balances no other writer is changing.
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_DUES, CF_PAYMENTS, CF_ALLOCATIONS, CF_BANK_ACCOUNTS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            LedgerError::InternalError(Box::new(std::io::Error::other(format!(
                "{} column family not found",
                name
            ))))
        })
    }

    fn read<T: DeserializeOwned>(&self, name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, name: &str, prefix: Option<&[u8]>) -> Result<Vec<T>> {
        let cf = self.cf(name)?;
        let mode = match prefix {
            Some(p) => IteratorMode::From(p, rocksdb::Direction::Forward),
            None => IteratorMode::Start,
        };

        let mut items = Vec::new();
        for item in self.db.iterator_cf(cf, mode) {
            let (key, value) = item?;
            if let Some(p) = prefix
                && !key.starts_with(p)
            {
                break;
            }
            items.push(serde_json::from_slice(&value)?);
        }
        Ok(items)
    }

    fn put<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        name: &str,
        key: &[u8],
        value: &T,
    ) -> Result<()> {
        let cf = self.cf(name)?;
        batch.put_cf(cf, key, serde_json::to_vec(value)?);
        Ok(())
    }

    fn write_due(&self, due: &Due) -> Result<()> {
        let cf = self.cf(CF_DUES)?;
        self.db.put_cf(cf, due.id.to_be_bytes(), serde_json::to_vec(due)?)?;
        Ok(())
    }
}

fn allocation_key(due_id: u32, payment_id: u32) -> [u8; 8] {
    let mut key = [0u8; 8];
    key[..4].copy_from_slice(&due_id.to_be_bytes());
    key[4..].copy_from_slice(&payment_id.to_be_bytes());
    key
}

#[async_trait]
impl DueStore for RocksDBStore {
    async fn store(&self, due: Due) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        self.write_due(&due)
    }

    async fn insert(&self, due: Due) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        if self.read::<Due>(CF_DUES, &due.id.to_be_bytes())?.is_some() {
            return Err(LedgerError::Duplicate(format!("Due {} already exists", due.id)));
        }
        self.write_due(&due)
    }

    async fn cancel(&self, due_id: u32) -> Result<Due> {
        let _guard = self.commit_lock.lock().await;
        let mut due: Due = self
            .read(CF_DUES, &due_id.to_be_bytes())?
            .ok_or_else(|| LedgerError::NotFound(format!("Due {}", due_id)))?;
        due.cancel();
        self.write_due(&due)?;
        Ok(due)
    }

    async fn get(&self, due_id: u32) -> Result<Option<Due>> {
        self.read(CF_DUES, &due_id.to_be_bytes())
    }

    async fn for_member(&self, member: u32) -> Result<Vec<Due>> {
        let dues: Vec<Due> = self.scan(CF_DUES, None)?;
        Ok(dues.into_iter().filter(|d| d.member == member).collect())
    }

    async fn all(&self) -> Result<Vec<Due>> {
        self.scan(CF_DUES, None)
    }
}

#[async_trait]
impl SettlementStore for RocksDBStore {
    async fn commit(&self, settlement: Settlement) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        let payment = &settlement.payment;

        if self
            .read::<PaymentRecord>(CF_PAYMENTS, &payment.id.to_be_bytes())?
            .is_some()
        {
            return Err(LedgerError::Duplicate(format!(
                "Payment {} already recorded",
                payment.id
            )));
        }

        let updated = settlement.apply_to(|id| self.read(CF_DUES, &id.to_be_bytes()))?;

        let mut batch = WriteBatch::default();
        for due in &updated {
            self.put(&mut batch, CF_DUES, &due.id.to_be_bytes(), due)?;
        }
        for allocation in &settlement.allocations {
            let key = allocation_key(allocation.due, payment.id);
            self.put(&mut batch, CF_ALLOCATIONS, &key, &(payment.id, allocation))?;
        }

        let account_key = payment.bank_account.to_be_bytes();
        let mut account = self
            .read::<BankAccount>(CF_BANK_ACCOUNTS, &account_key)?
            .unwrap_or_else(|| BankAccount::new(payment.bank_account));
        account.credit(payment.amount);
        self.put(&mut batch, CF_BANK_ACCOUNTS, &account_key, &account)?;
        let record = PaymentRecord {
            payment: payment.clone(),
            remainder: settlement.remainder,
        };
        self.put(&mut batch, CF_PAYMENTS, &payment.id.to_be_bytes(), &record)?;

        self.db.write(batch)?;
        Ok(())
    }

    async fn payment(&self, payment_id: u32) -> Result<Option<PaymentRecord>> {
        self.read(CF_PAYMENTS, &payment_id.to_be_bytes())
    }

    async fn allocations_for_due(&self, due_id: u32) -> Result<Vec<(u32, Allocation)>> {
        self.scan(CF_ALLOCATIONS, Some(&due_id.to_be_bytes()))
    }

    async fn bank_accounts(&self) -> Result<Vec<BankAccount>> {
        self.scan(CF_BANK_ACCOUNTS, None)
    }
}

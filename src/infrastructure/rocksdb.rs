use crate::domain::account::{Account, AccountNumber, Amount, Balance, OwnerId};
use crate::domain::pagination::{Page, PageRequest, page_total};
use crate::domain::ports::{AccountDirectory, Ledger, UnitOfWork, UnitOfWorkBox, UnitOfWorkFactory};
use crate::domain::transaction::{LedgerFilter, Transaction};
use crate::error::{BankError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

/// Column Family for storing accounts, keyed by account number.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family mapping owner identities to account numbers.
pub const CF_OWNERS: &str = "owners";
/// Column Family for the transaction ledger, keyed by a big-endian sequence number.
pub const CF_TRANSACTIONS: &str = "transactions";

fn column_family<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| BankError::StorageError(format!("{name} column family not found")))
}

fn read_account(db: &DB, number: &AccountNumber) -> Result<Option<Account>> {
    let cf = column_family(db, CF_ACCOUNTS)?;
    match db.get_cf(cf, number.as_str().as_bytes())? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// A persistent store implementation using RocksDB.
///
/// Accounts, the owner index and the ledger live in separate Column Families.
/// A unit of work is committed as a single `WriteBatch`, so balance updates and
/// their ledger entries land together or not at all.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
    next_sequence: Arc<AtomicU64>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist and resumes the ledger
    /// sequence after the last stored entry.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ACCOUNTS, CF_OWNERS, CF_TRANSACTIONS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), descriptors)?;

        let next_sequence = {
            let cf = column_family(&db, CF_TRANSACTIONS)?;
            match db.iterator_cf(cf, IteratorMode::End).next() {
                Some(item) => {
                    let (key, _) = item?;
                    let bytes: [u8; 8] = key.as_ref().try_into().map_err(|_| {
                        BankError::StorageError("Malformed ledger key".to_string())
                    })?;
                    u64::from_be_bytes(bytes) + 1
                }
                None => 0,
            }
        };

        info!(path = %path.as_ref().display(), next_sequence, "opened rocksdb store");

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
            next_sequence: Arc::new(AtomicU64::new(next_sequence)),
        })
    }

    fn scan_ledger(&self, filter: &LedgerFilter) -> Result<Vec<Transaction>> {
        let cf = column_family(&self.db, CF_TRANSACTIONS)?;
        let mut matching = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let tx: Transaction = serde_json::from_slice(&value)?;
            if filter.matches(&tx) {
                matching.push(tx);
            }
        }
        Ok(matching)
    }
}

#[async_trait]
impl AccountDirectory for RocksDBStore {
    async fn insert(&self, account: Account) -> Result<()> {
        // Serialize the uniqueness checks with every other writer
        let _writer = self.writer.lock().await;

        let owners = column_family(&self.db, CF_OWNERS)?;
        let accounts = column_family(&self.db, CF_ACCOUNTS)?;

        if self
            .db
            .get_pinned_cf(owners, account.owner.as_str().as_bytes())?
            .is_some()
        {
            return Err(BankError::AccountExists(account.owner.to_string()));
        }
        if self
            .db
            .get_pinned_cf(accounts, account.number.as_str().as_bytes())?
            .is_some()
        {
            return Err(BankError::AccountNumberTaken(account.number.to_string()));
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(
            owners,
            account.owner.as_str().as_bytes(),
            account.number.as_str().as_bytes(),
        );
        batch.put_cf(
            accounts,
            account.number.as_str().as_bytes(),
            serde_json::to_vec(&account)?,
        );
        self.db.write(&batch)?;
        Ok(())
    }

    async fn find_by_owner(&self, owner: &OwnerId) -> Result<Option<Account>> {
        let owners = column_family(&self.db, CF_OWNERS)?;
        let Some(bytes) = self.db.get_cf(owners, owner.as_str().as_bytes())? else {
            return Ok(None);
        };
        let number = String::from_utf8(bytes)
            .map_err(|e| BankError::StorageError(format!("Corrupt owner index: {e}")))?
            .parse::<AccountNumber>()?;
        read_account(&self.db, &number)
    }

    async fn find_by_number(&self, number: &AccountNumber) -> Result<Option<Account>> {
        read_account(&self.db, number)
    }

    async fn all(&self) -> Result<Vec<Account>> {
        let cf = column_family(&self.db, CF_ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            accounts.push(serde_json::from_slice(&value)?);
        }
        Ok(accounts)
    }
}

#[async_trait]
impl Ledger for RocksDBStore {
    async fn count(&self, filter: &LedgerFilter) -> Result<u64> {
        Ok(self.scan_ledger(filter)?.len() as u64)
    }

    async fn find(&self, filter: &LedgerFilter, page: PageRequest) -> Result<Vec<Transaction>> {
        Ok(self
            .scan_ledger(filter)?
            .into_iter()
            .skip(page.skip as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn find_page(
        &self,
        filter: &LedgerFilter,
        page: PageRequest,
    ) -> Result<Page<Transaction>> {
        // A single iterator pass reads from one implicit snapshot
        let matching = self.scan_ledger(filter)?;
        Ok(Page {
            page_total: page_total(matching.len() as u64, page.limit),
            items: matching
                .into_iter()
                .skip(page.skip as usize)
                .take(page.limit as usize)
                .collect(),
        })
    }
}

#[async_trait]
impl UnitOfWorkFactory for RocksDBStore {
    async fn begin(&self) -> Result<UnitOfWorkBox> {
        let guard = self.writer.clone().lock_owned().await;
        Ok(Box::new(RocksDBUnitOfWork {
            db: self.db.clone(),
            next_sequence: self.next_sequence.clone(),
            accounts: HashMap::new(),
            entries: Vec::new(),
            _writer: guard,
        }))
    }
}

/// Staged mutations of one unit of work, flushed as a single `WriteBatch`.
pub struct RocksDBUnitOfWork {
    db: Arc<DB>,
    next_sequence: Arc<AtomicU64>,
    accounts: HashMap<AccountNumber, Account>,
    entries: Vec<Transaction>,
    _writer: OwnedMutexGuard<()>,
}

impl RocksDBUnitOfWork {
    fn staged_account(&mut self, number: &AccountNumber) -> Result<&mut Account> {
        if !self.accounts.contains_key(number) {
            let account = read_account(&self.db, number)?
                .ok_or_else(|| BankError::AccountNotFound(number.to_string()))?;
            self.accounts.insert(number.clone(), account);
        }
        self.accounts
            .get_mut(number)
            .ok_or_else(|| BankError::AccountNotFound(number.to_string()))
    }
}

#[async_trait]
impl UnitOfWork for RocksDBUnitOfWork {
    async fn credit(&mut self, number: &AccountNumber, amount: Amount) -> Result<Balance> {
        let account = self.staged_account(number)?;
        account.balance = account.balance.checked_add(amount)?;
        Ok(account.balance)
    }

    async fn debit(&mut self, number: &AccountNumber, amount: Amount) -> Result<Balance> {
        let account = self.staged_account(number)?;
        let balance = account.balance.checked_sub(amount)?;
        if balance.is_negative() {
            return Err(BankError::Conflict(number.to_string()));
        }
        account.balance = balance;
        Ok(balance)
    }

    async fn record(&mut self, entry: Transaction) -> Result<()> {
        self.entries.push(entry);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let accounts_cf = column_family(&self.db, CF_ACCOUNTS)?;
        let ledger_cf = column_family(&self.db, CF_TRANSACTIONS)?;

        let mut batch = WriteBatch::default();
        for account in self.accounts.values() {
            batch.put_cf(
                accounts_cf,
                account.number.as_str().as_bytes(),
                serde_json::to_vec(account)?,
            );
        }
        for entry in &self.entries {
            let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
            batch.put_cf(ledger_cf, sequence.to_be_bytes(), serde_json::to_vec(entry)?);
        }
        self.db.write(&batch)?;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        debug!(
            staged_accounts = self.accounts.len(),
            staged_entries = self.entries.len(),
            "discarding unit of work"
        );
        Ok(())
    }
}

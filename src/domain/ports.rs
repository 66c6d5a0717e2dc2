use super::account::{Account, AccountNumber, Amount, Balance, OwnerId};
use super::pagination::{Page, PageRequest};
use super::transaction::{LedgerFilter, Transaction};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Account records keyed by owner identity and by account number.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Persists a new account.
    ///
    /// Fails with `AccountExists` if the owner already has an account and with
    /// `AccountNumberTaken` if the number is in use. Both checks happen atomically
    /// with the insert.
    async fn insert(&self, account: Account) -> Result<()>;
    async fn find_by_owner(&self, owner: &OwnerId) -> Result<Option<Account>>;
    async fn find_by_number(&self, number: &AccountNumber) -> Result<Option<Account>>;
    /// All accounts, ordered by account number.
    async fn all(&self) -> Result<Vec<Account>>;
}

/// Read side of the append-only transaction log. Entries are written only
/// through a [`UnitOfWork`].
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn count(&self, filter: &LedgerFilter) -> Result<u64>;
    /// Matching entries in insertion order, windowed by `page`.
    async fn find(&self, filter: &LedgerFilter, page: PageRequest) -> Result<Vec<Transaction>>;
    /// One page of matching entries together with its page total, both taken
    /// from the same view of the ledger.
    async fn find_page(
        &self,
        filter: &LedgerFilter,
        page: PageRequest,
    ) -> Result<Page<Transaction>>;
}

/// An atomic group of balance mutations and ledger writes.
///
/// Nothing staged in a unit of work is visible to readers before `commit`.
/// Dropping a unit of work without committing aborts it.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Atomically adds `amount` to the balance and returns the new balance.
    async fn credit(&mut self, number: &AccountNumber, amount: Amount) -> Result<Balance>;
    /// Atomically subtracts `amount` and returns the new balance.
    ///
    /// Fails with `Conflict` when the balance no longer covers the amount.
    async fn debit(&mut self, number: &AccountNumber, amount: Amount) -> Result<Balance>;
    async fn record(&mut self, entry: Transaction) -> Result<()>;
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn abort(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> Result<UnitOfWorkBox>;
}

pub type AccountDirectoryRef = Arc<dyn AccountDirectory>;
pub type LedgerRef = Arc<dyn Ledger>;
pub type UnitOfWorkBox = Box<dyn UnitOfWork>;
pub type UnitOfWorkFactoryRef = Arc<dyn UnitOfWorkFactory>;

/// The storage ports the application layer is wired with.
#[derive(Clone)]
pub struct Ports {
    pub accounts: AccountDirectoryRef,
    pub ledger: LedgerRef,
    pub units: UnitOfWorkFactoryRef,
}

impl Ports {
    /// Wires all three ports to one backend sharing its state.
    pub fn from_store<S>(store: S) -> Self
    where
        S: AccountDirectory + Ledger + UnitOfWorkFactory + Clone + 'static,
    {
        Self {
            accounts: Arc::new(store.clone()),
            ledger: Arc::new(store.clone()),
            units: Arc::new(store),
        }
    }
}

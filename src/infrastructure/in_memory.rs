use crate::domain::account::{Account, AccountNumber, Amount, Balance, OwnerId};
use crate::domain::pagination::{Page, PageRequest, page_total};
use crate::domain::ports::{AccountDirectory, Ledger, UnitOfWork, UnitOfWorkBox, UnitOfWorkFactory};
use crate::domain::transaction::{LedgerFilter, Transaction};
use crate::error::{BankError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

#[derive(Default)]
struct State {
    accounts: BTreeMap<AccountNumber, Account>,
    owners: HashMap<OwnerId, AccountNumber>,
    transactions: Vec<Transaction>,
}

/// A thread-safe in-memory store for accounts and the transaction ledger.
///
/// Committed state lives behind an `RwLock`. Units of work additionally hold the
/// `writer` mutex from `begin` until commit or abort, so balance mutations are
/// serialized while readers only ever see committed state.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    writer: Arc<Mutex<()>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountDirectory for InMemoryStore {
    async fn insert(&self, account: Account) -> Result<()> {
        let mut state = self.state.write().await;
        if state.owners.contains_key(&account.owner) {
            return Err(BankError::AccountExists(account.owner.to_string()));
        }
        if state.accounts.contains_key(&account.number) {
            return Err(BankError::AccountNumberTaken(account.number.to_string()));
        }
        state
            .owners
            .insert(account.owner.clone(), account.number.clone());
        state.accounts.insert(account.number.clone(), account);
        Ok(())
    }

    async fn find_by_owner(&self, owner: &OwnerId) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .owners
            .get(owner)
            .and_then(|number| state.accounts.get(number))
            .cloned())
    }

    async fn find_by_number(&self, number: &AccountNumber) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(number).cloned())
    }

    async fn all(&self) -> Result<Vec<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.values().cloned().collect())
    }
}

#[async_trait]
impl Ledger for InMemoryStore {
    async fn count(&self, filter: &LedgerFilter) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| filter.matches(tx))
            .count() as u64)
    }

    async fn find(&self, filter: &LedgerFilter, page: PageRequest) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| filter.matches(tx))
            .skip(page.skip as usize)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn find_page(
        &self,
        filter: &LedgerFilter,
        page: PageRequest,
    ) -> Result<Page<Transaction>> {
        let state = self.state.read().await;
        let matching: Vec<&Transaction> = state
            .transactions
            .iter()
            .filter(|tx| filter.matches(tx))
            .collect();
        Ok(Page {
            page_total: page_total(matching.len() as u64, page.limit),
            items: matching
                .into_iter()
                .skip(page.skip as usize)
                .take(page.limit as usize)
                .cloned()
                .collect(),
        })
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryStore {
    async fn begin(&self) -> Result<UnitOfWorkBox> {
        let guard = self.writer.clone().lock_owned().await;
        Ok(Box::new(InMemoryUnitOfWork {
            state: self.state.clone(),
            balances: HashMap::new(),
            entries: Vec::new(),
            _writer: guard,
        }))
    }
}

/// Staged mutations of one unit of work against an [`InMemoryStore`].
pub struct InMemoryUnitOfWork {
    state: Arc<RwLock<State>>,
    balances: HashMap<AccountNumber, Balance>,
    entries: Vec<Transaction>,
    _writer: OwnedMutexGuard<()>,
}

impl InMemoryUnitOfWork {
    async fn current_balance(&self, number: &AccountNumber) -> Result<Balance> {
        if let Some(balance) = self.balances.get(number) {
            return Ok(*balance);
        }
        let state = self.state.read().await;
        state
            .accounts
            .get(number)
            .map(|account| account.balance)
            .ok_or_else(|| BankError::AccountNotFound(number.to_string()))
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn credit(&mut self, number: &AccountNumber, amount: Amount) -> Result<Balance> {
        let balance = self.current_balance(number).await?.checked_add(amount)?;
        self.balances.insert(number.clone(), balance);
        Ok(balance)
    }

    async fn debit(&mut self, number: &AccountNumber, amount: Amount) -> Result<Balance> {
        let balance = self.current_balance(number).await?.checked_sub(amount)?;
        if balance.is_negative() {
            return Err(BankError::Conflict(number.to_string()));
        }
        self.balances.insert(number.clone(), balance);
        Ok(balance)
    }

    async fn record(&mut self, entry: Transaction) -> Result<()> {
        self.entries.push(entry);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        let mut state = this.state.write().await;
        // Nothing is applied unless every staged account still exists
        if let Some(missing) = this
            .balances
            .keys()
            .find(|number| !state.accounts.contains_key(*number))
        {
            return Err(BankError::AccountNotFound(missing.to_string()));
        }
        for (number, balance) in this.balances {
            if let Some(account) = state.accounts.get_mut(&number) {
                account.balance = balance;
            }
        }
        state.transactions.extend(this.entries);
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        debug!(
            staged_balances = self.balances.len(),
            staged_entries = self.entries.len(),
            "discarding unit of work"
        );
        Ok(())
    }
}

use crate::config::BankConfig;
use crate::domain::account::{Account, AccountNumber, OwnerId};
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::ports::{AccountDirectoryRef, LedgerRef};
use crate::domain::transaction::{LedgerFilter, Transaction, TransactionKind};
use crate::error::{BankError, Result};
use tracing::{info, warn};

/// Account creation, account lookup and transaction history listings.
pub struct AccountService {
    accounts: AccountDirectoryRef,
    ledger: LedgerRef,
    account_number_attempts: u32,
    default_page_size: u64,
}

impl AccountService {
    pub fn new(accounts: AccountDirectoryRef, ledger: LedgerRef, config: &BankConfig) -> Self {
        Self {
            accounts,
            ledger,
            account_number_attempts: config.account_number_attempts.max(1),
            default_page_size: config.default_page_size,
        }
    }

    /// Opens the single account an owner may hold.
    ///
    /// A freshly drawn account number that is already taken is replaced by a new
    /// draw, up to the configured number of attempts.
    pub async fn create_account(&self, owner: &OwnerId) -> Result<Account> {
        for attempt in 1..=self.account_number_attempts {
            let number = AccountNumber::generate(&mut rand::thread_rng());
            let account = Account::open(owner.clone(), number);
            match self.accounts.insert(account.clone()).await {
                Ok(()) => {
                    info!(%owner, number = %account.number, "account created");
                    return Ok(account);
                }
                Err(BankError::AccountNumberTaken(number)) => {
                    warn!(%number, attempt, "account number collision");
                }
                Err(e) => return Err(e),
            }
        }
        Err(BankError::StorageError(format!(
            "No free account number after {} attempts",
            self.account_number_attempts
        )))
    }

    /// The caller's own account details.
    pub async fn get_own_account(&self, owner: &OwnerId) -> Result<Account> {
        self.accounts
            .find_by_owner(owner)
            .await?
            .ok_or_else(|| BankError::AccountNotFound(owner.to_string()))
    }

    pub async fn find_by_number(&self, number: &AccountNumber) -> Result<Account> {
        self.accounts
            .find_by_number(number)
            .await?
            .ok_or_else(|| BankError::AccountNotFound(number.to_string()))
    }

    pub async fn all_accounts(&self) -> Result<Vec<Account>> {
        self.accounts.all().await
    }

    /// First page using the configured page size.
    pub fn default_page(&self) -> Result<PageRequest> {
        PageRequest::new(0, self.default_page_size)
    }

    /// Entries of the caller's account, optionally narrowed to one kind.
    pub async fn list_transactions(
        &self,
        owner: &OwnerId,
        kind: Option<TransactionKind>,
        page: PageRequest,
    ) -> Result<Page<Transaction>> {
        let account = self.get_own_account(owner).await?;
        let filter = LedgerFilter::new(account.number, kind);

        self.ledger.find_page(&filter, page).await
    }

    pub async fn list_deposits(
        &self,
        owner: &OwnerId,
        page: PageRequest,
    ) -> Result<Page<Transaction>> {
        self.list_transactions(owner, Some(TransactionKind::Deposit), page)
            .await
    }

    pub async fn list_withdrawals(
        &self,
        owner: &OwnerId,
        page: PageRequest,
    ) -> Result<Page<Transaction>> {
        self.list_transactions(owner, Some(TransactionKind::Withdrawal), page)
            .await
    }

    /// Transfers the caller sent or received.
    pub async fn list_transfers(
        &self,
        owner: &OwnerId,
        page: PageRequest,
    ) -> Result<Page<Transaction>> {
        self.list_transactions(owner, Some(TransactionKind::Transfer), page)
            .await
    }
}

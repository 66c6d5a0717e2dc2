use crate::config::BankConfig;
use crate::domain::account::{Account, AccountNumber, Amount, Balance, OwnerId};
use crate::domain::ports::{AccountDirectoryRef, UnitOfWorkBox, UnitOfWorkFactoryRef};
use crate::domain::transaction::Transaction;
use crate::error::{BankError, Result};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use tracing::{debug, info, warn};

/// Lifecycle of a single funds movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Started,
    Validated,
    Applied,
    Committed,
    Aborted,
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationState::Started => "started",
            OperationState::Validated => "validated",
            OperationState::Applied => "applied",
            OperationState::Committed => "committed",
            OperationState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Outcome of a committed deposit, withdrawal or transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub message: String,
    /// Balance of the caller's account right after the commit.
    pub resulting_balance: Balance,
}

/// The funds movement engine.
///
/// `FundsEngine` validates each operation against the account directory, then
/// applies every balance change and the matching ledger entry inside one unit of
/// work. A unit of work is either committed as a whole or aborted as a whole.
pub struct FundsEngine {
    accounts: AccountDirectoryRef,
    units: UnitOfWorkFactoryRef,
    max_conflict_retries: u32,
}

impl FundsEngine {
    /// Creates a new `FundsEngine`.
    ///
    /// # Arguments
    ///
    /// * `accounts` - The directory used to resolve callers and receivers.
    /// * `units` - The store that opens units of work.
    /// * `config` - Supplies the conflict retry budget.
    pub fn new(
        accounts: AccountDirectoryRef,
        units: UnitOfWorkFactoryRef,
        config: &BankConfig,
    ) -> Self {
        Self {
            accounts,
            units,
            max_conflict_retries: config.max_conflict_retries,
        }
    }

    /// Deposits `amount` into the caller's own account.
    pub async fn deposit(&self, owner: &OwnerId, amount: Amount) -> Result<Receipt> {
        self.with_retry("deposit", || self.try_deposit(owner, amount))
            .await
    }

    /// Withdraws `amount` from the caller's own account.
    pub async fn withdraw(&self, owner: &OwnerId, amount: Amount) -> Result<Receipt> {
        self.with_retry("withdraw", || self.try_withdraw(owner, amount))
            .await
    }

    /// Moves `amount` from the caller's account to the account numbered `target`.
    pub async fn transfer(
        &self,
        owner: &OwnerId,
        amount: Amount,
        target: &AccountNumber,
    ) -> Result<Receipt> {
        self.with_retry("transfer", || self.try_transfer(owner, amount, target))
            .await
    }

    /// Re-runs the whole operation when the store reports a conflicting update.
    async fn with_retry<F, Fut>(&self, op: &'static str, mut attempt_op: F) -> Result<Receipt>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Receipt>>,
    {
        let mut retries = 0;
        loop {
            match attempt_op().await {
                Err(BankError::Conflict(number)) if retries < self.max_conflict_retries => {
                    retries += 1;
                    warn!(op, account = %number, retries, "conflicting update, retrying");
                }
                other => return other,
            }
        }
    }

    async fn try_deposit(&self, owner: &OwnerId, amount: Amount) -> Result<Receipt> {
        debug!(op = "deposit", %owner, %amount, state = %OperationState::Started);
        let account = self.owned_account(owner).await?;
        debug!(op = "deposit", account = %account.number, state = %OperationState::Validated);

        let mut unit = self.units.begin().await?;
        let applied = async {
            let balance = unit.credit(&account.number, amount).await?;
            unit.record(Transaction::deposit(account.number.clone(), amount))
                .await?;
            Ok::<_, BankError>(balance)
        }
        .await;
        let balance = self.finish("deposit", unit, applied).await?;

        info!(account = %account.number, %amount, %balance, "deposit committed");
        Ok(Receipt {
            message: format!("{amount} deposited successfully. New balance is {balance}"),
            resulting_balance: balance,
        })
    }

    async fn try_withdraw(&self, owner: &OwnerId, amount: Amount) -> Result<Receipt> {
        debug!(op = "withdraw", %owner, %amount, state = %OperationState::Started);
        let account = self.owned_account(owner).await?;
        if !account.balance.covers(amount) {
            debug!(op = "withdraw", account = %account.number, state = %OperationState::Aborted);
            return Err(BankError::InsufficientBalance);
        }
        debug!(op = "withdraw", account = %account.number, state = %OperationState::Validated);

        let mut unit = self.units.begin().await?;
        let applied = async {
            let balance = unit.debit(&account.number, amount).await?;
            unit.record(Transaction::withdrawal(account.number.clone(), amount))
                .await?;
            Ok::<_, BankError>(balance)
        }
        .await;
        let balance = self.finish("withdraw", unit, applied).await?;

        info!(account = %account.number, %amount, %balance, "withdrawal committed");
        Ok(Receipt {
            message: format!("{amount} withdrawn. Balance is {balance}"),
            resulting_balance: balance,
        })
    }

    async fn try_transfer(
        &self,
        owner: &OwnerId,
        amount: Amount,
        target: &AccountNumber,
    ) -> Result<Receipt> {
        debug!(op = "transfer", %owner, %amount, %target, state = %OperationState::Started);
        let sender = self.owned_account(owner).await?;
        let receiver = self
            .accounts
            .find_by_number(target)
            .await?
            .ok_or_else(|| BankError::ReceiverNotFound(target.to_string()))?;
        if sender.number == receiver.number {
            return Err(BankError::SelfTransfer);
        }
        if !sender.balance.covers(amount) {
            debug!(op = "transfer", account = %sender.number, state = %OperationState::Aborted);
            return Err(BankError::InsufficientBalance);
        }
        let entry = Transaction::transfer(sender.number.clone(), receiver.number.clone(), amount)?;
        debug!(op = "transfer", sender = %sender.number, receiver = %receiver.number, state = %OperationState::Validated);

        let mut unit = self.units.begin().await?;
        let applied = async {
            let balance = unit.debit(&sender.number, amount).await?;
            unit.credit(&receiver.number, amount).await?;
            unit.record(entry).await?;
            Ok::<_, BankError>(balance)
        }
        .await;
        let balance = self.finish("transfer", unit, applied).await?;

        info!(
            sender = %sender.number,
            receiver = %receiver.number,
            %amount,
            "transfer committed"
        );
        Ok(Receipt {
            message: format!("Transfer successful. Current balance is {balance}"),
            resulting_balance: balance,
        })
    }

    async fn owned_account(&self, owner: &OwnerId) -> Result<Account> {
        self.accounts
            .find_by_owner(owner)
            .await?
            .ok_or_else(|| BankError::AccountNotFound(owner.to_string()))
    }

    /// Commits the unit of work if every step applied, aborts it otherwise.
    async fn finish(
        &self,
        op: &'static str,
        unit: UnitOfWorkBox,
        applied: Result<Balance>,
    ) -> Result<Balance> {
        match applied {
            Ok(balance) => {
                debug!(op, state = %OperationState::Applied);
                if let Err(e) = unit.commit().await {
                    warn!(op, error = %e, state = %OperationState::Aborted, "commit failed");
                    return Err(e);
                }
                debug!(op, state = %OperationState::Committed);
                Ok(balance)
            }
            Err(e) => {
                if let Err(abort_error) = unit.abort().await {
                    warn!(op, error = %abort_error, "abort failed");
                }
                debug!(op, error = %e, state = %OperationState::Aborted);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{AccountDirectory, Ports};
    use crate::domain::transaction::LedgerFilter;
    use crate::infrastructure::in_memory::InMemoryStore;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn owner(s: &str) -> OwnerId {
        OwnerId::new(s).unwrap()
    }

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    async fn setup(accounts: &[(&str, &str)]) -> (FundsEngine, Ports) {
        let ports = Ports::from_store(InMemoryStore::new());
        for (who, number) in accounts {
            ports
                .accounts
                .insert(Account::open(owner(who), number.parse().unwrap()))
                .await
                .unwrap();
        }
        let engine = FundsEngine::new(
            ports.accounts.clone(),
            ports.units.clone(),
            &BankConfig::default(),
        );
        (engine, ports)
    }

    async fn balance_of(ports: &Ports, who: &str) -> Balance {
        ports
            .accounts
            .find_by_owner(&owner(who))
            .await
            .unwrap()
            .unwrap()
            .balance
    }

    #[tokio::test]
    async fn test_deposit_reports_new_balance() {
        let (engine, ports) = setup(&[("alice@x.com", "1111111111")]).await;

        let receipt = engine
            .deposit(&owner("alice@x.com"), amount(dec!(500)))
            .await
            .unwrap();
        assert_eq!(receipt.resulting_balance, Balance::new(dec!(500)));
        assert_eq!(
            receipt.message,
            "500 deposited successfully. New balance is 500"
        );

        let receipt = engine
            .deposit(&owner("alice@x.com"), amount(dec!(0.25)))
            .await
            .unwrap();
        assert_eq!(receipt.resulting_balance, Balance::new(dec!(500.25)));
        assert_eq!(balance_of(&ports, "alice@x.com").await, Balance::new(dec!(500.25)));
    }

    #[tokio::test]
    async fn test_deposit_unknown_owner() {
        let (engine, _) = setup(&[]).await;
        let result = engine.deposit(&owner("ghost@x.com"), amount(dec!(1))).await;
        assert!(matches!(result, Err(BankError::AccountNotFound(_))));
    }

    #[tokio::test]
    async fn test_withdraw_insufficient_balance_leaves_account_untouched() {
        let (engine, ports) = setup(&[("alice@x.com", "1111111111")]).await;
        engine
            .deposit(&owner("alice@x.com"), amount(dec!(500)))
            .await
            .unwrap();

        let result = engine
            .withdraw(&owner("alice@x.com"), amount(dec!(600)))
            .await;
        assert!(matches!(result, Err(BankError::InsufficientBalance)));
        assert_eq!(balance_of(&ports, "alice@x.com").await, Balance::new(dec!(500)));

        let receipt = engine
            .withdraw(&owner("alice@x.com"), amount(dec!(500)))
            .await
            .unwrap();
        assert_eq!(receipt.resulting_balance, Balance::ZERO);
        assert_eq!(receipt.message, "500 withdrawn. Balance is 0");
    }

    #[tokio::test]
    async fn test_transfer_moves_funds_between_accounts() {
        let (engine, ports) =
            setup(&[("alice@x.com", "1111111111"), ("bob@x.com", "2222222222")]).await;
        engine
            .deposit(&owner("alice@x.com"), amount(dec!(500)))
            .await
            .unwrap();

        let receipt = engine
            .transfer(
                &owner("alice@x.com"),
                amount(dec!(200)),
                &"2222222222".parse().unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(receipt.resulting_balance, Balance::new(dec!(300)));
        assert_eq!(receipt.message, "Transfer successful. Current balance is 300");
        assert_eq!(balance_of(&ports, "alice@x.com").await, Balance::new(dec!(300)));
        assert_eq!(balance_of(&ports, "bob@x.com").await, Balance::new(dec!(200)));
    }

    #[tokio::test]
    async fn test_transfer_rejections() {
        let (engine, ports) =
            setup(&[("alice@x.com", "1111111111"), ("bob@x.com", "2222222222")]).await;
        engine
            .deposit(&owner("alice@x.com"), amount(dec!(100)))
            .await
            .unwrap();

        let missing = engine
            .transfer(
                &owner("alice@x.com"),
                amount(dec!(10)),
                &"9999999999".parse().unwrap(),
            )
            .await;
        assert!(matches!(missing, Err(BankError::ReceiverNotFound(_))));

        let to_self = engine
            .transfer(
                &owner("alice@x.com"),
                amount(dec!(10)),
                &"1111111111".parse().unwrap(),
            )
            .await;
        assert!(matches!(to_self, Err(BankError::SelfTransfer)));

        let too_much = engine
            .transfer(
                &owner("alice@x.com"),
                amount(dec!(100.01)),
                &"2222222222".parse().unwrap(),
            )
            .await;
        assert!(matches!(too_much, Err(BankError::InsufficientBalance)));

        let no_sender = engine
            .transfer(
                &owner("carol@x.com"),
                amount(dec!(1)),
                &"2222222222".parse().unwrap(),
            )
            .await;
        assert!(matches!(no_sender, Err(BankError::AccountNotFound(_))));

        assert_eq!(balance_of(&ports, "alice@x.com").await, Balance::new(dec!(100)));
        assert_eq!(balance_of(&ports, "bob@x.com").await, Balance::ZERO);
    }

    #[tokio::test]
    async fn test_deposit_overflow_aborts_cleanly() {
        let (engine, ports) = setup(&[("alice@x.com", "1111111111")]).await;
        let max = amount(Decimal::MAX);

        engine.deposit(&owner("alice@x.com"), max).await.unwrap();
        let result = engine.deposit(&owner("alice@x.com"), max).await;
        assert!(matches!(result, Err(BankError::BalanceOverflow(_))));

        assert_eq!(
            balance_of(&ports, "alice@x.com").await,
            Balance::new(Decimal::MAX)
        );
        let filter = LedgerFilter::new("1111111111".parse().unwrap(), None);
        assert_eq!(ports.ledger.count(&filter).await.unwrap(), 1);

        // The writer lock was released, so later operations still go through
        let receipt = engine
            .withdraw(&owner("alice@x.com"), amount(dec!(1)))
            .await
            .unwrap();
        assert_eq!(receipt.resulting_balance, Balance::new(Decimal::MAX - dec!(1)));
    }

    #[tokio::test]
    async fn test_transfer_overflow_leaves_both_sides_untouched() {
        let (engine, ports) =
            setup(&[("alice@x.com", "1111111111"), ("bob@x.com", "2222222222")]).await;
        engine
            .deposit(&owner("alice@x.com"), amount(dec!(10)))
            .await
            .unwrap();
        engine
            .deposit(&owner("bob@x.com"), amount(Decimal::MAX))
            .await
            .unwrap();

        let result = engine
            .transfer(
                &owner("alice@x.com"),
                amount(dec!(10)),
                &"2222222222".parse().unwrap(),
            )
            .await;
        assert!(matches!(result, Err(BankError::BalanceOverflow(_))));
        assert_eq!(balance_of(&ports, "alice@x.com").await, Balance::new(dec!(10)));
        assert_eq!(
            balance_of(&ports, "bob@x.com").await,
            Balance::new(Decimal::MAX)
        );
    }

    #[test]
    fn test_operation_state_display() {
        assert_eq!(OperationState::Committed.to_string(), "committed");
        assert_eq!(OperationState::Aborted.to_string(), "aborted");
    }
}

use super::account::{AccountNumber, Amount};
use crate::error::{BankError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Transfer => "transfer",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = BankError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deposit" | "deposits" => Ok(TransactionKind::Deposit),
            "withdrawal" | "withdrawals" => Ok(TransactionKind::Withdrawal),
            "transfer" | "transfers" => Ok(TransactionKind::Transfer),
            other => Err(BankError::ValidationError(format!(
                "Unknown transaction kind '{other}'"
            ))),
        }
    }
}

/// An immutable ledger entry documenting one committed balance mutation.
///
/// Deposits and withdrawals reference a single account. Transfers reference the
/// sender as `primary_account` and the receiver as `secondary_account`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub primary_account: AccountNumber,
    pub secondary_account: Option<AccountNumber>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    fn new(
        kind: TransactionKind,
        amount: Amount,
        primary_account: AccountNumber,
        secondary_account: Option<AccountNumber>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            amount,
            primary_account,
            secondary_account,
            created_at: Utc::now(),
        }
    }

    pub fn deposit(account: AccountNumber, amount: Amount) -> Self {
        Self::new(TransactionKind::Deposit, amount, account, None)
    }

    pub fn withdrawal(account: AccountNumber, amount: Amount) -> Self {
        Self::new(TransactionKind::Withdrawal, amount, account, None)
    }

    /// Builds a transfer entry. Sender and receiver must differ.
    pub fn transfer(sender: AccountNumber, receiver: AccountNumber, amount: Amount) -> Result<Self> {
        if sender == receiver {
            return Err(BankError::SelfTransfer);
        }
        Ok(Self::new(
            TransactionKind::Transfer,
            amount,
            sender,
            Some(receiver),
        ))
    }

    /// Whether `account` takes part in this entry, as either side.
    pub fn involves(&self, account: &AccountNumber) -> bool {
        &self.primary_account == account || self.secondary_account.as_ref() == Some(account)
    }
}

/// Selects the ledger entries of one account, optionally narrowed to a kind.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerFilter {
    pub account: AccountNumber,
    pub kind: Option<TransactionKind>,
}

impl LedgerFilter {
    pub fn new(account: AccountNumber, kind: Option<TransactionKind>) -> Self {
        Self { account, kind }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        match self.kind {
            // Transfers are listed for both the sender and the receiver
            Some(TransactionKind::Transfer) => {
                tx.kind == TransactionKind::Transfer && tx.involves(&self.account)
            }
            Some(kind) => tx.kind == kind && tx.primary_account == self.account,
            None => tx.involves(&self.account),
        }
    }
}

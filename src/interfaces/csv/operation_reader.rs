use crate::domain::account::{AccountNumber, Amount, OwnerId};
use crate::error::{BankError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Open,
    Deposit,
    Withdraw,
    Transfer,
}

/// One raw CSV row: `op, owner, amount, account`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OperationRecord {
    pub op: OperationType,
    pub owner: String,
    pub amount: Option<Decimal>,
    pub account: Option<String>,
}

/// Who receives a transfer. A ten-digit value is an account number, anything
/// else is taken as the receiver's owner identity.
#[derive(Debug, PartialEq, Clone)]
pub enum TransferTarget {
    Number(AccountNumber),
    Owner(OwnerId),
}

impl TransferTarget {
    pub fn parse(value: &str) -> Result<Self> {
        if AccountNumber::is_valid(value.trim()) {
            Ok(TransferTarget::Number(value.parse()?))
        } else {
            Ok(TransferTarget::Owner(OwnerId::new(value)?))
        }
    }
}

/// A validated banking operation ready for the engine.
#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Open {
        owner: OwnerId,
    },
    Deposit {
        owner: OwnerId,
        amount: Amount,
    },
    Withdraw {
        owner: OwnerId,
        amount: Amount,
    },
    Transfer {
        owner: OwnerId,
        amount: Amount,
        to: TransferTarget,
    },
}

impl TryFrom<OperationRecord> for Operation {
    type Error = BankError;

    fn try_from(record: OperationRecord) -> Result<Self> {
        let owner = OwnerId::new(record.owner)?;
        let amount = || -> Result<Amount> {
            record
                .amount
                .ok_or_else(|| BankError::ValidationError("Missing amount".to_string()))
                .and_then(Amount::new)
        };

        Ok(match record.op {
            OperationType::Open => Operation::Open { owner },
            OperationType::Deposit => Operation::Deposit {
                owner,
                amount: amount()?,
            },
            OperationType::Withdraw => Operation::Withdraw {
                owner,
                amount: amount()?,
            },
            OperationType::Transfer => {
                let target = record
                    .account
                    .as_deref()
                    .filter(|value| !value.trim().is_empty())
                    .ok_or_else(|| {
                        BankError::ValidationError("Missing target account".to_string())
                    })?;
                Operation::Transfer {
                    owner,
                    amount: amount()?,
                    to: TransferTarget::parse(target)?,
                }
            }
        })
    }
}

/// Reads banking operations from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Operation>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    /// Creates a new `OperationReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads, deserializes and validates rows.
    pub fn operations(self) -> impl Iterator<Item = Result<Operation>> {
        self.reader
            .into_deserialize::<OperationRecord>()
            .map(|result| result.map_err(BankError::from).and_then(Operation::try_from))
    }
}

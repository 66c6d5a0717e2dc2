use crate::error::{BankError, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of decimal digits in an account number.
pub const ACCOUNT_NUMBER_LEN: usize = 10;

/// Represents a monetary balance.
///
/// This is a wrapper around `rust_decimal::Decimal` so balances never go through
/// floating point. A committed balance is never negative; intermediate values
/// produced by `checked_sub` may be, which is how underflow is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// Represents a positive monetary amount for transactions.
///
/// Ensures that transaction amounts are always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(BankError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = BankError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Whether this balance can cover a withdrawal of `amount`.
    pub fn covers(&self, amount: Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Adds `amount`, failing with `BalanceOverflow` past `Decimal::MAX`.
    pub fn checked_add(self, amount: Amount) -> Result<Self> {
        self.0
            .checked_add(amount.0)
            .map(Self)
            .ok_or_else(|| BankError::BalanceOverflow(format!("{} + {}", self, amount)))
    }

    /// Subtracts `amount`. The result may be negative; callers decide whether
    /// that is allowed.
    pub fn checked_sub(self, amount: Amount) -> Result<Self> {
        self.0
            .checked_sub(amount.0)
            .map(Self)
            .ok_or_else(|| BankError::BalanceOverflow(format!("{} - {}", self, amount)))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Identity of an account owner as handed over by the authentication layer
/// (typically an email address). The core never verifies it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(BankError::ValidationError(
                "Owner identity must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OwnerId {
    type Error = BankError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<OwnerId> for String {
    fn from(owner: OwnerId) -> Self {
        owner.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unique, 10-digit numeric account number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Draws a fresh account number of random decimal digits.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let digits = (0..ACCOUNT_NUMBER_LEN)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        Self(digits)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(value: &str) -> bool {
        value.len() == ACCOUNT_NUMBER_LEN && value.bytes().all(|b| b.is_ascii_digit())
    }
}

impl FromStr for AccountNumber {
    type Err = BankError;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        if Self::is_valid(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(BankError::ValidationError(format!(
                "Account number must be {ACCOUNT_NUMBER_LEN} digits, got '{value}'"
            )))
        }
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = BankError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AccountNumber> for String {
    fn from(number: AccountNumber) -> Self {
        number.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A balance-holding account owned by a single identity.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    /// The unique account number.
    pub number: AccountNumber,
    /// The identity that owns the account.
    pub owner: OwnerId,
    /// Current balance. Only the funds engine mutates it.
    pub balance: Balance,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Opens a new account with a zero balance.
    pub fn open(owner: OwnerId, number: AccountNumber) -> Self {
        Self {
            number,
            owner,
            balance: Balance::ZERO,
            created_at: Utc::now(),
        }
    }
}

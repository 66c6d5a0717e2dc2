use thiserror::Error;

#[derive(Error, Debug)]
pub enum BankError {
    #[error("Account not found for {0}")]
    AccountNotFound(String),
    #[error("Receiver's account {0} does not exist")]
    ReceiverNotFound(String),
    #[error("Account already exists for {0}")]
    AccountExists(String),
    #[error("Account number {0} is already taken")]
    AccountNumberTaken(String),
    #[error("Insufficient balance")]
    InsufficientBalance,
    #[error("Balance overflow: {0}")]
    BalanceOverflow(String),
    #[error("Cannot transfer funds to the same account")]
    SelfTransfer,
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Concurrent update on account {0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
}

/// Coarse classification used by the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InsufficientBalance,
    Validation,
    AlreadyExists,
    Conflict,
    StorageFailure,
}

impl ErrorKind {
    /// HTTP-style status code for this kind of failure.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::InsufficientBalance | ErrorKind::Validation => 400,
            ErrorKind::AlreadyExists | ErrorKind::Conflict => 409,
            ErrorKind::StorageFailure => 500,
        }
    }
}

impl BankError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BankError::AccountNotFound(_) | BankError::ReceiverNotFound(_) => ErrorKind::NotFound,
            BankError::InsufficientBalance => ErrorKind::InsufficientBalance,
            BankError::SelfTransfer
            | BankError::ValidationError(_)
            | BankError::BalanceOverflow(_) => ErrorKind::Validation,
            BankError::AccountExists(_) | BankError::AccountNumberTaken(_) => {
                ErrorKind::AlreadyExists
            }
            BankError::Conflict(_) => ErrorKind::Conflict,
            BankError::StorageError(_)
            | BankError::CsvError(_)
            | BankError::IoError(_)
            | BankError::SerializationError(_) => ErrorKind::StorageFailure,
            #[cfg(feature = "storage-rocksdb")]
            BankError::RocksDbError(_) => ErrorKind::StorageFailure,
        }
    }

    /// Whether re-running the whole operation from scratch may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict | ErrorKind::StorageFailure)
    }
}

pub type Result<T> = std::result::Result<T, BankError>;

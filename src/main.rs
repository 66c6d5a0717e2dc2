use clap::{Parser, Subcommand};
use fundsflow::application::Bank;
use fundsflow::config::BankConfig;
use fundsflow::domain::account::OwnerId;
use fundsflow::domain::pagination::PageRequest;
use fundsflow::domain::ports::Ports;
use fundsflow::domain::transaction::TransactionKind;
use fundsflow::error::{BankError, Result as BankResult};
use fundsflow::infrastructure::in_memory::InMemoryStore;
#[cfg(feature = "storage-rocksdb")]
use fundsflow::infrastructure::rocksdb::RocksDBStore;
use fundsflow::interfaces::csv::operation_reader::{Operation, OperationReader, TransferTarget};
use fundsflow::interfaces::csv::report_writer::{AccountWriter, TransactionWriter};
use fundsflow::logging::init_logging;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// JSON configuration file (optional).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a CSV file of banking operations and print the resulting balances
    Process {
        /// Input operations CSV file (op, owner, amount, account)
        input: PathBuf,
    },
    /// Print one page of an owner's transaction history
    History {
        owner: String,

        /// Only list deposits, withdrawals or transfers
        #[arg(long)]
        kind: Option<TransactionKind>,

        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u64,

        #[arg(long)]
        page_size: Option<u64>,
    },
}

fn open_ports(db_path: Option<PathBuf>) -> Result<Ports> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok(Ports::from_store(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Ports::from_store(InMemoryStore::new()))
        }
        None => Ok(Ports::from_store(InMemoryStore::new())),
    }
}

async fn apply(bank: &Bank, operation: Operation) -> BankResult<String> {
    match operation {
        Operation::Open { owner } => {
            let account = bank.accounts.create_account(&owner).await?;
            Ok(format!("Account {} opened for {}", account.number, owner))
        }
        Operation::Deposit { owner, amount } => {
            Ok(bank.engine.deposit(&owner, amount).await?.message)
        }
        Operation::Withdraw { owner, amount } => {
            Ok(bank.engine.withdraw(&owner, amount).await?.message)
        }
        Operation::Transfer { owner, amount, to } => {
            let target = match to {
                TransferTarget::Number(number) => number,
                TransferTarget::Owner(receiver) => {
                    match bank.accounts.get_own_account(&receiver).await {
                        Ok(account) => account.number,
                        Err(BankError::AccountNotFound(_)) => {
                            return Err(BankError::ReceiverNotFound(receiver.to_string()));
                        }
                        Err(e) => return Err(e),
                    }
                }
            };
            Ok(bank.engine.transfer(&owner, amount, &target).await?.message)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BankConfig::load(path).into_diagnostic()?,
        None => BankConfig::default(),
    };
    init_logging(&config);

    let bank = Bank::new(open_ports(cli.db_path)?, &config);

    match cli.command {
        Command::Process { input } => {
            let file = File::open(input).into_diagnostic()?;
            let reader = OperationReader::new(file);
            for (row, operation) in reader.operations().enumerate() {
                match operation {
                    Ok(operation) => match apply(&bank, operation).await {
                        Ok(message) => info!(row = row + 1, "{message}"),
                        Err(e) => error!(
                            row = row + 1,
                            kind = ?e.kind(),
                            retryable = e.is_retryable(),
                            "Error processing operation: {e}"
                        ),
                    },
                    Err(e) => error!(row = row + 1, "Error reading operation: {e}"),
                }
            }

            let accounts = bank.accounts.all_accounts().await.into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = AccountWriter::new(stdout.lock());
            writer.write_accounts(&accounts).into_diagnostic()?;
        }
        Command::History {
            owner,
            kind,
            page,
            page_size,
        } => {
            let owner = OwnerId::new(owner).into_diagnostic()?;
            let request = match page_size {
                Some(size) => PageRequest::page(page, size),
                None => bank
                    .accounts
                    .default_page()
                    .and_then(|first| PageRequest::page(page, first.limit)),
            }
            .into_diagnostic()?;

            let listing = bank
                .accounts
                .list_transactions(&owner, kind, request)
                .await
                .into_diagnostic()?;

            let stdout = io::stdout();
            let mut writer = TransactionWriter::new(stdout.lock());
            writer.write_transactions(&listing.items).into_diagnostic()?;
            eprintln!("page_total={}", listing.page_total);
        }
    }

    Ok(())
}

use crate::domain::account::Account;
use crate::domain::transaction::Transaction;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct AccountRow<'a> {
    number: &'a str,
    owner: &'a str,
    balance: String,
}

#[derive(Serialize)]
struct TransactionRow<'a> {
    id: String,
    kind: &'static str,
    amount: String,
    primary_account: &'a str,
    secondary_account: &'a str,
    created_at: String,
}

/// Writes account balances as CSV: `number,owner,balance`.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(sink);
        Self { writer }
    }

    pub fn write_accounts(&mut self, accounts: &[Account]) -> Result<()> {
        self.writer.write_record(["number", "owner", "balance"])?;
        for account in accounts {
            self.writer.serialize(AccountRow {
                number: account.number.as_str(),
                owner: account.owner.as_str(),
                balance: account.balance.to_string(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes ledger entries as CSV, one row per entry.
pub struct TransactionWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TransactionWriter<W> {
    pub fn new(sink: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(sink);
        Self { writer }
    }

    pub fn write_transactions(&mut self, transactions: &[Transaction]) -> Result<()> {
        self.writer.write_record([
            "id",
            "kind",
            "amount",
            "primary_account",
            "secondary_account",
            "created_at",
        ])?;
        for tx in transactions {
            self.writer.serialize(TransactionRow {
                id: tx.id.to_string(),
                kind: tx.kind.as_str(),
                amount: tx.amount.to_string(),
                primary_account: tx.primary_account.as_str(),
                secondary_account: tx
                    .secondary_account
                    .as_ref()
                    .map(|number| number.as_str())
                    .unwrap_or(""),
                created_at: tx.created_at.to_rfc3339(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

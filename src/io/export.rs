use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::domain::{format_cents, LedgerSnapshot, LedgerStore};

/// Full ledger export with format metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub total_balance: i128,
    #[serde(flatten)]
    pub snapshot: LedgerSnapshot,
}

/// Exporter for converting ledger data to CSV and JSON
pub struct Exporter<'a> {
    store: &'a LedgerStore,
}

impl<'a> Exporter<'a> {
    pub fn new(store: &'a LedgerStore) -> Self {
        Self { store }
    }

    /// Export the transaction log to CSV, oldest first
    pub fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let snapshot = self.store.snapshot()?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "timestamp",
            "from_account",
            "to_account",
            "amount_cents",
            "amount",
            "description",
            "status",
        ])?;

        for transaction in &snapshot.transactions {
            csv_writer.write_record([
                transaction.id.to_string(),
                transaction.timestamp.to_rfc3339(),
                transaction.from_account_id.to_string(),
                transaction.to_account_id.to_string(),
                transaction.amount.to_string(),
                format_cents(transaction.amount),
                transaction.description.clone(),
                transaction.status.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(snapshot.transactions.len())
    }

    /// Export accounts with their balances to CSV
    pub fn export_accounts_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.store.list_accounts()?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "role", "status", "balance_cents", "balance"])?;

        for account in &accounts {
            csv_writer.write_record([
                account.id.to_string(),
                account.role.to_string(),
                account.status.to_string(),
                account.balance().to_string(),
                format_cents(account.balance()),
            ])?;
        }

        csv_writer.flush()?;
        Ok(accounts.len())
    }

    /// Export a consistent snapshot of the whole ledger as JSON
    pub fn export_snapshot_json<W: Write>(&self, mut writer: W) -> Result<LedgerExport> {
        let snapshot = self.store.snapshot()?;

        let export = LedgerExport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            total_balance: snapshot.total_balance(),
            snapshot,
        };

        let json = serde_json::to_string_pretty(&export)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(export)
    }
}

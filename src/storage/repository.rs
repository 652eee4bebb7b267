use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, AccountRole, AccountStatus, LedgerSnapshot, Transaction, TransactionStatus,
};

use super::MIGRATION_001_INITIAL;

/// Durable home of the ledger state. The in-memory store stays authoritative
/// while the process runs; this only loads it at startup and records changes.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        tracing::debug!("migrations applied");
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // Account operations
    // ========================

    /// Insert a newly provisioned account after the existing ones.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, position, balance_cents, status, role, created_at)
            VALUES (?, (SELECT COALESCE(MAX(position) + 1, 0) FROM accounts), ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(account.balance)
        .bind(account.status.as_str())
        .bind(account.role.as_str())
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    pub async fn update_account_status(&self, id: AccountId, status: AccountStatus) -> Result<()> {
        sqlx::query("UPDATE accounts SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update account status")?;
        Ok(())
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, balance_cents, status, role, created_at
            FROM accounts
            ORDER BY position
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let id_str: String = row.get("id");
        let status_str: String = row.get("status");
        let role_str: String = row.get("role");
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
            balance: row.get("balance_cents"),
            status: AccountStatus::parse(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account status: {}", status_str))?,
            role: AccountRole::parse(&role_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account role: {}", role_str))?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Record an applied transfer: both balance moves and the log row commit together.
    pub async fn record_transfer(&self, transaction: &Transaction) -> Result<()> {
        let id = i64::try_from(transaction.id).context("Transaction id out of range")?;
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query("UPDATE accounts SET balance_cents = balance_cents - ? WHERE id = ?")
            .bind(transaction.amount)
            .bind(transaction.from_account_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to debit sender")?;

        sqlx::query("UPDATE accounts SET balance_cents = balance_cents + ? WHERE id = ?")
            .bind(transaction.amount)
            .bind(transaction.to_account_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to credit recipient")?;

        Self::insert_transaction(&mut tx, id, transaction, false).await?;

        tx.commit().await.context("Failed to commit transfer")?;
        Ok(())
    }

    async fn insert_transaction(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        id: i64,
        transaction: &Transaction,
        ignore_existing: bool,
    ) -> Result<()> {
        let verb = if ignore_existing {
            "INSERT OR IGNORE"
        } else {
            "INSERT"
        };
        let query = format!(
            "{verb} INTO transactions (id, from_account_id, to_account_id, amount_cents, description, timestamp, status) VALUES (?, ?, ?, ?, ?, ?, ?)"
        );

        sqlx::query(&query)
            .bind(id)
            .bind(transaction.from_account_id.to_string())
            .bind(transaction.to_account_id.to_string())
            .bind(transaction.amount)
            .bind(&transaction.description)
            .bind(transaction.timestamp.to_rfc3339())
            .bind(transaction.status.as_str())
            .execute(&mut **tx)
            .await
            .context("Failed to save transaction")?;
        Ok(())
    }

    /// All transactions in insertion order, oldest first.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, from_account_id, to_account_id, amount_cents, description, timestamp, status
            FROM transactions
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let id: i64 = row.get("id");
        let from_str: String = row.get("from_account_id");
        let to_str: String = row.get("to_account_id");
        let timestamp_str: String = row.get("timestamp");
        let status_str: String = row.get("status");

        Ok(Transaction {
            id: u64::try_from(id).context("Invalid transaction ID")?,
            from_account_id: Uuid::parse_str(&from_str).context("Invalid sender ID")?,
            to_account_id: Uuid::parse_str(&to_str).context("Invalid recipient ID")?,
            amount: row.get("amount_cents"),
            description: row.get("description"),
            timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                .context("Invalid timestamp")?
                .with_timezone(&Utc),
            status: TransactionStatus::parse(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction status: {}", status_str))?,
        })
    }

    // ========================
    // Snapshots
    // ========================

    pub async fn load_snapshot(&self) -> Result<LedgerSnapshot> {
        let accounts = self.list_accounts().await?;
        let transactions = self.list_transactions().await?;
        tracing::debug!(
            accounts = accounts.len(),
            transactions = transactions.len(),
            "snapshot loaded"
        );
        Ok(LedgerSnapshot {
            accounts,
            transactions,
        })
    }

    /// Write a full snapshot: accounts are upserted, missing transactions appended.
    /// Existing transaction rows are never rewritten.
    pub async fn save_snapshot(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        for (position, account) in snapshot.accounts.iter().enumerate() {
            let position = i64::try_from(position).context("Too many accounts")?;
            sqlx::query(
                r#"
                INSERT INTO accounts (id, position, balance_cents, status, role, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    balance_cents = excluded.balance_cents,
                    status = excluded.status,
                    role = excluded.role
                "#,
            )
            .bind(account.id.to_string())
            .bind(position)
            .bind(account.balance)
            .bind(account.status.as_str())
            .bind(account.role.as_str())
            .bind(account.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .context("Failed to upsert account")?;
        }

        for transaction in &snapshot.transactions {
            let id = i64::try_from(transaction.id).context("Transaction id out of range")?;
            Self::insert_transaction(&mut tx, id, transaction, true).await?;
        }

        tx.commit().await.context("Failed to commit snapshot")?;
        tracing::debug!(
            accounts = snapshot.accounts.len(),
            transactions = snapshot.transactions.len(),
            "snapshot saved"
        );
        Ok(())
    }
}

use crate::domain::{
    Account, AccountId, AccountRole, AccountStatus, LedgerStore, Transaction, TransferPolicy,
    TransferRequest,
};
use crate::storage::Repository;

use super::{AppError, HistoryQuery, TransferService};

/// Host-side service: owns the repository and the in-memory ledger.
///
/// State is loaded once at construction. Every change goes to the store
/// first and is then written through to the database; `shutdown` flushes a
/// full snapshot so the two never drift apart across restarts.
///
/// Once the store has accepted a change the call succeeds, even if the
/// database write fails: the change has happened and must not be retried.
/// Such failures are logged and repaired by a full flush.
pub struct BankService {
    repo: Repository,
    store: LedgerStore,
}

/// Accounts and transfer created by [`BankService::seed_demo`].
pub struct DemoSeed {
    pub admin: Account,
    pub user: Account,
    pub transaction: Transaction,
}

impl BankService {
    /// Build a service from an already loaded store.
    pub fn new(repo: Repository, store: LedgerStore) -> Self {
        Self { repo, store }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, policy: TransferPolicy) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Self::load(repo, policy).await
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, policy: TransferPolicy) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Self::load(repo, policy).await
    }

    async fn load(repo: Repository, policy: TransferPolicy) -> Result<Self, AppError> {
        let snapshot = repo.load_snapshot().await?;
        let store = LedgerStore::restore(snapshot, policy)?;
        let (accounts, transactions) = (store.account_count()?, store.transaction_count()?);
        tracing::info!(accounts, transactions, "ledger loaded");
        Ok(Self::new(repo, store))
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn transfers(&self) -> TransferService<'_> {
        TransferService::new(&self.store)
    }

    pub fn history(&self) -> HistoryQuery<'_> {
        HistoryQuery::new(&self.store)
    }

    // ========================
    // Account operations
    // ========================

    /// Provision an account and persist it.
    pub async fn open_account(&self, account: Account) -> Result<Account, AppError> {
        let account = self.store.open_account(account)?;
        if let Err(err) = self.repo.save_account(&account).await {
            self.write_through_failed("account", err).await;
        }
        tracing::info!(account = %account.id, role = %account.role, "account opened");
        Ok(account)
    }

    pub async fn set_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<Account, AppError> {
        let account = self.store.set_status(id, status)?;
        if let Err(err) = self.repo.update_account_status(id, status).await {
            self.write_through_failed("account status", err).await;
        }
        tracing::info!(account = %id, %status, "account status changed");
        Ok(account)
    }

    pub fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        Ok(self.store.get_account(id)?)
    }

    pub fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.store.list_accounts()?)
    }

    // ========================
    // Transfer operations
    // ========================

    /// Validate, apply and persist a transfer.
    pub async fn transfer(&self, request: TransferRequest) -> Result<Transaction, AppError> {
        let transaction = match self.transfers().transfer(request) {
            Ok(transaction) => transaction,
            Err(err) => {
                tracing::warn!(code = err.code(), error = %err, "transfer rejected");
                return Err(err.into());
            }
        };

        tracing::info!(
            transaction = transaction.id,
            from = %transaction.from_account_id,
            to = %transaction.to_account_id,
            amount = transaction.amount,
            "transfer applied"
        );

        if let Err(err) = self.repo.record_transfer(&transaction).await {
            self.write_through_failed("transfer", err).await;
        }

        Ok(transaction)
    }

    /// The whole log, newest first, optionally capped.
    pub fn list_transactions(&self, limit: Option<usize>) -> Result<Vec<Transaction>, AppError> {
        let mut transactions = self.store.list_transactions()?;
        if let Some(limit) = limit {
            transactions.truncate(limit);
        }
        Ok(transactions)
    }

    // ========================
    // Lifecycle
    // ========================

    /// The store already holds the change; fall back to a full flush.
    /// If that fails too the change stays in memory until the next flush.
    async fn write_through_failed(&self, what: &'static str, err: anyhow::Error) {
        tracing::error!(error = %err, what, "write-through failed, flushing snapshot");
        if let Err(err) = self.flush().await {
            tracing::error!(error = %err, what, "snapshot flush failed");
        }
    }

    /// Write the complete in-memory state to the database.
    pub async fn flush(&self) -> Result<(), AppError> {
        let snapshot = self.store.snapshot()?;
        self.repo.save_snapshot(&snapshot).await?;
        Ok(())
    }

    /// Flush and close the database.
    pub async fn shutdown(self) -> Result<(), AppError> {
        self.flush().await?;
        self.repo.close().await;
        tracing::debug!("ledger shut down");
        Ok(())
    }

    /// Provision the sample admin/user pair with an initial transfer.
    /// Does nothing when the ledger already has accounts.
    pub async fn seed_demo(&self) -> Result<Option<DemoSeed>, AppError> {
        if self.store.account_count()? > 0 {
            tracing::warn!("ledger is not empty, skipping demo data");
            return Ok(None);
        }

        let admin = self
            .open_account(Account::open(1_000_000, AccountRole::Admin))
            .await?;
        let user = self
            .open_account(Account::open(150_000, AccountRole::User))
            .await?;
        let transaction = self
            .transfer(
                TransferRequest::new(admin.id, user.id, 50_000).with_description("Initial transfer"),
            )
            .await?;

        Ok(Some(DemoSeed {
            admin: self.get_account(admin.id)?,
            user: self.get_account(user.id)?,
            transaction,
        }))
    }
}

// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use poco_ledger::application::BankService;
use poco_ledger::domain::{Account, AccountId, AccountRole, AccountStatus, LedgerStore, TransferPolicy};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(BankService, TempDir)> {
    test_service_with_policy(TransferPolicy::default()).await
}

pub async fn test_service_with_policy(policy: TransferPolicy) -> Result<(BankService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = BankService::init(&db_path(&temp_dir), policy).await?;
    Ok((service, temp_dir))
}

pub fn db_path(temp_dir: &TempDir) -> String {
    temp_dir.path().join("test.db").to_string_lossy().into_owned()
}

/// A second, independent connection to the test database
pub async fn raw_pool(temp_dir: &TempDir) -> Result<SqlitePool> {
    Ok(SqlitePool::connect(&format!("sqlite:{}", db_path(temp_dir))).await?)
}

/// Test fixture: the admin/user pair most scenarios start from
pub struct StandardAccounts {
    pub admin: AccountId,
    pub user: AccountId,
}

impl StandardAccounts {
    /// Admin with 1000.00, user with 500.00, both active
    pub fn create(store: &LedgerStore) -> StandardAccounts {
        StandardAccounts {
            admin: open(store, 100_000, AccountRole::Admin, AccountStatus::Active),
            user: open(store, 50_000, AccountRole::User, AccountStatus::Active),
        }
    }
}

pub fn open(store: &LedgerStore, balance: i64, role: AccountRole, status: AccountStatus) -> AccountId {
    store
        .open_account(Account::open(balance, role).with_status(status))
        .unwrap()
        .id
}

pub fn balance_of(store: &LedgerStore, id: AccountId) -> i64 {
    store.get_account(id).unwrap().balance()
}

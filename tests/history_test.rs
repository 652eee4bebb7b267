mod common;

use common::StandardAccounts;
use poco_ledger::application::HistoryQuery;
use poco_ledger::domain::{Cents, Direction, LedgerError, LedgerStore};
use uuid::Uuid;

#[test]
fn test_rent_scenario_history() {
    let store = LedgerStore::default();
    let accounts = StandardAccounts::create(&store);

    let rent = store
        .apply(accounts.user, accounts.admin, 30_000, Some("rent".into()))
        .unwrap();
    let query = HistoryQuery::new(&store);

    let user_history = query.account_history(accounts.user, None).unwrap();
    assert_eq!(user_history, vec![rent.clone()]);
    assert_eq!(
        HistoryQuery::net_direction(&rent, accounts.user),
        Some(Direction::Debit)
    );
    assert_eq!(
        HistoryQuery::net_direction(&rent, accounts.admin),
        Some(Direction::Credit)
    );
    assert_eq!(HistoryQuery::net_direction(&rent, Uuid::new_v4()), None);
}

#[test]
fn test_history_follows_insertion_order_not_timestamps() {
    let store = LedgerStore::default();
    let accounts = StandardAccounts::create(&store);
    for amount in [10, 20, 30] {
        store.apply(accounts.admin, accounts.user, amount, None).unwrap();
    }

    let ids: Vec<u64> = HistoryQuery::new(&store)
        .account_history(accounts.user, None)
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec![3, 2, 1]);
}

#[test]
fn test_recent_activity_defaults_to_all_when_fewer() {
    let store = LedgerStore::default();
    let accounts = StandardAccounts::create(&store);
    store.apply(accounts.admin, accounts.user, 10, None).unwrap();

    let recent = HistoryQuery::new(&store)
        .recent_activity(accounts.user, 3)
        .unwrap();
    assert_eq!(recent.len(), 1);
}

#[test]
fn test_account_without_activity_has_empty_history() {
    let store = LedgerStore::default();
    let accounts = StandardAccounts::create(&store);

    let query = HistoryQuery::new(&store);
    assert!(query.account_history(accounts.user, None).unwrap().is_empty());
    assert!(query.statement(accounts.user, None).unwrap().is_empty());

    let summary = query.activity_summary(accounts.user).unwrap();
    assert_eq!(summary.balance, 50_000);
    assert_eq!(summary.last_activity, None);
}

#[test]
fn test_unknown_account_errors() {
    let store = LedgerStore::default();
    let ghost = Uuid::new_v4();
    let query = HistoryQuery::new(&store);

    assert_eq!(
        query.recent_activity(ghost, 3).unwrap_err(),
        LedgerError::NotFound(ghost)
    );
    assert_eq!(
        query.statement(ghost, None).unwrap_err(),
        LedgerError::NotFound(ghost)
    );
}

#[test]
fn test_statement_reconstructs_opening_balance() {
    let store = LedgerStore::default();
    let accounts = StandardAccounts::create(&store);
    store.apply(accounts.admin, accounts.user, 1_000, None).unwrap();
    store.apply(accounts.user, accounts.admin, 2_500, None).unwrap();
    store.apply(accounts.admin, accounts.user, 400, None).unwrap();

    let lines = HistoryQuery::new(&store)
        .statement(accounts.user, None)
        .unwrap();
    let oldest = lines.last().unwrap();
    let opening: Cents = oldest.balance_after - oldest.signed_amount;
    assert_eq!(opening, 50_000);
    assert_eq!(lines[0].balance_after, 48_900);

    let limited = HistoryQuery::new(&store)
        .statement(accounts.user, Some(1))
        .unwrap();
    assert_eq!(limited, lines[..1].to_vec());
}

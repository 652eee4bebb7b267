mod common;

use common::{balance_of, open, StandardAccounts};
use poco_ledger::application::TransferService;
use poco_ledger::domain::{
    AccountRole, AccountStatus, LedgerError, LedgerStore, TransferPolicy, TransferRequest,
    ValidationReason, DEFAULT_DESCRIPTION,
};
use uuid::Uuid;

#[test]
fn test_transfer_moves_money_and_records_once() {
    let store = LedgerStore::default();
    let accounts = StandardAccounts::create(&store);
    let service = TransferService::new(&store);

    let tx = service
        .transfer(TransferRequest::new(accounts.admin, accounts.user, 25_000).with_description("Rent"))
        .unwrap();

    assert_eq!(tx.id, 1);
    assert_eq!(tx.amount, 25_000);
    assert_eq!(tx.description, "Rent");
    assert_eq!(balance_of(&store, accounts.admin), 75_000);
    assert_eq!(balance_of(&store, accounts.user), 75_000);
    assert_eq!(store.list_transactions().unwrap(), vec![tx]);
}

#[test]
fn test_transaction_ids_are_sequential() {
    let store = LedgerStore::default();
    let accounts = StandardAccounts::create(&store);

    let ids: Vec<u64> = (0..4)
        .map(|_| store.apply(accounts.admin, accounts.user, 100, None).unwrap().id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[test]
fn test_missing_description_gets_default() {
    let store = LedgerStore::default();
    let accounts = StandardAccounts::create(&store);

    let blank = store
        .apply(accounts.admin, accounts.user, 1, Some("   ".into()))
        .unwrap();
    let none = store.apply(accounts.admin, accounts.user, 1, None).unwrap();
    assert_eq!(blank.description, DEFAULT_DESCRIPTION);
    assert_eq!(none.description, DEFAULT_DESCRIPTION);
}

#[test]
fn test_rejections_leave_ledger_untouched() {
    let store = LedgerStore::default();
    let accounts = StandardAccounts::create(&store);
    let ghost = Uuid::new_v4();
    let before = store.snapshot().unwrap();

    let cases = vec![
        (
            store.apply(accounts.user, accounts.user, 10, None),
            LedgerError::Validation(ValidationReason::SelfTransfer),
        ),
        (
            store.apply(accounts.user, accounts.admin, 0, None),
            LedgerError::Validation(ValidationReason::NonPositiveAmount),
        ),
        (
            store.apply(accounts.user, accounts.admin, -5, None),
            LedgerError::Validation(ValidationReason::NonPositiveAmount),
        ),
        (
            store.apply(ghost, accounts.admin, 10, None),
            LedgerError::NotFound(ghost),
        ),
        (
            store.apply(accounts.user, ghost, 10, None),
            LedgerError::NotFound(ghost),
        ),
        (
            store.apply(accounts.user, accounts.admin, 50_001, None),
            LedgerError::InsufficientFunds {
                account: accounts.user,
                balance: 50_000,
                required: 50_001,
            },
        ),
    ];

    for (result, expected) in cases {
        assert_eq!(result.unwrap_err(), expected);
    }
    assert_eq!(store.snapshot().unwrap(), before);
}

#[test]
fn test_exact_balance_can_be_sent() {
    let store = LedgerStore::default();
    let accounts = StandardAccounts::create(&store);

    store.apply(accounts.user, accounts.admin, 50_000, None).unwrap();
    assert_eq!(balance_of(&store, accounts.user), 0);
    assert_eq!(balance_of(&store, accounts.admin), 150_000);
}

#[test]
fn test_sender_status_is_enforced() {
    let store = LedgerStore::default();
    let active = open(&store, 1_000, AccountRole::User, AccountStatus::Active);
    let suspended = open(&store, 1_000, AccountRole::User, AccountStatus::Suspended);
    let pending = open(&store, 1_000, AccountRole::User, AccountStatus::Pending);

    assert_eq!(
        store.apply(suspended, active, 10, None).unwrap_err(),
        LedgerError::Validation(ValidationReason::SenderNotPermitted(AccountStatus::Suspended))
    );
    assert_eq!(
        store.apply(pending, active, 10, None).unwrap_err(),
        LedgerError::Validation(ValidationReason::SenderNotPermitted(AccountStatus::Pending))
    );
}

#[test]
fn test_inactive_recipient_rejected_by_default() {
    let store = LedgerStore::default();
    let active = open(&store, 1_000, AccountRole::User, AccountStatus::Active);
    let suspended = open(&store, 0, AccountRole::User, AccountStatus::Suspended);

    assert_eq!(
        store.apply(active, suspended, 10, None).unwrap_err(),
        LedgerError::Validation(ValidationReason::RecipientNotPermitted(AccountStatus::Suspended))
    );
}

#[test]
fn test_policy_can_relax_recipient_and_admin_rules() {
    let policy = TransferPolicy::default()
        .with_admin_override(true)
        .with_recipient_must_be_active(false);
    let store = LedgerStore::new(policy);
    let admin = open(&store, 1_000, AccountRole::Admin, AccountStatus::Suspended);
    let user = open(&store, 1_000, AccountRole::User, AccountStatus::Suspended);
    let pending = open(&store, 0, AccountRole::User, AccountStatus::Pending);

    assert!(store.apply(admin, pending, 100, None).is_ok());
    // Override applies to admins only.
    assert!(matches!(
        store.apply(user, pending, 100, None),
        Err(LedgerError::Validation(ValidationReason::SenderNotPermitted(_)))
    ));
    assert_eq!(balance_of(&store, pending), 100);
}

#[test]
fn test_recipient_overflow_is_rejected() {
    let store = LedgerStore::default();
    let sender = open(&store, 10, AccountRole::User, AccountStatus::Active);
    let rich = open(&store, i64::MAX - 5, AccountRole::User, AccountStatus::Active);

    assert_eq!(
        store.apply(sender, rich, 10, None).unwrap_err(),
        LedgerError::Validation(ValidationReason::BalanceOverflow)
    );
    assert_eq!(balance_of(&store, sender), 10);
    assert_eq!(store.transaction_count().unwrap(), 0);
}

#[test]
fn test_request_parsing_rejects_unrepresentable_amounts() {
    let from = Uuid::new_v4();
    let to = Uuid::new_v4();

    let request = TransferRequest::parse(from, to, "12.34", None).unwrap();
    assert_eq!(request.amount, 1_234);

    assert_eq!(
        TransferRequest::parse(from, to, "0.001", None).unwrap_err(),
        LedgerError::Validation(ValidationReason::UnrepresentableAmount)
    );
}

#[test]
fn test_money_is_conserved_across_many_transfers() {
    let store = LedgerStore::default();
    let accounts = StandardAccounts::create(&store);
    let third = open(&store, 7_777, AccountRole::User, AccountStatus::Active);
    let total = store.total_balance().unwrap();

    for round in 0..50_i64 {
        let _ = store.apply(accounts.admin, accounts.user, round * 37, None);
        let _ = store.apply(accounts.user, third, round * 53, None);
        let _ = store.apply(third, accounts.admin, round * 91, None);
    }

    assert_eq!(store.total_balance().unwrap(), total);
    for account in store.list_accounts().unwrap() {
        assert!(account.balance() >= 0);
    }
}

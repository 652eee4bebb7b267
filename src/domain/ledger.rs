use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::{Deserialize, Serialize};

use super::{
    Account, AccountId, AccountStatus, Cents, LedgerError, LedgerResult, Transaction,
    TransactionId, TransferPolicy, ValidationReason,
};

type Slot = Arc<Mutex<Account>>;

/// Account slots by id, plus their provisioning order.
#[derive(Default)]
struct Registry {
    order: Vec<AccountId>,
    slots: HashMap<AccountId, Slot>,
}

struct Journal {
    entries: Vec<Transaction>,
    next_id: TransactionId,
}

/// Accounts and transactions captured together, with no transfer half-applied.
/// This is what a host loads at startup and stores after changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// In provisioning order
    pub accounts: Vec<Account>,
    /// In insertion order, oldest first
    pub transactions: Vec<Transaction>,
}

impl LedgerSnapshot {
    /// Sum of every balance, widened so it cannot overflow.
    pub fn total_balance(&self) -> i128 {
        self.accounts.iter().map(|a| i128::from(a.balance)).sum()
    }
}

/// The single owner of account balances and the transaction log.
///
/// Each account sits behind its own mutex. A transfer locks its two accounts
/// in ascending id order, then the journal, so transfers on disjoint pairs run
/// in parallel and overlapping ones serialize without deadlocking. Whole-ledger
/// reads take every account lock in the same order.
pub struct LedgerStore {
    registry: RwLock<Registry>,
    journal: Mutex<Journal>,
    policy: TransferPolicy,
}

fn lock<T>(mutex: &Mutex<T>) -> LedgerResult<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| LedgerError::ConcurrencyConflict)
}

/// Lock every slot in ascending id order; guards come back in slice order.
fn lock_all(slots: &[(AccountId, Slot)]) -> LedgerResult<Vec<MutexGuard<'_, Account>>> {
    let mut by_id: Vec<usize> = (0..slots.len()).collect();
    by_id.sort_by_key(|&i| slots[i].0);

    let mut guards: Vec<Option<MutexGuard<'_, Account>>> = slots.iter().map(|_| None).collect();
    for i in by_id {
        guards[i] = Some(lock(&slots[i].1)?);
    }
    Ok(guards.into_iter().flatten().collect())
}

impl LedgerStore {
    pub fn new(policy: TransferPolicy) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            journal: Mutex::new(Journal {
                entries: Vec::new(),
                next_id: 1,
            }),
            policy,
        }
    }

    /// Rebuild a store from host-loaded state.
    ///
    /// Balances are taken as given. Transactions are checked for structural
    /// soundness and ordered by id; the id counter resumes after the highest one.
    pub fn restore(snapshot: LedgerSnapshot, policy: TransferPolicy) -> LedgerResult<Self> {
        let invalid = || LedgerError::Validation(ValidationReason::InvalidSnapshot);

        let mut registry = Registry::default();
        for account in snapshot.accounts {
            if registry.slots.contains_key(&account.id) {
                return Err(invalid());
            }
            registry.order.push(account.id);
            registry
                .slots
                .insert(account.id, Arc::new(Mutex::new(account)));
        }

        let mut entries = snapshot.transactions;
        entries.sort_by_key(|t| t.id);

        let mut seen = HashSet::new();
        for transaction in &entries {
            let sound = seen.insert(transaction.id)
                && transaction.amount > 0
                && transaction.from_account_id != transaction.to_account_id
                && registry.slots.contains_key(&transaction.from_account_id)
                && registry.slots.contains_key(&transaction.to_account_id);
            if !sound {
                return Err(invalid());
            }
        }

        let next_id = entries.last().map_or(1, |t| t.id + 1);

        Ok(Self {
            registry: RwLock::new(registry),
            journal: Mutex::new(Journal { entries, next_id }),
            policy,
        })
    }

    pub fn policy(&self) -> TransferPolicy {
        self.policy
    }

    // ========================
    // Account operations
    // ========================

    /// Register a fully formed account supplied by the provisioning collaborator.
    pub fn open_account(&self, account: Account) -> LedgerResult<Account> {
        let mut registry = self
            .registry
            .write()
            .map_err(|_| LedgerError::ConcurrencyConflict)?;

        if registry.slots.contains_key(&account.id) {
            return Err(LedgerError::AccountExists(account.id));
        }

        registry.order.push(account.id);
        registry
            .slots
            .insert(account.id, Arc::new(Mutex::new(account.clone())));
        Ok(account)
    }

    /// Change an account's status. The balance is untouched.
    pub fn set_status(&self, id: AccountId, status: AccountStatus) -> LedgerResult<Account> {
        let slot = self.slot(id)?;
        let mut account = lock(&slot)?;
        account.status = status;
        Ok(account.clone())
    }

    pub fn get_account(&self, id: AccountId) -> LedgerResult<Account> {
        let slot = self.slot(id)?;
        let account = lock(&slot)?;
        Ok(account.clone())
    }

    pub fn contains(&self, id: AccountId) -> bool {
        self.slot(id).is_ok()
    }

    pub fn account_count(&self) -> LedgerResult<usize> {
        let registry = self
            .registry
            .read()
            .map_err(|_| LedgerError::ConcurrencyConflict)?;
        Ok(registry.order.len())
    }

    /// All accounts in provisioning order, read with no transfer in flight.
    pub fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        let slots = self.all_slots()?;
        let guards = lock_all(&slots)?;
        Ok(guards.iter().map(|g| (**g).clone()).collect())
    }

    // ========================
    // Transfer
    // ========================

    /// Move `amount` from one account to another and record it.
    ///
    /// Either both balances change and a transaction is appended, or nothing
    /// changes and an error is returned.
    pub fn apply(
        &self,
        from_id: AccountId,
        to_id: AccountId,
        amount: Cents,
        description: Option<String>,
    ) -> LedgerResult<Transaction> {
        self.apply_with_policy(&self.policy, from_id, to_id, amount, description)
    }

    pub(crate) fn apply_with_policy(
        &self,
        policy: &TransferPolicy,
        from_id: AccountId,
        to_id: AccountId,
        amount: Cents,
        description: Option<String>,
    ) -> LedgerResult<Transaction> {
        if from_id == to_id {
            return Err(ValidationReason::SelfTransfer.into());
        }
        if amount <= 0 {
            return Err(ValidationReason::NonPositiveAmount.into());
        }

        let from_slot = self.slot(from_id)?;
        let to_slot = self.slot(to_id)?;

        let (mut from, mut to) = if from_id < to_id {
            let from = lock(&from_slot)?;
            let to = lock(&to_slot)?;
            (from, to)
        } else {
            let to = lock(&to_slot)?;
            let from = lock(&from_slot)?;
            (from, to)
        };

        policy.check_sender(&from)?;
        policy.check_recipient(&to)?;

        if from.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account: from_id,
                balance: from.balance,
                required: amount,
            });
        }
        let credited = to
            .balance
            .checked_add(amount)
            .ok_or(ValidationReason::BalanceOverflow)?;

        // Last lock in the order; taken before any write.
        let mut journal = lock(&self.journal)?;

        let transaction =
            Transaction::completed(journal.next_id, from_id, to_id, amount, description);

        from.balance -= amount;
        to.balance = credited;
        journal.next_id += 1;
        journal.entries.push(transaction.clone());

        Ok(transaction)
    }

    // ========================
    // Log and snapshots
    // ========================

    /// The whole log, newest first.
    pub fn list_transactions(&self) -> LedgerResult<Vec<Transaction>> {
        let journal = lock(&self.journal)?;
        Ok(journal.entries.iter().rev().cloned().collect())
    }

    pub fn transaction_count(&self) -> LedgerResult<usize> {
        Ok(lock(&self.journal)?.entries.len())
    }

    /// Transactions matching `filter`, newest first, at most `limit` of them.
    pub(crate) fn scan_transactions<F>(
        &self,
        filter: F,
        limit: Option<usize>,
    ) -> LedgerResult<Vec<Transaction>>
    where
        F: Fn(&Transaction) -> bool,
    {
        let journal = lock(&self.journal)?;
        Ok(journal
            .entries
            .iter()
            .rev()
            .filter(|t| filter(t))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    /// One account together with its transactions (newest first), read while
    /// the account is locked so the balance matches the history exactly.
    pub(crate) fn account_with_history(
        &self,
        id: AccountId,
    ) -> LedgerResult<(Account, Vec<Transaction>)> {
        let slot = self.slot(id)?;
        let account = lock(&slot)?;
        let journal = lock(&self.journal)?;
        let history = journal
            .entries
            .iter()
            .rev()
            .filter(|t| t.involves(id))
            .cloned()
            .collect();
        Ok((account.clone(), history))
    }

    pub fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        let slots = self.all_slots()?;
        let guards = lock_all(&slots)?;
        let journal = lock(&self.journal)?;

        Ok(LedgerSnapshot {
            accounts: guards.iter().map(|g| (**g).clone()).collect(),
            transactions: journal.entries.clone(),
        })
    }

    /// Sum of all balances. Constant across any sequence of transfers.
    pub fn total_balance(&self) -> LedgerResult<i128> {
        let slots = self.all_slots()?;
        let guards = lock_all(&slots)?;
        Ok(guards.iter().map(|g| i128::from(g.balance)).sum())
    }

    fn slot(&self, id: AccountId) -> LedgerResult<Slot> {
        let registry = self
            .registry
            .read()
            .map_err(|_| LedgerError::ConcurrencyConflict)?;
        registry
            .slots
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound(id))
    }

    fn all_slots(&self) -> LedgerResult<Vec<(AccountId, Slot)>> {
        let registry = self
            .registry
            .read()
            .map_err(|_| LedgerError::ConcurrencyConflict)?;
        Ok(registry
            .order
            .iter()
            .map(|id| (*id, Arc::clone(&registry.slots[id])))
            .collect())
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new(TransferPolicy::default())
    }
}

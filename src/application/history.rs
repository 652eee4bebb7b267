use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AccountId, Cents, Direction, LedgerResult, LedgerStore, Transaction, ValidationReason,
};

/// One line of an account statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    pub transaction: Transaction,
    pub direction: Direction,
    /// Negative when the account sent the money
    pub signed_amount: Cents,
    /// Account balance right after this transaction
    pub balance_after: Cents,
}

/// Dashboard figures for a single account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub account_id: AccountId,
    pub balance: Cents,
    pub incoming_count: usize,
    pub outgoing_count: usize,
    pub total_in: Cents,
    pub total_out: Cents,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Read-only views over the transaction log.
/// Every call reads the store as it is at that moment; nothing is cached.
pub struct HistoryQuery<'a> {
    store: &'a LedgerStore,
}

impl<'a> HistoryQuery<'a> {
    pub fn new(store: &'a LedgerStore) -> Self {
        Self { store }
    }

    /// Transactions the account sent or received, newest first.
    pub fn account_history(
        &self,
        account_id: AccountId,
        limit: Option<usize>,
    ) -> LedgerResult<Vec<Transaction>> {
        self.store.get_account(account_id)?;
        self.store.scan_transactions(|t| t.involves(account_id), limit)
    }

    /// The `n` most recent transactions of the account.
    pub fn recent_activity(
        &self,
        account_id: AccountId,
        n: usize,
    ) -> LedgerResult<Vec<Transaction>> {
        self.account_history(account_id, Some(n))
    }

    /// Debit if the viewpoint sent the transaction, credit if it received it.
    pub fn net_direction(transaction: &Transaction, viewpoint: AccountId) -> Option<Direction> {
        transaction.direction_for(viewpoint)
    }

    /// History with signed amounts and the running balance after each line.
    pub fn statement(
        &self,
        account_id: AccountId,
        limit: Option<usize>,
    ) -> LedgerResult<Vec<StatementLine>> {
        let (account, history) = self.store.account_with_history(account_id)?;

        // Walk back from the current balance, undoing one transaction at a time.
        // Widened: a restored history need not agree with the balance it ends on.
        let mut running = i128::from(account.balance());
        let mut lines = Vec::new();
        for transaction in history.into_iter().take(limit.unwrap_or(usize::MAX)) {
            let Some(direction) = transaction.direction_for(account_id) else {
                continue;
            };
            let signed_amount = direction.sign(transaction.amount);
            let balance_after =
                Cents::try_from(running).map_err(|_| ValidationReason::BalanceOverflow)?;
            lines.push(StatementLine {
                transaction,
                direction,
                signed_amount,
                balance_after,
            });
            running -= i128::from(signed_amount);
        }

        Ok(lines)
    }

    pub fn activity_summary(&self, account_id: AccountId) -> LedgerResult<ActivitySummary> {
        let (account, history) = self.store.account_with_history(account_id)?;

        let mut summary = ActivitySummary {
            account_id,
            balance: account.balance(),
            incoming_count: 0,
            outgoing_count: 0,
            total_in: 0,
            total_out: 0,
            last_activity: history.first().map(|t| t.timestamp),
        };

        for transaction in &history {
            match transaction.direction_for(account_id) {
                Some(Direction::Credit) => {
                    summary.incoming_count += 1;
                    summary.total_in = summary.total_in.saturating_add(transaction.amount);
                }
                Some(Direction::Debit) => {
                    summary.outgoing_count += 1;
                    summary.total_out = summary.total_out.saturating_add(transaction.amount);
                }
                None => {}
            }
        }

        Ok(summary)
    }

    pub fn total_balance(&self) -> LedgerResult<i128> {
        self.store.total_balance()
    }
}

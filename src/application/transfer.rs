use crate::domain::{
    Account, Cents, LedgerError, LedgerResult, LedgerStore, Transaction, TransferPolicy,
    TransferRequest, ValidationReason,
};

/// Validates transfer requests and hands valid ones to the store.
///
/// The service never writes state itself. Every rule is checked before the
/// store is asked to apply, and the store re-checks the structural ones while
/// holding its locks, so a balance that moved in between is still caught.
pub struct TransferService<'a> {
    store: &'a LedgerStore,
    policy: TransferPolicy,
}

impl<'a> TransferService<'a> {
    /// A service using the store's own policy.
    pub fn new(store: &'a LedgerStore) -> Self {
        Self {
            policy: store.policy(),
            store,
        }
    }

    /// A service with a deployment-specific policy, e.g. an admin override.
    pub fn with_policy(store: &'a LedgerStore, policy: TransferPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> TransferPolicy {
        self.policy
    }

    /// Validate and apply a transfer. Returns the store's transaction unchanged.
    pub fn transfer(&self, request: TransferRequest) -> LedgerResult<Transaction> {
        self.validate(&request)?;

        let TransferRequest {
            from_account_id,
            to_account_id,
            amount,
            description,
        } = request;

        self.store.apply_with_policy(
            &self.policy,
            from_account_id,
            to_account_id,
            amount,
            description,
        )
    }

    /// Run every check without applying anything.
    pub fn validate(&self, request: &TransferRequest) -> LedgerResult<()> {
        if request.from_account_id == request.to_account_id {
            return Err(ValidationReason::SelfTransfer.into());
        }
        if request.amount <= 0 {
            return Err(ValidationReason::NonPositiveAmount.into());
        }

        let from = self.store.get_account(request.from_account_id)?;
        let to = self.store.get_account(request.to_account_id)?;

        self.policy.check_sender(&from)?;
        self.policy.check_recipient(&to)?;

        check_funds(&from, request.amount)?;
        to.balance()
            .checked_add(request.amount)
            .ok_or(ValidationReason::BalanceOverflow)?;

        Ok(())
    }
}

fn check_funds(from: &Account, amount: Cents) -> LedgerResult<()> {
    if from.balance() < amount {
        return Err(LedgerError::InsufficientFunds {
            account: from.id,
            balance: from.balance(),
            required: amount,
        });
    }
    Ok(())
}

use thiserror::Error;

use super::{AccountId, AccountStatus, Cents};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Failures reported by the ledger core.
/// Every error is raised before any state is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    #[error("Account already exists: {0}")]
    AccountExists(AccountId),

    #[error("Transfer rejected: {0}")]
    Validation(ValidationReason),

    #[error("Insufficient funds in account {account}: balance {balance}, required {required}")]
    InsufficientFunds {
        account: AccountId,
        balance: Cents,
        required: Cents,
    },

    /// A lock could not be acquired. Nothing was changed; retrying is safe.
    #[error("Concurrent update conflict, retry the operation")]
    ConcurrencyConflict,
}

impl LedgerError {
    /// Machine-readable code for hosts to map onto messages.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::NotFound(_) => "not_found",
            LedgerError::AccountExists(_) => "account_exists",
            LedgerError::Validation(reason) => reason.code(),
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::ConcurrencyConflict => "concurrency_conflict",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrencyConflict)
    }
}

impl From<ValidationReason> for LedgerError {
    fn from(reason: ValidationReason) -> Self {
        LedgerError::Validation(reason)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    #[error("cannot transfer to the same account")]
    SelfTransfer,

    #[error("amount must be positive")]
    NonPositiveAmount,

    #[error("amount is not representable in cents")]
    UnrepresentableAmount,

    #[error("amount would overflow the recipient balance")]
    BalanceOverflow,

    #[error("sender account is {0}")]
    SenderNotPermitted(AccountStatus),

    #[error("recipient account is {0}")]
    RecipientNotPermitted(AccountStatus),

    #[error("snapshot is inconsistent")]
    InvalidSnapshot,
}

impl ValidationReason {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationReason::SelfTransfer => "self_transfer",
            ValidationReason::NonPositiveAmount => "non_positive_amount",
            ValidationReason::UnrepresentableAmount => "unrepresentable_amount",
            ValidationReason::BalanceOverflow => "balance_overflow",
            ValidationReason::SenderNotPermitted(_) => "sender_not_permitted",
            ValidationReason::RecipientNotPermitted(_) => "recipient_not_permitted",
            ValidationReason::InvalidSnapshot => "invalid_snapshot",
        }
    }
}

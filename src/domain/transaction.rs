use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{parse_cents, AccountId, Cents, LedgerError, ValidationReason};

/// Position in the transaction log. Assigned by the store, strictly increasing.
pub type TransactionId = u64;

/// Description recorded when the request carries none.
pub const DEFAULT_DESCRIPTION: &str = "Funds transfer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(TransactionStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Which side of a transaction an account is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The account sent the money
    Debit,
    /// The account received the money
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Debit => "debit",
            Direction::Credit => "credit",
        }
    }

    /// Apply this direction's sign to an unsigned amount.
    pub fn sign(&self, amount: Cents) -> Cents {
        match self {
            Direction::Debit => -amount,
            Direction::Credit => amount,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// An immutable record of a completed transfer.
/// Only the ledger store creates these; the log is append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Source account (balance decreases)
    pub from_account_id: AccountId,
    /// Destination account (balance increases)
    pub to_account_id: AccountId,
    /// Amount in cents (always positive)
    pub amount: Cents,
    pub description: String,
    /// Informational only; ordering is by `id`
    pub timestamp: DateTime<Utc>,
    pub status: TransactionStatus,
}

impl Transaction {
    pub(crate) fn completed(
        id: TransactionId,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: Cents,
        description: Option<String>,
    ) -> Self {
        Self {
            id,
            from_account_id,
            to_account_id,
            amount,
            description: normalize_description(description),
            timestamp: Utc::now(),
            status: TransactionStatus::Completed,
        }
    }

    /// True if the account is either party of this transaction.
    pub fn involves(&self, account_id: AccountId) -> bool {
        self.from_account_id == account_id || self.to_account_id == account_id
    }

    /// Classify this transaction relative to a viewpoint account.
    /// Returns `None` if the account is not a party.
    pub fn direction_for(&self, viewpoint: AccountId) -> Option<Direction> {
        if self.from_account_id == viewpoint {
            Some(Direction::Debit)
        } else if self.to_account_id == viewpoint {
            Some(Direction::Credit)
        } else {
            None
        }
    }

    /// Amount as seen from the viewpoint: negative when sent, positive when received.
    pub fn signed_amount(&self, viewpoint: AccountId) -> Option<Cents> {
        self.direction_for(viewpoint)
            .map(|direction| direction.sign(self.amount))
    }

    /// The account on the other side, seen from the viewpoint.
    pub fn counterparty(&self, viewpoint: AccountId) -> Option<AccountId> {
        match self.direction_for(viewpoint)? {
            Direction::Debit => Some(self.to_account_id),
            Direction::Credit => Some(self.from_account_id),
        }
    }
}

fn normalize_description(description: Option<String>) -> String {
    match description {
        Some(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => DEFAULT_DESCRIPTION.to_string(),
    }
}

/// A transfer as submitted by a UI or API layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Cents,
    pub description: Option<String>,
}

impl TransferRequest {
    pub fn new(from_account_id: AccountId, to_account_id: AccountId, amount: Cents) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Build a request from raw form input, where the amount is a decimal string.
    pub fn parse(
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: &str,
        description: Option<String>,
    ) -> Result<Self, LedgerError> {
        let amount = parse_cents(amount)
            .map_err(|_| LedgerError::Validation(ValidationReason::UnrepresentableAmount))?;
        Ok(Self {
            from_account_id,
            to_account_id,
            amount,
            description,
        })
    }
}

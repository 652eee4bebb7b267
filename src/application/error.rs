use thiserror::Error;

use crate::domain::{LedgerError, ParseCentsError};

/// Errors surfaced to the host's users.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Invalid amount '{input}': {source}")]
    InvalidAmount {
        input: String,
        source: ParseCentsError,
    },

    #[error("Invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("Invalid account status: {0} (expected active, suspended or pending)")]
    InvalidStatus(String),

    #[error("Invalid account role: {0} (expected admin or user)")]
    InvalidRole(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// Machine-readable code, matching the ledger's own codes where they apply.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Ledger(err) => err.code(),
            AppError::InvalidAmount { .. } => "invalid_amount",
            AppError::InvalidAccountId(_) => "invalid_account_id",
            AppError::InvalidStatus(_) => "invalid_status",
            AppError::InvalidRole(_) => "invalid_role",
            AppError::Database(_) => "database",
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_ledger_errors_pass_through() {
        let id = Uuid::new_v4();
        let err = AppError::from(LedgerError::NotFound(id));
        assert_eq!(err.code(), "not_found");
        assert_eq!(err.to_string(), format!("Account not found: {id}"));
    }

    #[test]
    fn test_invalid_amount_message() {
        let err = AppError::InvalidAmount {
            input: "1.005".into(),
            source: ParseCentsError::ExcessPrecision,
        };
        assert_eq!(
            err.to_string(),
            "Invalid amount '1.005': amount has more than two decimal places"
        );
    }
}

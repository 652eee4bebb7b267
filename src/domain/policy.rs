use serde::{Deserialize, Serialize};

use super::{Account, ValidationReason};

/// Deployment-specific rules on which account statuses may transact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPolicy {
    /// Admin accounts may originate transfers whatever their status.
    pub admin_override: bool,
    /// Recipients must be active as well as senders.
    pub recipient_must_be_active: bool,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            admin_override: false,
            recipient_must_be_active: true,
        }
    }
}

impl TransferPolicy {
    pub fn with_admin_override(mut self, enabled: bool) -> Self {
        self.admin_override = enabled;
        self
    }

    pub fn with_recipient_must_be_active(mut self, required: bool) -> Self {
        self.recipient_must_be_active = required;
        self
    }

    pub fn check_sender(&self, account: &Account) -> Result<(), ValidationReason> {
        if account.is_active() || (self.admin_override && account.is_admin()) {
            Ok(())
        } else {
            Err(ValidationReason::SenderNotPermitted(account.status))
        }
    }

    pub fn check_recipient(&self, account: &Account) -> Result<(), ValidationReason> {
        if account.is_active() || !self.recipient_must_be_active {
            Ok(())
        } else {
            Err(ValidationReason::RecipientNotPermitted(account.status))
        }
    }
}

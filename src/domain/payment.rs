use super::OrderId;
use crate::domain::money::Money;
use crate::error::{CommerceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default provider when the caller does not name one.
pub const DEFAULT_PROVIDER: &str = "STRIPE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    /// Success and failure are terminal for a payment record; only a fresh
    /// record (after re-initiation) can move again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Success | PaymentStatus::Failed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// At most one payment record per order. References the order by id, the
/// amount is copied from the order total at initiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub order_id: OrderId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub provider: String,
    pub provider_payment_id: Option<String>,
}

impl Payment {
    pub fn new(order_id: OrderId, amount: Money, provider: Option<&str>) -> Self {
        Self {
            order_id,
            amount,
            status: PaymentStatus::Pending,
            provider: provider.unwrap_or(DEFAULT_PROVIDER).to_string(),
            provider_payment_id: None,
        }
    }

    /// Pending -> Success, recording the provider's payment reference.
    pub fn succeed(&mut self, provider_payment_id: Option<String>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(CommerceError::InvalidState(format!(
                "payment for order {} is already {}",
                self.order_id, self.status
            )));
        }
        self.status = PaymentStatus::Success;
        self.provider_payment_id = provider_payment_id;
        Ok(())
    }

    /// Pending -> Failed. The owning order stays pending and may be retried
    /// through a new initiation.
    pub fn fail(&mut self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(CommerceError::InvalidState(format!(
                "payment for order {} is already {}",
                self.order_id, self.status
            )));
        }
        self.status = PaymentStatus::Failed;
        Ok(())
    }
}

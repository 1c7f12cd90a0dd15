use crate::domain::OrderId;
use crate::domain::money::Money;
use crate::domain::order::OrderStatus;
use crate::domain::ports::Notifier;
use crate::error::Result;
use async_trait::async_trait;

/// Notifier that records deliveries in the log instead of sending mail.
///
/// Stands in for the SMTP-backed collaborator, which is outside this core.
#[derive(Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_order_confirmation(
        &self,
        to: &str,
        order_id: OrderId,
        amount: Money,
    ) -> Result<()> {
        tracing::info!(%to, order_id, %amount, "order confirmation notification");
        Ok(())
    }

    async fn send_status_update(
        &self,
        to: &str,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<()> {
        tracing::info!(%to, order_id, %status, "order status notification");
        Ok(())
    }
}

use crate::domain::money::Money;
use crate::domain::{OrderId, UserId};
use crate::domain::order::OrderStatus;
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{NotifierRef, OrderStoreRef, PaymentStoreRef, UserDirectoryRef};
use crate::error::{CommerceError, Result};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Non-mutating session descriptor handed to clients starting a provider
/// checkout. The reference is opaque; a real integration would return the
/// provider's hosted checkout handle instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentSession {
    pub order_id: OrderId,
    pub amount: Money,
    pub provider: String,
    pub status: PaymentStatus,
    pub checkout_ref: String,
}

/// What a webhook delivery amounted to. The transport always acknowledges;
/// this only tells the caller whether state changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Confirmed(OrderId),
    Ignored,
}

/// Owns the payment record per order and drives the order status on
/// confirmation.
pub struct PaymentEngine {
    payments: PaymentStoreRef,
    orders: OrderStoreRef,
    users: UserDirectoryRef,
    notifier: NotifierRef,
}

impl PaymentEngine {
    pub fn new(
        payments: PaymentStoreRef,
        orders: OrderStoreRef,
        users: UserDirectoryRef,
        notifier: NotifierRef,
    ) -> Self {
        Self {
            payments,
            orders,
            users,
            notifier,
        }
    }

    /// Creates the pending payment for a pending order.
    ///
    /// Retry policy: a pending payment is returned as-is, a failed payment is
    /// replaced by a fresh record, and a successful payment rejects
    /// re-initiation.
    pub async fn initiate_payment(
        &self,
        order_id: OrderId,
        provider: Option<&str>,
    ) -> Result<Payment> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(CommerceError::NotFound("order"))?;

        if let Some(existing) = self.payments.get_by_order(order_id).await? {
            match existing.status {
                PaymentStatus::Pending => return Ok(existing),
                PaymentStatus::Success => {
                    return Err(CommerceError::InvalidState(format!(
                        "order {order_id} is already paid"
                    )));
                }
                PaymentStatus::Failed => {}
            }
        }

        if order.status != OrderStatus::Pending {
            return Err(CommerceError::InvalidState(format!(
                "order {order_id} is not in PENDING status"
            )));
        }

        let payment = Payment::new(order_id, order.total_amount, provider);
        self.payments.put(payment.clone()).await?;
        Ok(payment)
    }

    /// Reuses the order's payment, initiating one if needed, and describes it
    /// as a checkout session. Never mutates payment status.
    pub async fn create_payment_session(
        &self,
        order_id: OrderId,
        provider: &str,
    ) -> Result<PaymentSession> {
        let payment = match self.payments.get_by_order(order_id).await? {
            Some(payment) if payment.status != PaymentStatus::Failed => payment,
            _ => self.initiate_payment(order_id, Some(provider)).await?,
        };

        Ok(PaymentSession {
            order_id,
            amount: payment.amount,
            provider: payment.provider.clone(),
            status: payment.status,
            checkout_ref: format!("{}-{}", payment.provider.to_lowercase(), Uuid::new_v4()),
        })
    }

    /// Marks the payment successful and cascades the order to paid.
    ///
    /// A second confirm against an already-successful payment is rejected
    /// with `InvalidState`; the order stays paid either way. The status
    /// notification is best-effort.
    pub async fn confirm_payment(
        &self,
        order_id: OrderId,
        provider_payment_id: Option<String>,
    ) -> Result<Payment> {
        let mut payment = self
            .payments
            .get_by_order(order_id)
            .await?
            .ok_or(CommerceError::NotFound("payment"))?;
        payment.succeed(provider_payment_id)?;
        self.payments.put(payment.clone()).await?;

        let mut order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(CommerceError::NotFound("order"))?;
        order.status = OrderStatus::Paid;
        self.orders.put(order.clone()).await?;

        self.notify_status(order.user_id, order_id, order.status).await;
        Ok(payment)
    }

    /// Marks the payment failed. The order stays pending and is eligible for
    /// retry through a new initiation.
    pub async fn fail_payment(&self, order_id: OrderId) -> Result<Payment> {
        let mut payment = self
            .payments
            .get_by_order(order_id)
            .await?
            .ok_or(CommerceError::NotFound("payment"))?;
        payment.fail()?;
        self.payments.put(payment.clone()).await?;
        Ok(payment)
    }

    /// Ingests a provider webhook.
    ///
    /// Providers send unrelated events, so a payload without a usable
    /// `orderId` is a silent no-op rather than an error. Events that do carry
    /// one are treated as success notifications. There is no signature
    /// verification or event-type dispatch here; until that exists this path
    /// must not face untrusted callers.
    pub async fn handle_webhook(
        &self,
        provider: &str,
        payload: &serde_json::Value,
        _headers: &HashMap<String, String>,
    ) -> WebhookOutcome {
        let Some(order_id) = extract_order_id(payload) else {
            tracing::debug!(provider, "webhook without order reference ignored");
            return WebhookOutcome::Ignored;
        };

        let provider_payment_id = payload
            .get("providerPaymentId")
            .and_then(serde_json::Value::as_str)
            .map(String::from);

        tracing::warn!(provider, order_id, "confirming unverified webhook event");
        match self.confirm_payment(order_id, provider_payment_id).await {
            Ok(_) => WebhookOutcome::Confirmed(order_id),
            Err(err) => {
                tracing::warn!(provider, order_id, error = %err, "webhook not actionable");
                WebhookOutcome::Ignored
            }
        }
    }

    async fn notify_status(&self, user_id: UserId, order_id: OrderId, status: OrderStatus) {
        let email = match self.users.find_user(user_id).await {
            Ok(Some(user)) => user.email,
            Ok(None) => {
                tracing::warn!(user_id, order_id, "no user profile for status notification");
                return;
            }
            Err(err) => {
                tracing::warn!(user_id, order_id, error = %err, "user lookup failed for notification");
                return;
            }
        };
        if let Err(err) = self
            .notifier
            .send_status_update(&email, order_id, status)
            .await
        {
            tracing::warn!(order_id, error = %err, "status notification not sent");
        }
    }
}

/// Accepts the order reference as a JSON number or a numeric string.
fn extract_order_id(payload: &serde_json::Value) -> Option<OrderId> {
    let value = payload.get("orderId")?;
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Order, OrderItem};
    use crate::domain::ports::{OrderStore, PaymentStore};
    use crate::domain::product::UserProfile;
    use crate::infrastructure::in_memory::{
        InMemoryOrderStore, InMemoryPaymentStore, InMemoryUserDirectory,
    };
    use crate::infrastructure::notify::LogNotifier;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::Arc;

    struct World {
        engine: PaymentEngine,
        orders: Arc<InMemoryOrderStore>,
        payments: Arc<InMemoryPaymentStore>,
    }

    async fn world_with_order(order_id: OrderId) -> World {
        let orders = Arc::new(InMemoryOrderStore::new());
        let payments = Arc::new(InMemoryPaymentStore::new());
        let users = InMemoryUserDirectory::new();
        users
            .add_user(UserProfile {
                id: 1,
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
            })
            .await;

        let order = Order::new(
            order_id,
            1,
            vec![OrderItem {
                id: 1,
                product_id: 1,
                product_name: "Mouse".to_string(),
                quantity: 2,
                unit_price: dec!(10.00).try_into().unwrap(),
            }],
            Utc::now(),
        );
        orders.put(order).await.unwrap();

        let engine = PaymentEngine::new(
            payments.clone(),
            orders.clone(),
            Arc::new(users),
            Arc::new(LogNotifier::new()),
        );
        World {
            engine,
            orders,
            payments,
        }
    }

    #[tokio::test]
    async fn test_initiate_requires_pending_order() {
        let world = world_with_order(1).await;
        let payment = world.engine.initiate_payment(1, None).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, Money::new(dec!(20.00)));
        assert_eq!(payment.provider, "STRIPE");

        // An order that already left PENDING cannot start a payment.
        let world = world_with_order(3).await;
        let mut order = world.orders.get(3).await.unwrap().unwrap();
        order.status = OrderStatus::Cancelled;
        world.orders.put(order).await.unwrap();
        assert!(matches!(
            world.engine.initiate_payment(3, None).await,
            Err(CommerceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_initiate_unknown_order() {
        let world = world_with_order(1).await;
        assert!(matches!(
            world.engine.initiate_payment(99, None).await,
            Err(CommerceError::NotFound("order"))
        ));
    }

    #[tokio::test]
    async fn test_initiate_is_idempotent_while_pending() {
        let world = world_with_order(1).await;
        let first = world.engine.initiate_payment(1, Some("RAZORPAY")).await.unwrap();
        let second = world.engine.initiate_payment(1, Some("STRIPE")).await.unwrap();
        // The pending record is reused, not replaced.
        assert_eq!(second.provider, first.provider);
    }

    #[tokio::test]
    async fn test_reinitiation_replaces_failed_payment() {
        let world = world_with_order(1).await;
        world.engine.initiate_payment(1, None).await.unwrap();
        world.engine.fail_payment(1).await.unwrap();

        let retried = world.engine.initiate_payment(1, Some("RAZORPAY")).await.unwrap();
        assert_eq!(retried.status, PaymentStatus::Pending);
        assert_eq!(retried.provider, "RAZORPAY");
    }

    #[tokio::test]
    async fn test_confirm_cascades_order_to_paid() {
        let world = world_with_order(1).await;
        world.engine.initiate_payment(1, None).await.unwrap();
        let payment = world
            .engine
            .confirm_payment(1, Some("pay_123".to_string()))
            .await
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.provider_payment_id.as_deref(), Some("pay_123"));
        let order = world.orders.get(1).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_confirm_without_payment_is_not_found() {
        let world = world_with_order(1).await;
        assert!(matches!(
            world.engine.confirm_payment(1, None).await,
            Err(CommerceError::NotFound("payment"))
        ));
    }

    #[tokio::test]
    async fn test_second_confirm_is_rejected_but_order_stays_paid() {
        let world = world_with_order(1).await;
        world.engine.initiate_payment(1, None).await.unwrap();
        world.engine.confirm_payment(1, None).await.unwrap();

        assert!(matches!(
            world.engine.confirm_payment(1, None).await,
            Err(CommerceError::InvalidState(_))
        ));
        let order = world.orders.get(1).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_fail_payment_leaves_order_pending() {
        let world = world_with_order(1).await;
        world.engine.initiate_payment(1, None).await.unwrap();
        let payment = world.engine.fail_payment(1).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);

        let order = world.orders.get(1).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_session_is_non_mutating() {
        let world = world_with_order(1).await;
        let session = world
            .engine
            .create_payment_session(1, "RAZORPAY")
            .await
            .unwrap();
        assert_eq!(session.status, PaymentStatus::Pending);
        assert_eq!(session.amount, Money::new(dec!(20.00)));
        assert!(session.checkout_ref.starts_with("razorpay-"));

        // A second session reuses the same payment record.
        let again = world.engine.create_payment_session(1, "STRIPE").await.unwrap();
        assert_eq!(again.provider, "RAZORPAY");
        let payment = world.payments.get_by_order(1).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_webhook_without_order_id_is_ignored() {
        let world = world_with_order(1).await;
        world.engine.initiate_payment(1, None).await.unwrap();

        let outcome = world
            .engine
            .handle_webhook("stripe", &json!({"event": "ping"}), &HashMap::new())
            .await;
        assert_eq!(outcome, WebhookOutcome::Ignored);

        // No state change happened.
        let payment = world.payments.get_by_order(1).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_webhook_confirms_referenced_order() {
        let world = world_with_order(1).await;
        world.engine.initiate_payment(1, None).await.unwrap();

        let payload = json!({"orderId": 1, "providerPaymentId": "evt_77"});
        let outcome = world
            .engine
            .handle_webhook("stripe", &payload, &HashMap::new())
            .await;
        assert_eq!(outcome, WebhookOutcome::Confirmed(1));

        let order = world.orders.get(1).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        let payment = world.payments.get_by_order(1).await.unwrap().unwrap();
        assert_eq!(payment.provider_payment_id.as_deref(), Some("evt_77"));
    }

    #[tokio::test]
    async fn test_webhook_with_unknown_order_is_ignored() {
        let world = world_with_order(1).await;
        let outcome = world
            .engine
            .handle_webhook("stripe", &json!({"orderId": "999"}), &HashMap::new())
            .await;
        assert_eq!(outcome, WebhookOutcome::Ignored);
    }

    #[test]
    fn test_extract_order_id_accepts_number_or_string() {
        assert_eq!(extract_order_id(&json!({"orderId": 5})), Some(5));
        assert_eq!(extract_order_id(&json!({"orderId": "5"})), Some(5));
        assert_eq!(extract_order_id(&json!({"orderId": "abc"})), None);
        assert_eq!(extract_order_id(&json!({"other": 5})), None);
    }
}

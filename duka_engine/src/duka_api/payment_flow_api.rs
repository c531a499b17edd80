use std::{fmt::Debug, sync::Arc};

use log::*;
use serde_json::Value;

use crate::{
    db_types::{NewPayment, OrderLine, OrderStatusType, Payment, PaymentMethod, PaymentStatus, User},
    events::EventProducers,
    gateways::PaymentGateways,
    order_flow_api::require_elevated,
    order_objects::normalize_lines,
    payment_objects::{CheckoutResult, PaymentQueryFilter, Settlement, SettlementOutcome},
    traits::{
        CallbackAck,
        InitiateRequest,
        OrderManagement,
        PaymentGateway,
        PaymentManagement,
        SettlePaymentResult,
        ShopError,
    },
};

/// `PaymentFlowApi` takes payments for orders through the configured mobile-money gateways and reconciles the
/// asynchronous results, whether they arrive as provider callbacks or as a manual reconciliation by staff.
///
/// Provider calls are never made inside a database transaction. A payment is persisted as `pending` first, the
/// provider is called, and the outcome is written in a second short transaction.
pub struct PaymentFlowApi<B> {
    db: B,
    gateways: PaymentGateways,
    producers: EventProducers,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi({:?})", self.gateways)
    }
}

impl<B> PaymentFlowApi<B> {
    pub fn new(db: B, gateways: PaymentGateways, producers: EventProducers) -> Self {
        Self { db, gateways, producers }
    }

    pub fn gateways(&self) -> &PaymentGateways {
        &self.gateways
    }

    /// The provider-specific body to send back to a callback.
    pub fn acknowledgement(&self, method: PaymentMethod, ack: &CallbackAck) -> Value {
        self.gateways.acknowledge(method, ack)
    }
}

impl<B> PaymentFlowApi<B>
where B: OrderManagement + PaymentManagement
{
    /// Creates the order and starts a payment for it in one go.
    ///
    /// The payment method and phone number are validated before anything is written. If the provider then refuses
    /// or cannot be reached, the order is kept and the returned payment is `failed`, so the customer can retry
    /// with [`Self::initiate_for_order`].
    pub async fn checkout(
        &self,
        user: &User,
        method: PaymentMethod,
        phone: &str,
        lines: &[OrderLine],
    ) -> Result<CheckoutResult, ShopError> {
        let gateway = self.gateways.get(method)?;
        let phone = gateway.normalize_phone(phone)?;
        let lines = normalize_lines(lines).map_err(ShopError::ValidationError)?;
        let event = self.db.create_order(user, &lines).await?;
        self.producers.publish_order_created(&event).await;
        let order_id = event.order.id();
        let payment = self.new_payment(order_id, user, method, phone).await?;
        let payment = self.start_charge(gateway, payment).await?;
        info!("🔄️💳️ Checkout for order #{order_id} complete. Payment #{} is {}", payment.id, payment.status);
        Ok(CheckoutResult { order_id, payment })
    }

    /// Starts a new payment for an existing `pending` order. The amount is always the order total.
    ///
    /// Customers can only pay for their own orders. Gateway failures are not errors: the payment is returned with a
    /// `failed` status and the provider's reason in `result_desc`.
    pub async fn initiate_for_order(
        &self,
        order_id: i64,
        user: &User,
        method: PaymentMethod,
        phone: &str,
    ) -> Result<Payment, ShopError> {
        let gateway = self.gateways.get(method)?;
        let phone = gateway.normalize_phone(phone)?;
        let order = self.db.fetch_order(order_id).await?.ok_or(ShopError::OrderNotFound(order_id))?;
        if order.order.user_id != user.id && !user.has_elevated_role() {
            return Err(ShopError::OrderNotFound(order_id));
        }
        if order.status() != OrderStatusType::Pending {
            return Err(ShopError::InvalidTransition(format!(
                "Order #{order_id} is {}. Only pending orders can be paid for",
                order.status()
            )));
        }
        let payment = self.new_payment(order_id, user, method, phone).await?;
        self.start_charge(gateway, payment).await
    }

    async fn new_payment(
        &self,
        order_id: i64,
        user: &User,
        method: PaymentMethod,
        phone: String,
    ) -> Result<Payment, ShopError> {
        let payment = NewPayment { order_id, user_id: user.id, payment_method: method, phone_number: phone };
        self.db.insert_payment(payment).await
    }

    async fn start_charge(&self, gateway: Arc<dyn PaymentGateway>, payment: Payment) -> Result<Payment, ShopError> {
        let request = InitiateRequest {
            payment_id: payment.id,
            phone: payment.phone_number.clone(),
            amount: payment.amount,
            reference: format!("ORDER-{}", payment.order_id),
            description: format!("Payment for order #{}", payment.order_id),
        };
        match gateway.initiate(&request).await {
            Ok(correlation) => {
                debug!("🔄️💳️ Payment #{} was accepted by {}", payment.id, payment.payment_method);
                match self.db.record_correlation(payment.id, &correlation).await {
                    // The callback got here first
                    Err(ShopError::InvalidTransition(_)) => {
                        info!("🔄️💳️ Payment #{} was settled before {} replied", payment.id, payment.payment_method);
                        self.db.fetch_payment(payment.id).await?.ok_or(ShopError::PaymentNotFound(payment.id))
                    },
                    result => result,
                }
            },
            Err(e) => {
                warn!("🔄️💳️ Could not initiate payment #{} with {}. {e}", payment.id, payment.payment_method);
                let event = self.db.record_initiation_failure(payment.id, &e.to_string()).await?;
                self.producers.publish_payment_settled(&event).await;
                Ok(event.payment)
            },
        }
    }

    /// Applies a provider callback. This never fails: whatever happens, the provider gets an acknowledgement, and
    /// the details of any problem are only logged.
    ///
    /// * Unknown payments and malformed payloads are acknowledged as rejected. Nothing is written.
    /// * A payment that is already `completed` or `failed` is left alone and the callback is accepted, so duplicate
    ///   deliveries are harmless.
    /// * Otherwise the payment is settled, and its order is moved to `paid` (or back to `pending` on failure) in the
    ///   same transaction.
    pub async fn apply_callback(&self, method: PaymentMethod, raw: &Value) -> CallbackAck {
        let gateway = match self.gateways.get(method) {
            Ok(g) => g,
            Err(e) => {
                error!("🔄️📞️ Received a {method} callback, but {e}");
                return CallbackAck::rejected(e.to_string());
            },
        };
        let result = match gateway.describe_callback(raw) {
            Ok(r) => r,
            Err(e) => {
                warn!("🔄️📞️ Ignoring malformed {method} callback. {e}. Payload: {raw}");
                return CallbackAck::rejected(format!("Malformed callback. {e}"));
            },
        };
        let correlation_id = result.correlation_id.clone();
        let payment = match self.db.fetch_payment_by_correlation_id(method, &correlation_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                warn!("🔄️📞️ {method} callback for {correlation_id} does not match any payment");
                return CallbackAck::rejected(format!("Unknown payment {correlation_id}"));
            },
            Err(e) => {
                error!("🔄️📞️ Could not look up the payment for {method} callback {correlation_id}. {e}");
                return CallbackAck::rejected("Internal error while processing the callback");
            },
        };
        match self.db.settle_payment(payment.id, Settlement::from(result), None).await {
            Ok(SettlePaymentResult::AlreadySettled(p)) => {
                info!("🔄️📞️ Duplicate {method} callback for payment #{}. It is already {}", p.id, p.status);
                CallbackAck::accepted(format!("Payment already {}", p.status))
            },
            Ok(SettlePaymentResult::Settled(event)) => {
                let payment = &event.payment;
                info!("🔄️📞️ Payment #{} is {} after {method} callback", payment.id, payment.status);
                self.producers.publish_payment_settled(&event).await;
                CallbackAck::accepted("Accepted")
            },
            Err(e) => {
                error!("🔄️📞️ Could not settle payment #{} from {method} callback. {e}", payment.id);
                CallbackAck::rejected("Internal error while processing the callback")
            },
        }
    }

    /// Settles a payment by hand when the provider callback was lost. Staff only. `status` must be `completed` or
    /// `failed`. A payment that is already settled (say, a callback won the race) is rejected.
    pub async fn manual_reconcile(
        &self,
        payment_id: i64,
        status: &str,
        transaction_id: Option<String>,
        acting_user: &User,
    ) -> Result<Payment, ShopError> {
        require_elevated(acting_user, "reconcile payments")?;
        let status = status.parse::<PaymentStatus>().map_err(|e| ShopError::ValidationError(e.to_string()))?;
        let outcome = SettlementOutcome::try_from(status).map_err(ShopError::ValidationError)?;
        let message = format!("Manually reconciled as {status} by {}", acting_user.username);
        let settlement = match outcome {
            SettlementOutcome::Completed => Settlement::completed(transaction_id, message),
            SettlementOutcome::Failed => Settlement::failed(message),
        };
        match self.db.settle_payment(payment_id, settlement, Some(acting_user)).await? {
            SettlePaymentResult::AlreadySettled(p) => {
                Err(ShopError::InvalidTransition(format!("Payment #{payment_id} is already {}", p.status)))
            },
            SettlePaymentResult::Settled(event) => {
                info!("🔄️🧾️ Payment #{payment_id} reconciled as {status} by {}", acting_user.username);
                self.producers.publish_payment_settled(&event).await;
                Ok(event.payment)
            },
        }
    }

    /// A payment, as seen by the customer who made it. Anyone else gets `PaymentNotFound`.
    pub async fn payment_for_user(&self, payment_id: i64, user: &User) -> Result<Payment, ShopError> {
        match self.db.fetch_payment(payment_id).await? {
            Some(p) if p.user_id == user.id => Ok(p),
            _ => Err(ShopError::PaymentNotFound(payment_id)),
        }
    }

    pub async fn payment(&self, payment_id: i64, acting_user: &User) -> Result<Payment, ShopError> {
        require_elevated(acting_user, "view payments")?;
        self.db.fetch_payment(payment_id).await?.ok_or(ShopError::PaymentNotFound(payment_id))
    }

    pub async fn payments(&self, filter: PaymentQueryFilter, acting_user: &User) -> Result<Vec<Payment>, ShopError> {
        require_elevated(acting_user, "view payments")?;
        self.db.fetch_payments(filter).await
    }
}

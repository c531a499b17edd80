use crate::{
    db_types::{NewPayment, Payment, PaymentMethod, ProviderCorrelation, User},
    events::PaymentSettledEvent,
    payment_objects::{PaymentQueryFilter, Settlement},
    traits::{SettlePaymentResult, ShopError},
};

/// Payment storage and reconciliation.
///
/// A payment is created `pending` before the provider is contacted, so it may exist without any correlation ids.
/// Provider calls never happen inside these methods.
#[allow(async_fn_in_trait)]
pub trait PaymentManagement: Clone {
    /// Stores a new `pending` payment for the order. The amount is the order total at this moment. Fails with
    /// `InvalidTransition` if the order is not `pending`.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, ShopError>;

    /// Stores the correlation ids returned by the provider on a pending payment.
    async fn record_correlation(&self, payment_id: i64, correlation: &ProviderCorrelation)
        -> Result<Payment, ShopError>;

    /// Marks a pending payment as failed because the provider could not be reached or refused the charge. The order
    /// is left untouched.
    async fn record_initiation_failure(&self, payment_id: i64, reason: &str) -> Result<PaymentSettledEvent, ShopError>;

    async fn fetch_payment(&self, id: i64) -> Result<Option<Payment>, ShopError>;

    async fn fetch_payment_by_correlation_id(
        &self,
        method: PaymentMethod,
        correlation_id: &str,
    ) -> Result<Option<Payment>, ShopError>;

    async fn fetch_payments(&self, filter: PaymentQueryFilter) -> Result<Vec<Payment>, ShopError>;

    /// Settles a pending payment and advances its order in one transaction.
    ///
    /// * Completed: the payment stores the settled transaction id and a `pending` order becomes `paid`.
    /// * Failed: a `paid` order with no other completed payment goes back to `pending`.
    ///
    /// If the payment is already terminal, nothing is written and [`SettlePaymentResult::AlreadySettled`] is
    /// returned. Stock is never touched.
    async fn settle_payment(
        &self,
        payment_id: i64,
        settlement: Settlement,
        acting_user: Option<&User>,
    ) -> Result<SettlePaymentResult, ShopError>;
}

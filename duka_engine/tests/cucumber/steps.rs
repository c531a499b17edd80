use cucumber::{then, when};
use duka_engine::{
    db_types::{Money, OrderLine, OrderStatusType, PaymentMethod, PaymentStatus},
    payment_objects::PaymentQueryFilter,
    test_utils::fake_gateway::{airtel_callback, mpesa_callback},
    traits::AuditQueryFilter,
    AuditManagement,
    CatalogManagement,
    OrderManagement,
    PaymentManagement,
    ShopError,
};

use crate::cucumber::ShopWorld;

#[when(expr = "{word} orders {int} of {string}")]
async fn place_order(world: &mut ShopWorld, name: String, quantity: i64, variant: String) {
    let user = world.user(&name);
    let lines = [OrderLine::new(world.variant(&variant), quantity)];
    let result = world.system().orders.create_order(&user, &lines).await;
    if let Some(order) = world.record(result) {
        world.order_id = Some(order.id());
    }
}

#[when(expr = "{word} sets the order status to {string}")]
async fn set_status(world: &mut ShopWorld, name: String, status: String) {
    let user = world.user(&name);
    let result = world.system().orders.set_status(world.order_id(), &status, &user).await;
    world.record(result);
}

#[when(expr = "{word} cancels the order")]
async fn cancel_order(world: &mut ShopWorld, name: String) {
    let user = world.user(&name);
    let result = world.system().orders.cancel(world.order_id(), &user).await;
    world.record(result);
}

#[when(expr = "{word} restocks {string} with {int} units")]
async fn restock(world: &mut ShopWorld, name: String, variant: String, amount: i64) {
    let user = world.user(&name);
    let variant_id = world.variant(&variant);
    let product_id = fetch_variant_stock(world, variant_id).await.0;
    let result = world.system().catalog.restock(product_id, variant_id, amount, &user).await;
    world.record(result);
}

#[when(expr = "{word} checks out {int} of {string} with {word} from {string}")]
async fn checkout(world: &mut ShopWorld, name: String, quantity: i64, variant: String, method: String, phone: String) {
    let user = world.user(&name);
    let method = method.parse::<PaymentMethod>().expect("Invalid payment method");
    let lines = [OrderLine::new(world.variant(&variant), quantity)];
    let result = world.system().payments.checkout(&user, method, &phone, &lines).await;
    if let Some(checkout) = world.record(result) {
        world.order_id = Some(checkout.order_id);
        world.payment_id = Some(checkout.payment.id);
    }
}

#[when(expr = "{word} retries payment with {word} from {string}")]
async fn retry_payment(world: &mut ShopWorld, name: String, method: String, phone: String) {
    let user = world.user(&name);
    let method = method.parse::<PaymentMethod>().expect("Invalid payment method");
    let result = world.system().payments.initiate_for_order(world.order_id(), &user, method, &phone).await;
    if let Some(payment) = world.record(result) {
        world.payment_id = Some(payment.id);
    }
}

#[when(expr = "M-Pesa calls back for {string} with receipt {string}")]
async fn mpesa_success_callback(world: &mut ShopWorld, checkout_id: String, receipt: String) {
    let payload = mpesa_callback(&checkout_id, 0, Some(&receipt));
    let ack = world.system().payments.apply_callback(PaymentMethod::Mpesa, &payload).await;
    world.last_ack = Some(ack);
}

#[when(expr = "M-Pesa reports that {string} failed")]
async fn mpesa_failed_callback(world: &mut ShopWorld, checkout_id: String) {
    let payload = mpesa_callback(&checkout_id, 1032, None);
    let ack = world.system().payments.apply_callback(PaymentMethod::Mpesa, &payload).await;
    world.last_ack = Some(ack);
}

#[when(expr = "Airtel calls back for the payment with id {string}")]
async fn airtel_success_callback(world: &mut ShopWorld, airtel_money_id: String) {
    let payload = airtel_callback(&format!("TXN-{}", world.payment_id()), true, Some(&airtel_money_id));
    let ack = world.system().payments.apply_callback(PaymentMethod::Airtel, &payload).await;
    world.last_ack = Some(ack);
}

#[when(expr = "{word} reconciles the payment as {string}")]
async fn reconcile(world: &mut ShopWorld, name: String, status: String) {
    let user = world.user(&name);
    let result = world.system().payments.manual_reconcile(world.payment_id(), &status, None, &user).await;
    world.record(result);
}

async fn fetch_variant_stock(world: &ShopWorld, variant_id: i64) -> (i64, i64) {
    let variant = world.system().db.fetch_variant(variant_id).await.expect("Error fetching variant");
    let variant = variant.expect("Variant does not exist");
    (variant.product_id, variant.stock)
}

#[then(expr = "variant {string} has {int} in stock")]
async fn check_stock(world: &mut ShopWorld, variant: String, stock: i64) {
    let (_, actual) = fetch_variant_stock(world, world.variant(&variant)).await;
    assert_eq!(actual, stock, "Stock level for {variant} is incorrect");
}

#[then(expr = "the order total is {word}")]
async fn check_order_total(world: &mut ShopWorld, total: String) {
    let order = world.system().db.fetch_order(world.order_id()).await.expect("Error fetching order");
    let order = order.expect("Order does not exist");
    let expected = total.parse::<Money>().expect("Invalid amount");
    assert_eq!(order.order.total_price, expected);
    assert_eq!(order.items_total(), expected);
}

#[then(expr = "the order status is {string}")]
async fn check_order_status(world: &mut ShopWorld, status: String) {
    let order = world.system().db.fetch_order(world.order_id()).await.expect("Error fetching order");
    let order = order.expect("Order does not exist");
    let expected = status.parse::<OrderStatusType>().expect("Invalid status");
    assert_eq!(order.status(), expected);
}

#[then(expr = "{word} has {int} order(s)")]
async fn check_order_count(world: &mut ShopWorld, name: String, count: usize) {
    let user = world.user(&name);
    let orders = world.system().orders.orders_for_user(&user, None).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count);
}

#[then(expr = "the order has {int} audit entry/entries")]
async fn check_audit_entries(world: &mut ShopWorld, count: usize) {
    let filter = AuditQueryFilter::default().with_order_id(world.order_id());
    let entries = world.system().db.fetch_audit_entries(filter).await.expect("Error fetching audit log");
    assert_eq!(entries.len(), count, "Audit log: {entries:#?}");
}

#[then(expr = "the request fails with insufficient stock for {string}")]
async fn check_insufficient_stock(world: &mut ShopWorld, variant: String) {
    let expected_id = world.variant(&variant);
    match &world.last_error {
        Some(ShopError::InsufficientStock { variant_id, .. }) => assert_eq!(*variant_id, expected_id),
        other => panic!("Expected InsufficientStock, got {other:?}"),
    }
}

#[then("the request fails with an invalid transition")]
async fn check_invalid_transition(world: &mut ShopWorld) {
    let err = world.last_error.as_ref().expect("The request succeeded");
    assert!(err.is_invalid_transition(), "Expected an invalid transition, got {err:?}");
}

#[then("the request is denied")]
async fn check_denied(world: &mut ShopWorld) {
    assert!(matches!(world.last_error, Some(ShopError::PermissionDenied(_))), "Got {:?}", world.last_error);
}

#[then("the request fails validation")]
async fn check_validation(world: &mut ShopWorld) {
    assert!(matches!(world.last_error, Some(ShopError::ValidationError(_))), "Got {:?}", world.last_error);
}

#[then("the request succeeds")]
async fn check_success(world: &mut ShopWorld) {
    assert!(world.last_error.is_none(), "Got {:?}", world.last_error);
}

#[then(expr = "the payment status is {string}")]
async fn check_payment_status(world: &mut ShopWorld, status: String) {
    let payment = world.system().db.fetch_payment(world.payment_id()).await.expect("Error fetching payment");
    let payment = payment.expect("Payment does not exist");
    let expected = status.parse::<PaymentStatus>().expect("Invalid status");
    assert_eq!(payment.status, expected, "Payment: {payment:?}");
}

#[then(expr = "the payment amount is {word}")]
async fn check_payment_amount(world: &mut ShopWorld, amount: String) {
    let payment = world.system().db.fetch_payment(world.payment_id()).await.expect("Error fetching payment");
    let payment = payment.expect("Payment does not exist");
    assert_eq!(payment.amount, amount.parse::<Money>().expect("Invalid amount"));
}

#[then(expr = "the payment transaction id is {string}")]
async fn check_payment_tx_id(world: &mut ShopWorld, tx_id: String) {
    let payment = world.system().db.fetch_payment(world.payment_id()).await.expect("Error fetching payment");
    let payment = payment.expect("Payment does not exist");
    assert_eq!(payment.transaction_id.as_deref(), Some(tx_id.as_str()));
}

#[then("the callback is accepted")]
async fn check_callback_accepted(world: &mut ShopWorld) {
    let ack = world.last_ack.as_ref().expect("No callback was sent");
    assert!(ack.accepted, "Callback was rejected: {}", ack.message);
}

#[then("the callback is rejected")]
async fn check_callback_rejected(world: &mut ShopWorld) {
    let ack = world.last_ack.as_ref().expect("No callback was sent");
    assert!(!ack.accepted, "Callback was accepted: {}", ack.message);
}

#[then("there are no payments")]
async fn check_no_payments(world: &mut ShopWorld) {
    let payments = world.system().db.fetch_payments(PaymentQueryFilter::default()).await.expect("Error");
    assert!(payments.is_empty());
}

#[then(expr = "M-Pesa was asked to charge {word}")]
async fn check_charge_amount(world: &mut ShopWorld, amount: String) {
    let requests = world.system().mpesa.requests();
    let last = requests.last().expect("M-Pesa was never called");
    assert_eq!(last.amount, amount.parse::<Money>().expect("Invalid amount"));
    assert_eq!(last.phone, "254712345678");
}

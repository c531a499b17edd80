use std::sync::Arc;

use actix_web::http::StatusCode;
use duka_engine::{
    db_types::{Money, Payment, PaymentMethod, PaymentStatus, ProductVariant, ProviderCorrelation},
    traits::GatewayError,
};
use serde_json::{json, Value};

use super::{
    helpers::{json, TestShop},
    mocks::MockGateway,
};
use crate::data_objects::CheckoutResponse;

fn checkout_body(method: &str, variant: &ProductVariant, quantity: i64) -> Value {
    json!({
        "payment_method": method,
        "phone_number": "0712 345 678",
        "cart_items": [{"variant_id": variant.id, "quantity": quantity}],
    })
}

async fn payment_status(shop: &TestShop, payment_id: i64) -> Payment {
    let (status, body) = shop.get(&shop.customer, &format!("/api/payments/{payment_id}/status")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    serde_json::from_str(&body).unwrap()
}

async fn order_status(shop: &TestShop, order_id: i64) -> String {
    let (_, body) = shop.get(&shop.customer, &format!("/api/orders/{order_id}")).await;
    json(&body)["status"].as_str().unwrap().to_string()
}

#[actix_web::test]
async fn checkout_with_mpesa() {
    let shop = TestShop::new().await;
    let variant = shop.add_variant("Kanga", Money::from_cents(1250), 10).await;
    let (status, body) = shop.post(&shop.customer, "/api/payments/initiate", checkout_body("mpesa", &variant, 2)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: CheckoutResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success);

    let requests = shop.mpesa.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].phone, "254712345678");
    assert_eq!(requests[0].amount, Money::from_units(25));
    assert_eq!(requests[0].payment_id, response.payment_id);

    let payment = payment_status(&shop, response.payment_id).await;
    assert_eq!(payment.order_id, response.order_id);
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, Money::from_units(25));
    assert_eq!(payment.checkout_request_id, Some(format!("ws_CO_{}", payment.id)));
    assert_eq!(order_status(&shop, response.order_id).await, "pending");
}

#[actix_web::test]
async fn checkout_when_the_provider_is_down() {
    let shop = TestShop::new().await;
    let variant = shop.add_variant("Kanga", Money::from_units(15), 10).await;
    shop.mpesa.push_response(Err(GatewayError::Unavailable("Connection timed out".into())));
    let (status, body) = shop.post(&shop.customer, "/api/payments/initiate", checkout_body("mpesa", &variant, 1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let response: CheckoutResponse = serde_json::from_str(&body).unwrap();
    assert!(!response.success);
    assert!(response.message.contains("Connection timed out"), "{}", response.message);

    // The order survives, so the customer can try again
    let payment = payment_status(&shop, response.payment_id).await;
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert_eq!(order_status(&shop, response.order_id).await, "pending");

    let path = format!("/api/orders/{}/pay", response.order_id);
    let body = json!({"payment_method": "mpesa", "phone_number": "+254712345678"});
    let (status, body) = shop.post(&shop.customer, &path, body).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let retry: Payment = serde_json::from_str(&body).unwrap();
    assert_ne!(retry.id, response.payment_id);
    assert_eq!(retry.status, PaymentStatus::Pending);
    assert_eq!(retry.amount, Money::from_units(15));
}

#[actix_web::test]
async fn checkout_validates_before_creating_anything() {
    let shop = TestShop::new().await;
    let variant = shop.add_variant("Kanga", Money::from_units(15), 10).await;
    let (status, body) =
        shop.post(&shop.customer, "/api/payments/initiate", checkout_body("paypal", &variant, 1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("paypal"));

    let mut body = checkout_body("mpesa", &variant, 1);
    body["phone_number"] = json!("12");
    let (status, body) = shop.post(&shop.customer, "/api/payments/initiate", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Invalid request. Invalid phone number"));

    let (status, _) = shop.post(&shop.customer, "/api/payments/initiate", checkout_body("mpesa", &variant, 11)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = shop.get(&shop.customer, "/api/orders").await;
    assert_eq!(json(&body), json!([]));
    assert!(shop.mpesa.requests().is_empty());
}

#[actix_web::test]
async fn provider_rejections_are_reported() {
    let mut airtel = MockGateway::new();
    airtel.expect_method().return_const(PaymentMethod::Airtel);
    airtel.expect_normalize_phone().returning(|_| Ok("254733000111".to_string()));
    airtel
        .expect_initiate()
        .times(1)
        .returning(|_| Err(GatewayError::Rejected("Subscriber has insufficient funds (DP00800001007)".into())));
    let shop = TestShop::new().await.with_gateway(Arc::new(airtel));
    let variant = shop.add_variant("Kanga", Money::from_units(15), 10).await;

    let (status, body) =
        shop.post(&shop.customer, "/api/payments/initiate", checkout_body("airtel", &variant, 1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let response: CheckoutResponse = serde_json::from_str(&body).unwrap();
    assert!(response.message.contains("insufficient funds"), "{}", response.message);
    let payment = payment_status(&shop, response.payment_id).await;
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert_eq!(payment.phone_number, "254733000111");
}

#[actix_web::test]
async fn airtel_payments_use_the_transaction_reference() {
    let shop = TestShop::new().await;
    let variant = shop.add_variant("Kanga", Money::from_units(15), 10).await;
    let (status, body) =
        shop.post(&shop.customer, "/api/payments/initiate", checkout_body("airtel", &variant, 1)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: CheckoutResponse = serde_json::from_str(&body).unwrap();
    let payment = payment_status(&shop, response.payment_id).await;
    assert_eq!(payment.payment_method, PaymentMethod::Airtel);
    let expected = ProviderCorrelation::Generic { transaction_ref: format!("TXN-{}", payment.id) };
    assert_eq!(payment.correlation(), Some(expected));
    assert_eq!(shop.airtel.requests().len(), 1);
}

#[actix_web::test]
async fn payments_are_private() {
    let shop = TestShop::new().await;
    let variant = shop.add_variant("Kanga", Money::from_units(15), 10).await;
    let (_, body) = shop.post(&shop.customer, "/api/payments/initiate", checkout_body("mpesa", &variant, 1)).await;
    let response: CheckoutResponse = serde_json::from_str(&body).unwrap();
    let path = format!("/api/payments/{}/status", response.payment_id);
    let (status, body) = shop.get(&shop.other_customer, &path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], format!("Payment #{} does not exist", response.payment_id));

    let path = format!("/api/orders/{}/pay", response.order_id);
    let body = json!({"payment_method": "mpesa", "phone_number": "0712345678"});
    let (status, _) = shop.post(&shop.other_customer, &path, body).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn manual_reconciliation() {
    let shop = TestShop::new().await;
    let variant = shop.add_variant("Kanga", Money::from_units(15), 10).await;
    let (_, body) = shop.post(&shop.customer, "/api/payments/initiate", checkout_body("mpesa", &variant, 1)).await;
    let response: CheckoutResponse = serde_json::from_str(&body).unwrap();
    let path = format!("/api/admin/payments/{}/reconcile", response.payment_id);

    let body = json!({"status": "completed", "transaction_id": "QGH7X2K9LP"});
    let (status, _) = shop.post(&shop.customer, &path, body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = shop.post(&shop.staff, &path, json!({"status": "pending"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = shop.post(&shop.staff, &path, body).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let payment: Payment = serde_json::from_str(&body).unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.transaction_id.as_deref(), Some("QGH7X2K9LP"));
    assert_eq!(order_status(&shop, response.order_id).await, "paid");

    // Settled payments stay settled
    let (status, body) = shop.post(&shop.staff, &path, json!({"status": "failed"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        json(&body)["error"],
        format!("Invalid state transition. Payment #{} is already completed", response.payment_id)
    );

    // A paid order cannot be paid for again
    let path = format!("/api/orders/{}/pay", response.order_id);
    let body = json!({"payment_method": "mpesa", "phone_number": "0712345678"});
    let (status, _) = shop.post(&shop.customer, &path, body).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn staff_payment_queries() {
    let shop = TestShop::new().await;
    let variant = shop.add_variant("Kanga", Money::from_units(15), 10).await;
    shop.mpesa.push_response(Err(GatewayError::Rejected("Invalid account".into())));
    let (_, body) = shop.post(&shop.customer, "/api/payments/initiate", checkout_body("mpesa", &variant, 1)).await;
    let failed: CheckoutResponse = serde_json::from_str(&body).unwrap();
    let (_, body) = shop.post(&shop.customer, "/api/payments/initiate", checkout_body("airtel", &variant, 1)).await;
    let pending: CheckoutResponse = serde_json::from_str(&body).unwrap();

    let (status, body) = shop.get(&shop.staff, "/api/admin/payments").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body).as_array().unwrap().len(), 2);

    let (_, body) = shop.get(&shop.staff, "/api/admin/payments?status=failed").await;
    let payments: Vec<Payment> = serde_json::from_str(&body).unwrap();
    assert_eq!(payments.iter().map(|p| p.id).collect::<Vec<_>>(), vec![failed.payment_id]);

    let (_, body) = shop.get(&shop.admin, "/api/admin/payments?method=airtel").await;
    let payments: Vec<Payment> = serde_json::from_str(&body).unwrap();
    assert_eq!(payments.iter().map(|p| p.id).collect::<Vec<_>>(), vec![pending.payment_id]);

    let path = format!("/api/admin/payments?order_id={}", pending.order_id);
    let (_, body) = shop.get(&shop.staff, &path).await;
    assert_eq!(json(&body).as_array().unwrap().len(), 1);

    let (status, _) = shop.get(&shop.staff, "/api/admin/payments?method=paypal").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = shop.get(&shop.customer, "/api/admin/payments").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = shop.get(&shop.staff, &format!("/api/admin/payments/{}", failed.payment_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["result_desc"].as_str().map(|s| s.contains("Invalid account")), Some(true));
    let (status, _) = shop.get(&shop.staff, "/api/admin/payments/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

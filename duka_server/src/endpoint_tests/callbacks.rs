use actix_web::http::StatusCode;
use duka_engine::{
    db_types::{AuditAction, AuditEntry, Money, Payment, PaymentStatus},
    test_utils::fake_gateway::{airtel_callback, mpesa_callback},
};
use serde_json::json;

use super::helpers::{json, TestShop};
use crate::data_objects::CheckoutResponse;

async fn checkout(shop: &TestShop, method: &str) -> CheckoutResponse {
    let variant = shop.add_variant("Kitenge", Money::from_units(120), 3).await;
    let body = json!({
        "payment_method": method,
        "phone_number": "0712345678",
        "cart_items": [{"variant_id": variant.id, "quantity": 1}],
    });
    let (status, body) = shop.post(&shop.customer, "/api/payments/initiate", body).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    serde_json::from_str(&body).unwrap()
}

async fn payment(shop: &TestShop, payment_id: i64) -> Payment {
    let (_, body) = shop.get(&shop.staff, &format!("/api/admin/payments/{payment_id}")).await;
    serde_json::from_str(&body).unwrap()
}

async fn order_status(shop: &TestShop, order_id: i64) -> String {
    let (_, body) = shop.get(&shop.staff, &format!("/api/orders/{order_id}")).await;
    json(&body)["status"].as_str().unwrap().to_string()
}

#[actix_web::test]
async fn successful_mpesa_callback() {
    let shop = TestShop::new().await;
    let checkout = checkout(&shop, "mpesa").await;
    let callback = mpesa_callback(&format!("ws_CO_{}", checkout.payment_id), 0, Some("NLJ7RT61SV"));

    let (status, body) = shop.callback("/callbacks/mpesa", &callback.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"ResultCode": 0, "ResultDesc": "Accepted"}));

    let payment = payment(&shop, checkout.payment_id).await;
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.transaction_id.as_deref(), Some("NLJ7RT61SV"));
    assert_eq!(order_status(&shop, checkout.order_id).await, "paid");
}

#[actix_web::test]
async fn duplicate_callbacks_are_harmless() {
    let shop = TestShop::new().await;
    let checkout = checkout(&shop, "mpesa").await;
    let callback = mpesa_callback(&format!("ws_CO_{}", checkout.payment_id), 0, Some("NLJ7RT61SV")).to_string();
    let (status, _) = shop.callback("/callbacks/mpesa", &callback).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = shop.callback("/callbacks/mpesa", &callback).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"ResultCode": 0, "ResultDesc": "Payment already completed"}));

    // A late failure does not undo the settlement either
    let late_failure = mpesa_callback(&format!("ws_CO_{}", checkout.payment_id), 1032, None).to_string();
    let (status, _) = shop.callback("/callbacks/mpesa", &late_failure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payment(&shop, checkout.payment_id).await.status, PaymentStatus::Completed);
    assert_eq!(order_status(&shop, checkout.order_id).await, "paid");

    let path = format!("/api/audit?order_id={}&action=payment_update", checkout.order_id);
    let (_, body) = shop.get(&shop.staff, &path).await;
    let entries: Vec<AuditEntry> = serde_json::from_str(&body).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action_type, AuditAction::PaymentUpdate);
    assert_eq!(entries[0].user_id, None);
}

#[actix_web::test]
async fn cancelled_mpesa_payment() {
    let shop = TestShop::new().await;
    let checkout = checkout(&shop, "mpesa").await;
    let callback = mpesa_callback(&format!("ws_CO_{}", checkout.payment_id), 1032, None);
    let (status, body) = shop.callback("/callbacks/mpesa", &callback.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["ResultCode"], 0);

    let payment = payment(&shop, checkout.payment_id).await;
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert_eq!(payment.result_desc.as_deref(), Some("Request cancelled by user"));
    assert_eq!(order_status(&shop, checkout.order_id).await, "pending");
}

#[actix_web::test]
async fn callbacks_for_unknown_payments() {
    let shop = TestShop::new().await;
    let callback = mpesa_callback("ws_CO_unknown", 0, Some("NLJ7RT61SV"));
    let (status, body) = shop.callback("/callbacks/mpesa", &callback.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"ResultCode": 1, "ResultDesc": "Unknown payment ws_CO_unknown"}));
}

#[actix_web::test]
async fn malformed_callbacks_still_get_a_200() {
    let shop = TestShop::new().await;
    let (status, body) = shop.callback("/callbacks/mpesa", "<xml>definitely not json</xml>").await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["ResultCode"], 1);
    assert!(body["ResultDesc"].as_str().unwrap().starts_with("Malformed callback."));

    let (status, body) = shop.callback("/callbacks/mpesa", r#"{"Body": {}}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["ResultCode"], 1);

    let (status, body) = shop.callback("/callbacks/airtel", r#"{"transaction": {"id": 7}}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"]["success"], false);
}

#[actix_web::test]
async fn successful_airtel_callback() {
    let shop = TestShop::new().await;
    let checkout = checkout(&shop, "airtel").await;
    let callback = airtel_callback(&format!("TXN-{}", checkout.payment_id), true, Some("MP240501.1234.A56789"));
    let (status, body) = shop.callback("/callbacks/airtel", &callback.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"status": {"code": "200", "message": "Accepted", "success": true}}));

    let payment = payment(&shop, checkout.payment_id).await;
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.transaction_id.as_deref(), Some("MP240501.1234.A56789"));
    assert_eq!(order_status(&shop, checkout.order_id).await, "paid");
}

#[actix_web::test]
async fn callbacks_are_matched_per_provider() {
    let shop = TestShop::new().await;
    let checkout = checkout(&shop, "airtel").await;
    // An M-Pesa callback quoting the Airtel reference does not settle the Airtel payment
    let callback = mpesa_callback(&format!("TXN-{}", checkout.payment_id), 0, Some("NLJ7RT61SV"));
    let (status, body) = shop.callback("/callbacks/mpesa", &callback.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["ResultCode"], 1);
    assert_eq!(payment(&shop, checkout.payment_id).await.status, PaymentStatus::Pending);
}

#[actix_web::test]
async fn callback_after_manual_reconciliation() {
    let shop = TestShop::new().await;
    let checkout = checkout(&shop, "mpesa").await;
    let path = format!("/api/admin/payments/{}/reconcile", checkout.payment_id);
    let (status, _) = shop.post(&shop.staff, &path, json!({"status": "failed"})).await;
    assert_eq!(status, StatusCode::OK);

    let callback = mpesa_callback(&format!("ws_CO_{}", checkout.payment_id), 0, Some("NLJ7RT61SV"));
    let (status, body) = shop.callback("/callbacks/mpesa", &callback.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"ResultCode": 0, "ResultDesc": "Payment already failed"}));
    assert_eq!(payment(&shop, checkout.payment_id).await.status, PaymentStatus::Failed);
}

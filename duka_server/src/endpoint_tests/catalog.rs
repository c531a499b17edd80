use actix_web::{http::StatusCode, test, test::TestRequest, App};
use duka_engine::{
    catalog_api::ProductListing,
    db_types::{AuditAction, AuditEntry, Money, Product, ProductVariant},
};
use serde_json::json;

use super::helpers::{json, TestShop};
use crate::routes::health;

#[actix_web::test]
async fn only_health_is_public() {
    let shop = TestShop::new().await;
    let (status, _) = shop.request(TestRequest::get().uri("/api/products")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let app = test::init_service(App::new().service(health)).await;
    let res = test::call_service(&app, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn staff_build_the_catalog() {
    let shop = TestShop::new().await;
    let body = json!({"name": "Maasai shuka", "description": "Checked wool blanket", "category": "textiles"});
    let (status, body) = shop.post(&shop.staff, "/api/products", body).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let product: Product = serde_json::from_str(&body).unwrap();
    assert_eq!(product.category, "textiles");

    let path = format!("/api/products/{}/variants", product.id);
    let (status, body) = shop.post(&shop.staff, &path, json!({"size": "L", "price": "1450.00", "stock": 4})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let large: ProductVariant = serde_json::from_str(&body).unwrap();
    assert_eq!(large.price, Money::from_units(1450));
    let (status, _) = shop.post(&shop.admin, &path, json!({"size": "S", "price": 1200})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = shop.get(&shop.customer, &format!("/api/products/{}", product.id)).await;
    assert_eq!(status, StatusCode::OK);
    let listing: ProductListing = serde_json::from_str(&body).unwrap();
    assert_eq!(listing.product, product);
    assert_eq!(listing.variants.len(), 2);
    assert_eq!(listing.variants[0], large);
    assert_eq!(listing.variants[1].stock, 0);

    let (_, body) = shop.get(&shop.customer, "/api/products").await;
    assert_eq!(json(&body)[0]["variants"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn catalog_validation() {
    let shop = TestShop::new().await;
    let (status, _) = shop.post(&shop.customer, "/api/products", json!({"name": "Counterfeit"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = shop.post(&shop.staff, "/api/products", json!({"name": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = shop.post(&shop.staff, "/api/products/9999/variants", json!({"price": "10.00"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "Product #9999 does not exist");

    let variant = shop.add_variant("Kiondo", Money::from_units(800), 2).await;
    let path = format!("/api/products/{}/variants", variant.product_id);
    let (status, _) = shop.post(&shop.staff, &path, json!({"price": "-1.00"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = shop.post(&shop.staff, &path, json!({"price": "1.00", "stock": -3})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = shop.get(&shop.customer, "/api/products/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn restocking() {
    let shop = TestShop::new().await;
    let variant = shop.add_variant("Kiondo", Money::from_units(800), 2).await;
    let path = format!("/api/products/{}/restock", variant.product_id);

    let (status, body) = shop.post(&shop.staff, &path, json!({"variant_id": variant.id, "amount": 10})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let restocked: ProductVariant = serde_json::from_str(&body).unwrap();
    assert_eq!(restocked.stock, 12);

    let (status, _) = shop.post(&shop.customer, &path, json!({"variant_id": variant.id, "amount": 10})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = shop.post(&shop.staff, &path, json!({"variant_id": variant.id, "amount": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Invalid request. Restock amount must be positive, not 0");
    let (status, body) = shop.post(&shop.staff, &path, json!({"variant_id": variant.id, "amount": i64::MAX})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("would overflow its stock of 12"), "{body}");

    // The variant must belong to the product in the path
    let other = shop.add_variant("Kikapu", Money::from_units(300), 1).await;
    let (status, _) = shop.post(&shop.staff, &path, json!({"variant_id": other.id, "amount": 1})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = shop.get(&shop.staff, "/api/audit?action=product_restock").await;
    let entries: Vec<AuditEntry> = serde_json::from_str(&body).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action_type, AuditAction::ProductRestock);
    assert_eq!(entries[0].user_id, Some(shop.staff.id));
    assert_eq!(entries[0].order_id, None);
}

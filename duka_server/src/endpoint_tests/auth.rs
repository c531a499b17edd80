use actix_web::{
    http::{header::AUTHORIZATION, StatusCode},
    test::TestRequest,
    web,
    web::ServiceConfig,
};
use chrono::{Duration, TimeZone, Utc};
use duka_engine::{
    db_types::{Role, User},
    UserApi,
};
use serde_json::json;

use super::{
    helpers::{api_request, issue_token, json, valid_token, with_token, TestShop},
    mocks::MockUserManager,
};
use crate::routes::{MeRoute, RegisterUserRoute};

fn mirror_user(id: i64, role: Role) -> User {
    User {
        id,
        username: "wanjiku".into(),
        email: "wanjiku@example.com".into(),
        role,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
    }
}

fn configure_with_role(role: Role) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let mut users = MockUserManager::new();
        users.expect_fetch_user().returning(move |id| Ok((id == 1).then(|| mirror_user(1, role))));
        cfg.service(MeRoute::<MockUserManager>::new())
            .service(RegisterUserRoute::<MockUserManager>::new())
            .app_data(web::Data::new(UserApi::new(users)));
    }
}

fn token(user_id: i64, role: Role) -> String {
    issue_token(user_id, role, Utc::now() + Duration::hours(1))
}

#[actix_web::test]
async fn me_without_a_token() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/api/me");
    let (status, body) = api_request(req, configure_with_role(Role::Customer)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body), json!({"error": "Authentication Error. No bearer token was provided."}));
}

#[actix_web::test]
async fn me_with_a_valid_token() {
    let _ = env_logger::try_init().ok();
    let req = with_token(TestRequest::get().uri("/api/me"), &token(1, Role::Customer));
    let (status, body) = api_request(req, configure_with_role(Role::Customer)).await;
    assert_eq!(status, StatusCode::OK);
    let user: User = serde_json::from_str(&body).unwrap();
    assert_eq!(user, mirror_user(1, Role::Customer));
}

#[actix_web::test]
async fn non_bearer_schemes_are_ignored() {
    let _ = env_logger::try_init().ok();
    let header = (AUTHORIZATION, format!("Basic {}", token(1, Role::Staff)));
    let req = TestRequest::get().uri("/api/me").insert_header(header);
    let (status, _) = api_request(req, configure_with_role(Role::Staff)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn tampered_token() {
    let _ = env_logger::try_init().ok();
    let mut jwt = token(1, Role::Customer);
    jwt.replace_range(jwt.len() - 10..jwt.len() - 5, "AAAAA");
    let req = with_token(TestRequest::get().uri("/api/me"), &jwt);
    let (status, body) = api_request(req, configure_with_role(Role::Customer)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Authentication Error. Access token is invalid."));
}

#[actix_web::test]
async fn expired_token() {
    let _ = env_logger::try_init().ok();
    let jwt = issue_token(1, Role::Customer, Utc::now() - Duration::hours(2));
    let req = with_token(TestRequest::get().uri("/api/me"), &jwt);
    let (status, _) = api_request(req, configure_with_role(Role::Customer)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn token_for_an_unknown_user() {
    let _ = env_logger::try_init().ok();
    let req = with_token(TestRequest::get().uri("/api/me"), &token(99, Role::Customer));
    let (status, body) = api_request(req, configure_with_role(Role::Customer)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "Authentication Error. User #99 is not known to this shop.");
}

#[actix_web::test]
async fn token_with_a_stale_role() {
    let _ = env_logger::try_init().ok();
    // Demoted to customer since the token was issued
    let req = with_token(TestRequest::get().uri("/api/me"), &token(1, Role::Staff));
    let (status, body) = api_request(req, configure_with_role(Role::Customer)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        json(&body)["error"],
        "Authentication Error. The role in the access token is out of date. Please log in again."
    );
}

#[actix_web::test]
async fn customers_cannot_register_users() {
    let _ = env_logger::try_init().ok();
    let req = with_token(TestRequest::post().uri("/api/admin/users"), &token(1, Role::Customer))
        .set_json(json!({"username": "mallory", "email": "m@example.com", "role": "admin"}));
    let (status, body) = api_request(req, configure_with_role(Role::Customer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json(&body)["error"], "Insufficient Permissions. customers may not do this");
}

#[actix_web::test]
async fn staff_cannot_register_users() {
    let _ = env_logger::try_init().ok();
    let req = with_token(TestRequest::post().uri("/api/admin/users"), &token(1, Role::Staff))
        .set_json(json!({"username": "mallory", "email": "m@example.com", "role": "admin"}));
    let (status, _) = api_request(req, configure_with_role(Role::Staff)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admins_manage_the_user_mirror() {
    let shop = TestShop::new().await;
    let body = json!({"username": "njeri", "email": "njeri@example.com", "role": "staff"});
    let (status, body) = shop.post(&shop.admin, "/api/admin/users", body).await;
    assert_eq!(status, StatusCode::OK);
    let njeri: User = serde_json::from_str(&body).unwrap();
    assert_eq!(njeri.role, Role::Staff);

    let (status, _) = shop.get(&njeri, "/api/me").await;
    assert_eq!(status, StatusCode::OK);

    let path = format!("/api/admin/users/{}", njeri.id);
    let req = with_token(TestRequest::delete().uri(&path), &valid_token(&shop.admin));
    let (status, _) = shop.request(req).await;
    assert_eq!(status, StatusCode::OK);

    // Their token no longer resolves to anyone
    let (status, _) = shop.get(&njeri, "/api/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

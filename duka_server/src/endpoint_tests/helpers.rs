use std::sync::Arc;

use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::{header::AUTHORIZATION, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{DateTime, Duration, Utc};
use duka_engine::{
    db_types::{Money, NewProduct, NewUser, NewVariant, PaymentMethod, ProductVariant, Role, User},
    events::EventProducers,
    gateways::PaymentGateways,
    test_utils::{
        fake_gateway::FakeGateway,
        prepare_env::{prepare_test_env, random_db_path},
    },
    traits::{CatalogManagement, PaymentGateway},
    AuditApi,
    CatalogApi,
    OrderFlowApi,
    PaymentFlowApi,
    SqliteDatabase,
    UserApi,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use log::debug;
use serde_json::Value;

use crate::{
    auth::{JwtClaims, TokenVerifier},
    config::AuthConfig,
    middleware::JwtAuthMiddlewareFactory,
    server::{configure_api_routes, configure_callback_routes, json_config, query_config},
};

// Only ever used to sign test tokens
const TEST_JWT_SECRET: &str = "d4d79a8b8f1c0e6a2c3d4b5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f7081920";

pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new(TEST_JWT_SECRET)
}

pub fn issue_token(user_id: i64, role: Role, expiry: DateTime<Utc>) -> String {
    let claims = JwtClaims { sub: user_id, role, exp: expiry.timestamp() as usize };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()))
        .expect("Failed to sign token")
}

pub fn valid_token(user: &User) -> String {
    issue_token(user.id, user.role, Utc::now() + Duration::hours(1))
}

pub fn with_token(req: TestRequest, token: &str) -> TestRequest {
    req.insert_header((AUTHORIZATION, format!("Bearer {token}")))
}

fn jwt_middleware() -> JwtAuthMiddlewareFactory {
    JwtAuthMiddlewareFactory::new(TokenVerifier::new(&get_auth_config()))
}

/// Errors raised by middleware never reach a handler, so they are rendered here the way actix would render them.
async fn call<S, R, B>(service: &S, req: R) -> (StatusCode, String)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    debug!("Making request");
    match test::try_call_service(service, req).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = actix_web::body::to_bytes(res.into_body()).await.expect("Could not read error body");
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

/// Sends `req` to an `/api` scope behind the JWT middleware, configured by `configure`.
pub async fn api_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) + 'static {
    let app = App::new()
        .app_data(json_config())
        .app_data(query_config())
        .service(web::scope("/api").wrap(jwt_middleware()).configure(configure));
    let service = test::init_service(app).await;
    call(&service, req.to_request()).await
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"))
}

async fn register(users: &UserApi<SqliteDatabase>, name: &str, role: Role) -> User {
    users.register(NewUser::new(name, role)).await.expect("Could not register user")
}

/// A shop on a fresh SQLite database with a customer, a second customer, a staff member and an admin. Payments go
/// through in-process gateways.
pub struct TestShop {
    pub db: SqliteDatabase,
    pub gateways: PaymentGateways,
    pub mpesa: FakeGateway,
    pub airtel: FakeGateway,
    pub customer: User,
    pub other_customer: User,
    pub staff: User,
    pub admin: User,
}

impl TestShop {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Could not connect to test database");
        let users = UserApi::new(db.clone());
        let customer = register(&users, "wanjiku", Role::Customer).await;
        let other_customer = register(&users, "otieno", Role::Customer).await;
        let staff = register(&users, "kamau", Role::Staff).await;
        let admin = register(&users, "achieng", Role::Admin).await;
        let mpesa = FakeGateway::new(PaymentMethod::Mpesa);
        let airtel = FakeGateway::new(PaymentMethod::Airtel);
        let gateways =
            PaymentGateways::new().with_gateway(Arc::new(mpesa.clone())).with_gateway(Arc::new(airtel.clone()));
        Self { db, gateways, mpesa, airtel, customer, other_customer, staff, admin }
    }

    /// Replaces whatever gateway is registered for `gateway`'s payment method.
    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.register(gateway);
        self
    }

    pub async fn add_variant(&self, name: &str, price: Money, stock: i64) -> ProductVariant {
        let product = self.db.insert_product(NewProduct::new(name)).await.expect("Could not create product");
        let variant = NewVariant { product_id: product.id, size: Some("M".into()), price, stock };
        self.db.insert_variant(variant).await.expect("Could not create variant")
    }

    pub async fn request(&self, req: TestRequest) -> (StatusCode, String) {
        let (db, gateways) = (self.db.clone(), self.gateways.clone());
        let producers = EventProducers::default();
        let app = App::new()
            .app_data(web::Data::new(OrderFlowApi::new(db.clone(), producers.clone())))
            .app_data(web::Data::new(PaymentFlowApi::new(db.clone(), gateways, producers.clone())))
            .app_data(web::Data::new(CatalogApi::new(db.clone(), producers)))
            .app_data(web::Data::new(AuditApi::new(db.clone())))
            .app_data(web::Data::new(UserApi::new(db)))
            .app_data(json_config())
            .app_data(query_config())
            .service(web::scope("/api").wrap(jwt_middleware()).configure(configure_api_routes::<SqliteDatabase>))
            .service(web::scope("/callbacks").configure(configure_callback_routes::<SqliteDatabase>));
        let service = test::init_service(app).await;
        call(&service, req.to_request()).await
    }

    pub async fn get(&self, user: &User, path: &str) -> (StatusCode, String) {
        self.request(with_token(TestRequest::get().uri(path), &valid_token(user))).await
    }

    pub async fn post(&self, user: &User, path: &str, body: Value) -> (StatusCode, String) {
        self.request(with_token(TestRequest::post().uri(path).set_json(body), &valid_token(user))).await
    }

    pub async fn callback(&self, path: &str, body: &str) -> (StatusCode, String) {
        let req = TestRequest::post().uri(path).insert_header(("Content-Type", "application/json"));
        self.request(req.set_payload(body.to_string())).await
    }
}

//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate function. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every engine call is async, including the calls out to the payment
//! providers, so handlers must only ever `.await` them.
//!
//! Every route under `/api` sits behind the JWT middleware. Handlers resolve the caller with
//! [`authenticated_user`] and pass the resulting user to the engine, which makes the final permission decision.
use actix_web::{get, web, HttpResponse, Responder};
use duka_engine::{
    db_types::{NewProduct, NewUser, PaymentMethod, Role},
    payment_objects::PaymentQueryFilter,
    traits::{AuditQueryFilter, CallbackAck, CatalogManagement, OrderManagement, PaymentManagement, UserManagement},
    AuditApi,
    AuditManagement,
    CatalogApi,
    OrderFlowApi,
    PaymentFlowApi,
    UserApi,
};
use log::*;
use serde_json::Value;

use crate::{
    auth::{authenticated_user, JwtClaims},
    data_objects::{
        AuditSearchParams,
        CheckoutResponse,
        CreateOrderRequest,
        InitiatePaymentRequest,
        JsonResponse,
        NewVariantRequest,
        OrderSearchParams,
        PayOrderRequest,
        PaymentSearchParams,
        ReconcileRequest,
        RestockRequest,
        SetStatusRequest,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------    Users   ----------------------------------------------------
route!(me => Get "/me" impl UserManagement);
pub async fn me<B: UserManagement>(
    claims: JwtClaims,
    users: web::Data<UserApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    Ok(HttpResponse::Ok().json(user))
}

route!(register_user => Post "/admin/users" impl UserManagement where requires [Role::Admin]);
pub async fn register_user<B: UserManagement>(
    claims: JwtClaims,
    body: web::Json<NewUser>,
    users: web::Data<UserApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let admin = authenticated_user(&claims, users.get_ref()).await?;
    if admin.role != Role::Admin {
        return Err(ServerError::InsufficientPermissions("Only admins can register users".into()));
    }
    let new_user = body.into_inner();
    debug!("💻️ POST register user {} as {} by {}", new_user.username, new_user.role, admin.username);
    let user = users.register(new_user).await?;
    Ok(HttpResponse::Ok().json(user))
}

route!(remove_user => Delete "/admin/users/{id}" impl UserManagement where requires [Role::Admin]);
pub async fn remove_user<B: UserManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    users: web::Data<UserApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let admin = authenticated_user(&claims, users.get_ref()).await?;
    let id = path.into_inner();
    debug!("💻️ DELETE user #{id} by {}", admin.username);
    users.remove(id, &admin).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("User #{id} removed"))))
}

//----------------------------------------------   Orders   ----------------------------------------------------
route!(create_order => Post "/orders" impl UserManagement, OrderManagement);
pub async fn create_order<B: UserManagement + OrderManagement>(
    claims: JwtClaims,
    body: web::Json<CreateOrderRequest>,
    users: web::Data<UserApi<B>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    debug!("💻️ POST new order with {} lines for {}", body.lines.len(), user.username);
    let order = api.create_order(&user, &body.lines).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(my_orders => Get "/orders" impl UserManagement, OrderManagement);
pub async fn my_orders<B: UserManagement + OrderManagement>(
    claims: JwtClaims,
    query: web::Query<OrderSearchParams>,
    users: web::Data<UserApi<B>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    debug!("💻️ GET orders for {}", user.username);
    let statuses = query.statuses()?;
    let orders = api.orders_for_user(&user, statuses).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl UserManagement, OrderManagement);
pub async fn order_by_id<B: UserManagement + OrderManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    users: web::Data<UserApi<B>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    let order_id = path.into_inner();
    debug!("💻️ GET order #{order_id} for {}", user.username);
    let order = api.order_for_user(order_id, &user).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(set_order_status => Post "/orders/{id}/set_status"
    impl UserManagement, OrderManagement where requires [Role::Staff, Role::Admin]);
pub async fn set_order_status<B: UserManagement + OrderManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<SetStatusRequest>,
    users: web::Data<UserApi<B>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    let order_id = path.into_inner();
    info!("💻️ POST set status of order #{order_id} to {} by {}", body.status, user.username);
    let order = api.set_status(order_id, &body.status, &user).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{id}/cancel"
    impl UserManagement, OrderManagement where requires [Role::Staff, Role::Admin]);
pub async fn cancel_order<B: UserManagement + OrderManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    users: web::Data<UserApi<B>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    let order_id = path.into_inner();
    info!("💻️ POST cancel order #{order_id} by {}", user.username);
    let order = api.cancel(order_id, &user).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(pay_for_order => Post "/orders/{id}/pay" impl UserManagement, OrderManagement, PaymentManagement);
pub async fn pay_for_order<B: UserManagement + OrderManagement + PaymentManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<PayOrderRequest>,
    users: web::Data<UserApi<B>>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    let order_id = path.into_inner();
    let method = body.method()?;
    debug!("💻️ POST pay for order #{order_id} with {method} by {}", user.username);
    let payment = api.initiate_for_order(order_id, &user, method, &body.phone_number).await?;
    Ok(HttpResponse::Ok().json(payment))
}

//----------------------------------------------  Payments  ----------------------------------------------------
route!(initiate_payment => Post "/payments/initiate" impl UserManagement, OrderManagement, PaymentManagement);
/// Creates an order from the cart and starts paying for it.
///
/// If the provider refuses the charge or cannot be reached, the response is a 400 that still carries the order and
/// payment ids. The order stays `pending` and can be paid for later through `/orders/{id}/pay`.
pub async fn initiate_payment<B: UserManagement + OrderManagement + PaymentManagement>(
    claims: JwtClaims,
    body: web::Json<InitiatePaymentRequest>,
    users: web::Data<UserApi<B>>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    let method = body.method()?;
    debug!("💻️ POST checkout of {} lines with {method} for {}", body.cart_items.len(), user.username);
    let result = api.checkout(&user, method, &body.phone_number, &body.cart_items).await?;
    let response = CheckoutResponse::from(&result);
    if response.success {
        Ok(HttpResponse::Ok().json(response))
    } else {
        Ok(HttpResponse::BadRequest().json(response))
    }
}

route!(payment_status => Get "/payments/{id}/status" impl UserManagement, OrderManagement, PaymentManagement);
pub async fn payment_status<B: UserManagement + OrderManagement + PaymentManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    users: web::Data<UserApi<B>>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    let payment = api.payment_for_user(path.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(payment))
}

route!(payments => Get "/admin/payments"
    impl UserManagement, OrderManagement, PaymentManagement where requires [Role::Staff, Role::Admin]);
pub async fn payments<B: UserManagement + OrderManagement + PaymentManagement>(
    claims: JwtClaims,
    query: web::Query<PaymentSearchParams>,
    users: web::Data<UserApi<B>>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    let filter = PaymentQueryFilter::try_from(query.into_inner())?;
    debug!("💻️ GET payments matching {filter:?}");
    let payments = api.payments(filter, &user).await?;
    Ok(HttpResponse::Ok().json(payments))
}

route!(payment_by_id => Get "/admin/payments/{id}"
    impl UserManagement, OrderManagement, PaymentManagement where requires [Role::Staff, Role::Admin]);
pub async fn payment_by_id<B: UserManagement + OrderManagement + PaymentManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    users: web::Data<UserApi<B>>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    let payment = api.payment(path.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(payment))
}

route!(reconcile_payment => Post "/admin/payments/{id}/reconcile"
    impl UserManagement, OrderManagement, PaymentManagement where requires [Role::Staff, Role::Admin]);
pub async fn reconcile_payment<B: UserManagement + OrderManagement + PaymentManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<ReconcileRequest>,
    users: web::Data<UserApi<B>>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    let payment_id = path.into_inner();
    let ReconcileRequest { status, transaction_id } = body.into_inner();
    info!("💻️ POST reconcile payment #{payment_id} as {status} by {}", user.username);
    let payment = api.manual_reconcile(payment_id, &status, transaction_id, &user).await?;
    Ok(HttpResponse::Ok().json(payment))
}

//----------------------------------------------    Audit   ----------------------------------------------------
route!(audit_log => Get "/audit" impl UserManagement, AuditManagement where requires [Role::Staff, Role::Admin]);
pub async fn audit_log<B: UserManagement + AuditManagement>(
    claims: JwtClaims,
    query: web::Query<AuditSearchParams>,
    users: web::Data<UserApi<B>>,
    api: web::Data<AuditApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    let filter = AuditQueryFilter::try_from(query.into_inner())?;
    debug!("💻️ GET audit entries matching {filter:?}");
    let entries = api.entries(filter, &user).await?;
    Ok(HttpResponse::Ok().json(entries))
}

//----------------------------------------------   Catalog  ----------------------------------------------------
route!(products => Get "/products" impl CatalogManagement);
pub async fn products<B: CatalogManagement>(api: web::Data<CatalogApi<B>>) -> Result<HttpResponse, ServerError> {
    let products = api.products().await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(product_by_id => Get "/products/{id}" impl CatalogManagement);
pub async fn product_by_id<B: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product = api.product(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(create_product => Post "/products"
    impl UserManagement, CatalogManagement where requires [Role::Staff, Role::Admin]);
pub async fn create_product<B: UserManagement + CatalogManagement>(
    claims: JwtClaims,
    body: web::Json<NewProduct>,
    users: web::Data<UserApi<B>>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    debug!("💻️ POST new product {} by {}", body.name, user.username);
    let product = api.create_product(body.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(add_variant => Post "/products/{id}/variants"
    impl UserManagement, CatalogManagement where requires [Role::Staff, Role::Admin]);
pub async fn add_variant<B: UserManagement + CatalogManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<NewVariantRequest>,
    users: web::Data<UserApi<B>>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    let variant = body.into_inner().for_product(path.into_inner());
    debug!("💻️ POST new variant for product #{} by {}", variant.product_id, user.username);
    let variant = api.add_variant(variant, &user).await?;
    Ok(HttpResponse::Ok().json(variant))
}

route!(restock_product => Post "/products/{id}/restock"
    impl UserManagement, CatalogManagement where requires [Role::Staff, Role::Admin]);
pub async fn restock_product<B: UserManagement + CatalogManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<RestockRequest>,
    users: web::Data<UserApi<B>>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = authenticated_user(&claims, users.get_ref()).await?;
    let product_id = path.into_inner();
    let RestockRequest { variant_id, amount } = body.into_inner();
    info!("💻️ POST restock variant #{variant_id} of product #{product_id} by {amount} by {}", user.username);
    let variant = api.restock(product_id, variant_id, amount, &user).await?;
    Ok(HttpResponse::Ok().json(variant))
}

//----------------------------------------------  Callbacks ----------------------------------------------------
route!(mpesa_callback => Post "/mpesa" impl OrderManagement, PaymentManagement);
pub async fn mpesa_callback<B: OrderManagement + PaymentManagement>(
    body: web::Bytes,
    api: web::Data<PaymentFlowApi<B>>,
) -> HttpResponse {
    handle_callback(PaymentMethod::Mpesa, &body, api.get_ref()).await
}

route!(airtel_callback => Post "/airtel" impl OrderManagement, PaymentManagement);
pub async fn airtel_callback<B: OrderManagement + PaymentManagement>(
    body: web::Bytes,
    api: web::Data<PaymentFlowApi<B>>,
) -> HttpResponse {
    handle_callback(PaymentMethod::Airtel, &body, api.get_ref()).await
}

/// Providers retry callbacks that do not get a 200, so every outcome is acknowledged with one. Problems are reported
/// in the provider's acknowledgement body instead.
async fn handle_callback<B: OrderManagement + PaymentManagement>(
    method: PaymentMethod,
    body: &[u8],
    api: &PaymentFlowApi<B>,
) -> HttpResponse {
    trace!("📞️ Received {method} callback");
    let ack = match serde_json::from_slice::<Value>(body) {
        Ok(raw) => api.apply_callback(method, &raw).await,
        Err(e) => {
            warn!("📞️ {method} callback body is not JSON. {e}");
            CallbackAck::rejected(format!("Malformed callback. {e}"))
        },
    };
    HttpResponse::Ok().json(api.acknowledgement(method, &ack))
}


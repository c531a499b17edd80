use std::{pin::Pin, sync::Arc, time::Duration};

use actix_web::{
    dev::{Server, Service},
    error::{JsonPayloadError, QueryPayloadError},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpRequest,
    HttpServer,
};
use duka_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    gateways::{AirtelGateway, MpesaGateway, PaymentGateways},
    traits::{AuditManagement, CatalogManagement, OrderManagement, PaymentManagement, UserManagement},
    AuditApi,
    CatalogApi,
    OrderFlowApi,
    PaymentFlowApi,
    SqliteDatabase,
    UserApi,
};
use futures::{
    future::{ok, FutureExt},
    Future,
};
use log::*;

use crate::{
    auth::TokenVerifier,
    config::ServerConfig,
    errors::{AuthError, ServerError},
    helpers::peer_is_allowed,
    middleware::JwtAuthMiddlewareFactory,
    routes::{
        health,
        AddVariantRoute,
        AirtelCallbackRoute,
        AuditLogRoute,
        CancelOrderRoute,
        CreateOrderRoute,
        CreateProductRoute,
        InitiatePaymentRoute,
        MeRoute,
        MpesaCallbackRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        PayForOrderRoute,
        PaymentByIdRoute,
        PaymentStatusRoute,
        PaymentsRoute,
        ProductByIdRoute,
        ProductsRoute,
        ReconcilePaymentRoute,
        RegisterUserRoute,
        RemoveUserRoute,
        RestockProductRoute,
        SetOrderStatusRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 128;

type BoxedHook = Pin<Box<dyn Future<Output = ()> + Send>>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    let gateways = create_gateways(&config)?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, create_event_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, gateways, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_gateways(config: &ServerConfig) -> Result<PaymentGateways, ServerError> {
    let mpesa = MpesaGateway::new(config.mpesa.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the M-Pesa client. {e}")))?;
    let airtel = AirtelGateway::new(config.airtel.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the Airtel client. {e}")))?;
    let gateways = PaymentGateways::new().with_gateway(Arc::new(mpesa)).with_gateway(Arc::new(airtel));
    info!("💳️ Payment gateways ready: {:?}", gateways.methods());
    Ok(gateways)
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateways: PaymentGateways,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let payments_api = PaymentFlowApi::new(db.clone(), gateways.clone(), producers.clone());
        let catalog_api = CatalogApi::new(db.clone(), producers.clone());
        let audit_api = AuditApi::new(db.clone());
        let users_api = UserApi::new(db.clone());
        let verifier = TokenVerifier::new(&config.auth);
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let callback_whitelist = config.callback_whitelist.clone();
        let api_scope = web::scope("/api")
            .wrap(JwtAuthMiddlewareFactory::new(verifier))
            .configure(configure_api_routes::<SqliteDatabase>);
        let callback_scope = web::scope("/callbacks")
            .wrap_fn(move |req, srv| {
                if peer_is_allowed(req.request(), callback_whitelist.as_deref(), use_x_forwarded_for) {
                    srv.call(req).boxed_local()
                } else {
                    let err = ServerError::AuthenticationError(AuthError::ForbiddenPeer);
                    ok(req.error_response(err)).boxed_local()
                }
            })
            .configure(configure_callback_routes::<SqliteDatabase>);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("duka::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(audit_api))
            .app_data(web::Data::new(users_api))
            .app_data(json_config())
            .app_data(query_config())
            .service(health)
            .service(api_scope)
            .service(callback_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Every authenticated route. The scope that hosts these must be wrapped in [`JwtAuthMiddlewareFactory`].
pub fn configure_api_routes<B>(cfg: &mut web::ServiceConfig)
where B: UserManagement + CatalogManagement + OrderManagement + PaymentManagement + AuditManagement + 'static {
    cfg.service(MeRoute::<B>::new())
        .service(RegisterUserRoute::<B>::new())
        .service(RemoveUserRoute::<B>::new())
        .service(CreateOrderRoute::<B>::new())
        .service(MyOrdersRoute::<B>::new())
        .service(OrderByIdRoute::<B>::new())
        .service(SetOrderStatusRoute::<B>::new())
        .service(CancelOrderRoute::<B>::new())
        .service(PayForOrderRoute::<B>::new())
        .service(InitiatePaymentRoute::<B>::new())
        .service(PaymentStatusRoute::<B>::new())
        .service(PaymentsRoute::<B>::new())
        .service(PaymentByIdRoute::<B>::new())
        .service(ReconcilePaymentRoute::<B>::new())
        .service(AuditLogRoute::<B>::new())
        .service(ProductsRoute::<B>::new())
        .service(ProductByIdRoute::<B>::new())
        .service(CreateProductRoute::<B>::new())
        .service(AddVariantRoute::<B>::new())
        .service(RestockProductRoute::<B>::new());
}

/// The provider webhooks. These are not authenticated.
pub fn configure_callback_routes<B>(cfg: &mut web::ServiceConfig)
where B: OrderManagement + PaymentManagement + 'static {
    cfg.service(MpesaCallbackRoute::<B>::new()).service(AirtelCallbackRoute::<B>::new());
}

/// Malformed JSON bodies get the same error format as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        debug!("💻️ Rejected request body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: QueryPayloadError, _req: &HttpRequest| {
        debug!("💻️ Rejected query string. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

/// Hooks that write the engine's events to the log under the `duka::events` target.
pub fn create_event_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_created(|ev| -> BoxedHook {
            Box::pin(async move {
                let (id, total) = (ev.order.id(), ev.order.order.total_price);
                info!(target: "duka::events", "📬️ Order #{id} for {total} created by {}", ev.created_by.username);
            })
        })
        .on_order_status_changed(|ev| -> BoxedHook {
            Box::pin(async move {
                let (id, old, new) = (ev.order.id, ev.old_status, ev.new_status);
                info!(target: "duka::events", "📬️ Order #{id} moved from {old} to {new}");
            })
        })
        .on_order_cancelled(|ev| -> BoxedHook {
            Box::pin(async move {
                let id = ev.order.id();
                info!(target: "duka::events", "📬️ Order #{id} cancelled by {}", ev.cancelled_by.username);
            })
        })
        .on_stock_restocked(|ev| -> BoxedHook {
            Box::pin(async move {
                let (id, amount, stock) = (ev.variant.id, ev.amount, ev.variant.stock);
                info!(target: "duka::events", "📬️ Variant #{id} restocked by {amount} to {stock}");
            })
        })
        .on_payment_settled(|ev| -> BoxedHook {
            Box::pin(async move {
                let (id, order_id, status) = (ev.payment.id, ev.payment.order_id, ev.payment.status);
                info!(target: "duka::events", "📬️ Payment #{id} for order #{order_id} is {status}");
            })
        });
    hooks
}

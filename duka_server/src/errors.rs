use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use duka_engine::traits::ShopError;
use log::error;
use thiserror::Error;

const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred. Please try again later.";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    Shop(#[from] ShopError),
}

impl ServerError {
    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::UnknownUser(_) => StatusCode::UNAUTHORIZED,
                AuthError::StaleRole => StatusCode::UNAUTHORIZED,
                AuthError::ForbiddenPeer => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Shop(e) => shop_error_status(e),
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.is_internal() {
            error!("💻️ {self}");
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": message }).to_string())
    }
}

fn shop_error_status(e: &ShopError) -> StatusCode {
    match e {
        ShopError::ValidationError(_) => StatusCode::BAD_REQUEST,
        ShopError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
        ShopError::GatewayUnavailable(_) => StatusCode::BAD_REQUEST,
        ShopError::GatewayRejected(_) => StatusCode::BAD_REQUEST,
        ShopError::MalformedCallback(_) => StatusCode::BAD_REQUEST,
        ShopError::GatewayNotConfigured(_) => StatusCode::BAD_REQUEST,
        ShopError::InvalidOrderTransition { .. } | ShopError::InvalidTransition(_) => StatusCode::CONFLICT,
        ShopError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        ShopError::OrderNotFound(_)
        | ShopError::PaymentNotFound(_)
        | ShopError::ProductNotFound(_)
        | ShopError::VariantNotFound(_)
        | ShopError::UserNotFound(_) => StatusCode::NOT_FOUND,
        ShopError::DatabaseError(_) | ShopError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No bearer token was provided.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("User #{0} is not known to this shop.")]
    UnknownUser(i64),
    #[error("The role in the access token is out of date. Please log in again.")]
    StaleRole,
    #[error("Requests from this address are not allowed.")]
    ForbiddenPeer,
}

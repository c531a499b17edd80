use thiserror::Error;

#[derive(Debug, Error)]
pub enum MobileMoneyApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach the provider: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The provider rejected the request. Code {code}. {message}")]
    Rejected { code: String, message: String },
    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),
}

impl MobileMoneyApiError {
    /// True when the failure happened in transport (network, timeout or a non-2xx status) rather than being an
    /// explicit refusal by the provider.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::RestRequestError(_) | Self::RestResponseError(_) | Self::QueryError { .. } | Self::JsonError(_)
        )
    }
}

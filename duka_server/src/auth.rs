//! Access tokens are issued by the external identity service and signed with a shared HS256 secret. This server only
//! verifies them.
//!
//! The `sub` claim is the user id in the local user mirror. The `role` claim must agree with the mirror, so that a
//! demoted user cannot keep using an old token.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use duka_engine::{
    db_types::{Role, User},
    traits::{ShopError, UserManagement},
    UserApi,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::*;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    #[serde(deserialize_with = "user_id_from_str_or_int")]
    pub sub: i64,
    pub role: Role,
    pub exp: usize,
}

fn user_id_from_str_or_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum UserId {
        Int(i64),
        Str(String),
    }
    match UserId::deserialize(deserializer)? {
        UserId::Int(id) => Ok(id),
        UserId::Str(s) => s.trim().parse::<i64>().map_err(serde::de::Error::custom),
    }
}

/// Claims are placed in the request extensions by [`crate::middleware::JwtAuthMiddlewareFactory`].
impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned();
        ready(claims.ok_or(ServerError::AuthenticationError(AuthError::MissingToken)))
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        Self { key, validation }
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("🔐️ Rejected access token. {e}");
            AuthError::ValidationError(e.to_string())
        })?;
        trace!("🔐️ Access token validated for user #{}", data.claims.sub);
        Ok(data.claims)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolves the claims of a verified token to the user in the local mirror.
pub async fn authenticated_user<B: UserManagement>(claims: &JwtClaims, api: &UserApi<B>) -> Result<User, ServerError> {
    let user = api.user(claims.sub).await.map_err(|e| match e {
        ShopError::UserNotFound(id) => {
            warn!("🔐️ Valid token for user #{id}, who is not in the user mirror");
            ServerError::AuthenticationError(AuthError::UnknownUser(id))
        },
        e => ServerError::Shop(e),
    })?;
    if user.role != claims.role {
        info!("🔐️ Token for {} claims role {}, but they are now {}", user.username, claims.role, user.role);
        return Err(ServerError::AuthenticationError(AuthError::StaleRole));
    }
    Ok(user)
}

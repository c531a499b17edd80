//! Verifies the bearer token on every request to the wrapped scope and stores the claims in the request extensions,
//! where the [`JwtClaims`] extractor and [`super::AclMiddlewareFactory`] pick them up.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::{
    auth::{bearer_token, JwtClaims, TokenVerifier},
    errors::{AuthError, ServerError},
};

pub struct JwtAuthMiddlewareFactory {
    verifier: Rc<TokenVerifier>,
}

impl JwtAuthMiddlewareFactory {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier: Rc::new(verifier) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(JwtAuthMiddlewareService { verifier: Rc::clone(&self.verifier), service: Rc::new(service) })
    }
}

pub struct JwtAuthMiddlewareService<S> {
    verifier: Rc<TokenVerifier>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let verifier = Rc::clone(&self.verifier);
        Box::pin(async move {
            let claims = {
                let header = req.headers().get(AUTHORIZATION).and_then(|h| h.to_str().ok());
                let token = header.and_then(bearer_token).ok_or_else(|| {
                    trace!("🔐️ No bearer token on request to {}", req.path());
                    ServerError::AuthenticationError(AuthError::MissingToken)
                })?;
                verifier.verify(token).map_err(ServerError::AuthenticationError)?
            };
            req.extensions_mut().insert::<JwtClaims>(claims);
            service.call(req).await
        })
    }
}

use crate::api::error::ApiError;
use crate::consts;
use actix_service::{forward_ready, Service, Transform};
use actix_web::{
    dev::{Payload, ServiceRequest, ServiceResponse},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use application::auth::{TokenService, UserClaims};
use application::error::AppError;
use futures::future::{ok, ready, LocalBoxFuture, Ready};
use log::debug;
use std::rc::Rc;
use std::sync::Arc;

// There are two steps in middleware processing.
// 1. Middleware initialization, middleware factory gets called with
//    next service in chain as parameter.
// 2. Middleware's call method gets called with normal request.
pub struct JwtVerifier {
    token_svc: Arc<dyn TokenService>,
}

impl JwtVerifier {
    pub fn new(token_svc: Arc<dyn TokenService>) -> Self {
        Self { token_svc }
    }
}

// Middleware factory is `Transform` trait from actix-service crate
// `S` - type of the next service
// `B` - type of response's body
impl<S, B> Transform<S, ServiceRequest> for JwtVerifier
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtVerifyMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(JwtVerifyMiddleware {
            service: Rc::new(service),
            token_svc: self.token_svc.clone(),
        })
    }
}

pub struct JwtVerifyMiddleware<S> {
    service: Rc<S>,
    token_svc: Arc<dyn TokenService>,
}

impl<S, B> Service<ServiceRequest> for JwtVerifyMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let verified = token_from_header(req.request())
            .ok_or_else(|| AppError::Unauthorized("no bearer token".to_string()))
            .and_then(|token| self.token_svc.verify(&token));

        Box::pin(async move {
            match verified {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    service.call(req).await
                }
                Err(e) => {
                    debug!("rejected {}: {}", req.path(), e);
                    Err(ApiError(e).into())
                }
            }
        })
    }
}

/// 令牌格式为 "Bearer <token>"
fn token_from_header(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(consts::AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix(consts::BEARER_PREFIX))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// 已认证的调用者，由 JwtVerifier 写入请求扩展
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserClaims);

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.0.user_id
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserClaims>()
                .cloned()
                .map(AuthUser)
                .ok_or_else(|| ApiError(AppError::Unauthorized("not authenticated".to_string()))),
        )
    }
}

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use sqlx::PgPool;
use std::rc::Rc;

use crate::auth::token::verify_token;
use crate::error::AppError;

/// Bearer-token authentication middleware for the `/api` scope.
///
/// Extracts the JWT from the `Authorization` header, verifies it, confirms the
/// subject user still exists, and inserts the decoded `Claims` into request
/// extensions for the `AuthenticatedUserId` extractor. Login and registration
/// are the only endpoints inside the scope that skip authentication.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
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
        // Skip authentication for the open auth endpoints
        let path = req.path();
        if path.starts_with("/api/auth/login") || path.starts_with("/api/auth/register") {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_owned);

        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let token = token.ok_or_else(|| {
                Error::from(AppError::Unauthorized(
                    "No token provided, authorization denied".into(),
                ))
            })?;

            let claims = verify_token(&token)?;

            // The token may outlive its user; reject tokens for deleted accounts.
            let pool = req
                .app_data::<web::Data<PgPool>>()
                .cloned()
                .ok_or_else(|| {
                    Error::from(AppError::InternalServerError(
                        "Database pool not configured".into(),
                    ))
                })?;

            let user_exists = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1")
                .bind(claims.sub)
                .fetch_optional(&**pool)
                .await
                .map_err(AppError::from)?;

            if user_exists.is_none() {
                return Err(AppError::Unauthorized(
                    "Token is valid but user no longer exists".into(),
                )
                .into());
            }

            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}

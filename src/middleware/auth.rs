use crate::utils::auth::TokenIssuer;
use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};

/// Bearer-token gate. Verifies the credential with the app's `TokenIssuer`
/// and inserts the typed `Claims` into request extensions, where handlers
/// read them via `web::ReqData<Claims>`. Handlers behind this middleware
/// can therefore only ever see verified identities.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Extract Authorization header
        let auth_header = req.headers().get("Authorization");

        let token = match auth_header {
            Some(header_value) => match header_value.to_str() {
                Ok(header_str) => header_str.strip_prefix("Bearer ").map(|s| s.to_string()),
                Err(_) => None,
            },
            None => None,
        };

        let token = match token {
            Some(t) => t,
            None => {
                let (req, _pl) = req.into_parts();
                let res = actix_web::HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "Authorization token required"
                }));
                return Box::pin(
                    async move { Ok(ServiceResponse::new(req, res).map_into_right_body()) },
                );
            }
        };

        // Missing issuer means the app was assembled without one, which is
        // a wiring bug, not a client failure.
        let issuer = req.app_data::<web::Data<TokenIssuer>>().cloned();
        let issuer = match issuer {
            Some(issuer) => issuer,
            None => {
                let (req, _pl) = req.into_parts();
                let res = actix_web::HttpResponse::InternalServerError().json(
                    serde_json::json!({
                        "error": "internal server error"
                    }),
                );
                return Box::pin(
                    async move { Ok(ServiceResponse::new(req, res).map_into_right_body()) },
                );
            }
        };

        let claims = match issuer.verify(&token) {
            Ok(claims) => claims,
            Err(_) => {
                let (req, _pl) = req.into_parts();
                let res = actix_web::HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "Invalid or expired token"
                }));
                return Box::pin(
                    async move { Ok(ServiceResponse::new(req, res).map_into_right_body()) },
                );
            }
        };

        // Insert claims into request extensions
        req.extensions_mut().insert(claims);

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}

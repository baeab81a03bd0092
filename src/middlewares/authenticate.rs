use std::future::{ready, Ready};

use actix_web::{
    body::BoxBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::StatusCode,
    middleware::Next,
    web::Data,
    FromRequest, HttpMessage, HttpRequest,
};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::utils::{json_responder::Response, jwt::JWT};

pub const AUTH_COOKIE: &str = "auth_token";

/// The authenticated caller, placed in request extensions by [`authenticate_user`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub is_admin: bool,
}

impl FromRequest for Identity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Identity>()
                .cloned()
                .ok_or_else(|| actix_web::error::ErrorUnauthorized("Not authenticated")),
        )
    }
}

/// First `X-Forwarded-For` hop, falling back to the peer address.
pub fn client_ip(req: &HttpRequest) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn authenticate_user(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, actix_web::Error> {
    let jwt = match req.app_data::<Data<JWT>>() {
        Some(jwt) => jwt.clone(),
        None => {
            error!("JWT not configured");
            return Ok(req.into_response(Response::<()>::error(
                "Something went wrong!",
                StatusCode::INTERNAL_SERVER_ERROR,
            )));
        }
    };
    let ip = client_ip(req.request());

    let token = match req.cookie(AUTH_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => {
            warn!("Missing auth token from {}", ip);
            return Ok(req.into_response(Response::<()>::error(
                "Missing auth token cookie",
                StatusCode::UNAUTHORIZED,
            )));
        }
    };

    match jwt.decode(&token) {
        Ok(claims) => {
            debug!("authenticated {} from {}", claims.sub, ip);
            req.extensions_mut().insert(Identity {
                user_id: claims.sub,
                is_admin: claims.is_admin,
            });
            next.call(req).await
        }
        Err(e) => {
            warn!("Rejected auth token from {}: {}", ip, e);
            Ok(req.into_response(Response::<()>::error(
                "Invalid or expired token!",
                StatusCode::UNAUTHORIZED,
            )))
        }
    }
}

/// Must run after [`authenticate_user`].
pub async fn require_admin(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, actix_web::Error> {
    let identity = req.extensions().get::<Identity>().cloned();
    match identity {
        Some(identity) if identity.is_admin => next.call(req).await,
        Some(identity) => {
            warn!(
                "{} denied admin access from {}",
                identity.user_id,
                client_ip(req.request())
            );
            Ok(req.into_response(Response::<()>::error(
                "Admin access required",
                StatusCode::FORBIDDEN,
            )))
        }
        None => Ok(req.into_response(Response::<()>::error(
            "Not authenticated",
            StatusCode::UNAUTHORIZED,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.7, 10.0.0.1"))
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .to_http_request();
        assert_eq!(client_ip(&req), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let req = TestRequest::default()
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .to_http_request();
        assert_eq!(client_ip(&req), "127.0.0.1");
    }
}

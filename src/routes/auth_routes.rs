use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    http::StatusCode,
    web::ServiceConfig,
    HttpRequest, Responder,
};
use log::{error, info};

use crate::{
    middlewares::authenticate::{client_ip, Identity, AUTH_COOKIE},
    utils::json_responder::Response,
};

#[actix_web::get("/me")]
pub async fn current_user(identity: Identity) -> impl Responder {
    Response::ok(identity, StatusCode::OK)
}

#[actix_web::get("/logout")]
pub async fn logout_user(identity: Identity, req: HttpRequest) -> impl Responder {
    info!("{} logged out from {}", identity.user_id, client_ip(&req));
    let cookie = Cookie::build(AUTH_COOKIE, "")
        .http_only(true)
        .same_site(SameSite::None)
        .secure(true)
        .path("/")
        .max_age(Duration::days(-1))
        .finish();
    let mut response = Response::ok("User logged out!", StatusCode::OK);
    if let Err(e) = response.add_cookie(&cookie) {
        error!("Error clearing session cookie: {}", e);
    }
    response
}

pub fn init(cnf: &mut ServiceConfig) {
    cnf.service(current_user).service(logout_user);
}

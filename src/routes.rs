use actix_web::{middleware::from_fn, web::scope, web::ServiceConfig};

use crate::middlewares::authenticate::{authenticate_user, require_admin};
pub mod admin_routes;
pub mod auth_routes;
pub mod poll_routes;

pub fn init(cnf: &mut ServiceConfig) {
    cnf.service(scope("/polls").configure(poll_routes::init))
        .service(
            scope("/auth")
                .wrap(from_fn(authenticate_user))
                .configure(auth_routes::init),
        )
        .service(
            scope("/admin")
                .wrap(from_fn(require_admin))
                .wrap(from_fn(authenticate_user))
                .configure(admin_routes::init),
        );
}

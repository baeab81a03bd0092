use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{
    http::StatusCode,
    middleware::Logger,
    web::Data,
    App, HttpResponse, HttpServer,
};
use clock::{Clock, SystemClock};
use config::app_config::{AppConfig, StorageKind};
use db::{memory::MemoryStore, Store, DB};
use env_logger::Env;
use log::{info, warn};
use services::voting::VotingService;
use utils::{json_responder::Response, jwt::JWT};
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod middlewares;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

#[actix_web::get("/")]
async fn home() -> HttpResponse {
    Response::ok("Welcome to polls backend", StatusCode::OK)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let app_config = AppConfig::init()?;

    let store: Arc<dyn Store> = match app_config.storage {
        StorageKind::Mongo => Arc::new(DB::init(&app_config).await?),
        StorageKind::Memory => {
            warn!("Using in-memory storage, nothing survives a restart");
            Arc::new(MemoryStore::new())
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let jwt = Data::new(JWT::init(&app_config.jwt_secret));
    if app_config.is_dev {
        let token = jwt.sign("dev-admin", true, chrono::Duration::hours(12))?;
        info!("Dev admin session token: {}", token);
    }

    let voting = Data::new(VotingService::new(store.clone()));
    let store = Data::from(store);
    let clock = Data::from(clock);
    let client_origin = app_config.client_origin.clone();

    info!("Listening on {}", app_config.server_addr);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&client_origin)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();
        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(store.clone())
            .app_data(clock.clone())
            .app_data(voting.clone())
            .app_data(jwt.clone())
            .service(home)
            .configure(routes::init)
    })
    .bind(&app_config.server_addr)?
    .run()
    .await?;
    Ok(())
}

use anyhow::{anyhow, Result};
use dotenv::dotenv;
use log::warn;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Mongo,
    Memory,
}

pub struct AppConfig {
    pub is_dev: bool,
    pub storage: StorageKind,
    pub db_url: Option<String>,
    pub db_name: String,
    pub jwt_secret: String,
    pub client_origin: String,
    pub server_addr: String,
}

impl AppConfig {
    pub fn init() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let is_dev = lookup("IS_DEV").map(|v| v == "true").unwrap_or(false);
        let storage = match lookup("STORAGE").as_deref() {
            None | Some("mongo") => StorageKind::Mongo,
            Some("memory") => StorageKind::Memory,
            Some(other) => return Err(anyhow!("Unknown STORAGE {:?}, expected mongo or memory", other)),
        };
        let db_url = lookup("DB_URL");
        if storage == StorageKind::Mongo && db_url.is_none() {
            return Err(anyhow!("No DB url found!"));
        }
        let db_name = lookup("DB_NAME").unwrap_or_else(|| String::from("polls"));
        let jwt_secret = lookup("JWT_SECRET").ok_or_else(|| anyhow!("Set jwt secret to verify sessions!"))?;
        let client_origin = lookup("CLIENT_ORIGIN").unwrap_or_else(|| {
            warn!("client_origin var not set!");
            String::from("http://localhost:3000")
        });
        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| String::from("localhost:5000"));
        Ok(Self {
            is_dev,
            storage,
            db_url,
            db_name,
            jwt_secret,
            client_origin,
            server_addr,
        })
    }
}

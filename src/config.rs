use std::{env, net::SocketAddr};

use url::Url;

use crate::error::AppError;

pub const DEFAULT_PUSH_GATEWAY: &str = "https://exp.host/--/api/v2/push/send";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    /// Base URL of the object-store HTTP API, e.g. `https://acme.example.co/storage/v1`.
    pub object_store_url: String,
    pub bucket: String,
    /// Bearer token for the object store; empty means unauthenticated (tests).
    pub object_store_key: String,
    pub push_gateway_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://tripdesk.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let object_store_url = env::var("OBJECT_STORE_URL")
            .map_err(|_| AppError::Config("OBJECT_STORE_URL must be set".into()))?;
        Url::parse(&object_store_url)
            .map_err(|err| AppError::Config(format!("invalid OBJECT_STORE_URL: {err}")))?;
        let bucket =
            env::var("OBJECT_STORE_BUCKET").unwrap_or_else(|_| "trip-images".to_string());
        let object_store_key = env::var("OBJECT_STORE_KEY").unwrap_or_default();

        let push_gateway_url =
            env::var("PUSH_GATEWAY_URL").unwrap_or_else(|_| DEFAULT_PUSH_GATEWAY.to_string());
        Url::parse(&push_gateway_url)
            .map_err(|err| AppError::Config(format!("invalid PUSH_GATEWAY_URL: {err}")))?;

        Ok(Self {
            database_url,
            listen_addr,
            object_store_url,
            bucket,
            object_store_key,
            push_gateway_url,
        })
    }
}

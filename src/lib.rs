#[macro_use]
extern crate rocket;
#[macro_use]
extern crate lazy_static;

use std::sync::Arc;

use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::clock::SystemClock;
use crate::config::{Config, StorageBackend};
use crate::error::{BackendError, ConfigurationError};
use crate::route::mount_api;
use crate::service::Scheduler;
use crate::store::{MemoryStore, MongoStore, SchoolStore};

pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod middleware;
pub mod resp;
pub mod route;
pub mod service;
pub mod store;
pub mod util;
pub mod validate;

fn init_logging(level: Level) {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to set global logger: {}", err);
    };
    if let Err(err) = tracing_log::LogTracer::init() {
        eprintln!("Unable to forward log records: {}", err);
    }
}

fn load_config() -> Result<Config, ConfigurationError> {
    match Config::load() {
        Ok(c) => {
            tracing::info!("Configuration loaded.");
            Ok(c)
        }
        Err(ConfigurationError::NotFound(_)) => {
            let c = Config::default();
            if c.save().is_err() {
                tracing::warn!("Unable to save generated configuration.");
            }
            Ok(c)
        }
        Err(other) => {
            tracing::error!("Configuration error: {}", other);
            Err(other)
        }
    }
}

async fn open_store(c: &Config) -> Result<Arc<dyn SchoolStore>, BackendError> {
    match c.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data won't outlive the process.");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::MongoDb => {
            tracing::info!("Connecting to MongoDB: {}", c.mongodb_uri);
            let store = MongoStore::connect(&c.mongodb_uri, &c.mongodb_db).await?;

            tracing::info!("Using MongoDB database: {}", c.mongodb_db);
            if let Err(e) = store.database().list_collection_names(None).await {
                tracing::error!("Unable to connect to MongoDB.");
                return Err(e.into());
            }
            store.ensure_indexes().await?;
            Ok(Arc::new(store))
        }
    }
}

/// Sets up logging, configuration and storage and builds the server.
pub async fn create(log_level: Option<Level>) -> Result<Rocket<Build>, BackendError> {
    if let Some(l) = log_level {
        init_logging(l);
    }

    tracing::info!("Reading .env file...");
    if dotenv::dotenv().is_err() {
        tracing::warn!("Unable to load .env file.");
    }

    tracing::info!("Loading configuration...");
    let c = load_config()?;

    let store = open_store(&c).await?;
    let scheduler =
        Scheduler::new(store, Arc::new(SystemClock)).with_code_attempts(c.code_attempts);

    Ok(build(scheduler)?.manage(c))
}

/// Builds the HTTP server around `scheduler`.
pub fn build(scheduler: Scheduler) -> Result<Rocket<Build>, BackendError> {
    tracing::info!("Starting HTTP server...");
    let r = rocket::build().manage(scheduler);

    tracing::info!("Setting up CORS...");
    let cors = rocket_cors::CorsOptions {
        allowed_origins: AllowedOrigins::All,
        allowed_methods: vec![Method::Get, Method::Put, Method::Post, Method::Delete]
            .into_iter()
            .map(From::from)
            .collect(),
        allowed_headers: AllowedHeaders::All,
        allow_credentials: true,
        ..Default::default()
    }
    .to_cors()?;

    Ok(mount_api(r.attach(cors)))
}

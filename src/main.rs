mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod utils;

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{
    http::header,
    middleware::{Compress, Condition, Logger, NormalizePath},
    web, App, HttpServer,
};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AppConfig, AppEnv};
use crate::database::{ProviderRepository, UserRepository};
use crate::services::{FirebaseVerifier, IdentityVerifier};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("❌ Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    log::info!("🚀 Starting Binnect API ({:?})...", config.app_env);
    log::info!("📊 Database: {}", config.database_name);

    let db = database::MongoDB::new(&config.database_url, &config.database_name)
        .await
        .map_err(|e| {
            log::error!("❌ Failed to connect to MongoDB: {}", e);
            io::Error::new(io::ErrorKind::ConnectionRefused, e.to_string())
        })?;

    log::info!("✅ MongoDB connected successfully");

    let providers: Arc<dyn ProviderRepository> = Arc::new(db.clone());
    let users: Arc<dyn UserRepository> = Arc::new(db);
    let verifier: Arc<dyn IdentityVerifier> =
        Arc::new(FirebaseVerifier::new(&config.firebase_project_id));

    log::info!("🔐 Verifying Firebase ID tokens for project {}", config.firebase_project_id);

    let providers = web::Data::from(providers);
    let users = web::Data::from(users);
    let verifier = web::Data::from(verifier);

    let bind_address = config.bind_address();
    log::info!("🌐 Server starting on {}", bind_address);
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", bind_address);
    log::info!("📄 OpenAPI spec at: http://{}/api-docs/openapi.json", bind_address);

    let openapi = api::swagger::ApiDoc::openapi();

    HttpServer::new(move || {
        App::new()
            .app_data(providers.clone())
            .app_data(users.clone())
            .app_data(verifier.clone())
            .wrap(Condition::new(
                config.app_env == AppEnv::Development,
                utils::error::server_error_detail(),
            ))
            .wrap(cors(&config))
            .wrap(Compress::default())
            .wrap(middleware::SecurityHeaders)
            .wrap(NormalizePath::trim())
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
            .configure(api::configure)
    })
    .bind(bind_address)?
    .run()
    .await
}

/// Any origin in development; only `ALLOWED_ORIGINS` in production
fn cors(config: &AppConfig) -> Cors {
    let cors = match config.app_env {
        AppEnv::Development => Cors::default().allow_any_origin(),
        AppEnv::Production => config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin)),
    };

    cors.allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::CACHE_CONTROL,
        ])
        .expose_headers(vec![header::CONTENT_TYPE])
        .max_age(3600)
}

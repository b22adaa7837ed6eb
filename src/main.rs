//! Shellac - a minimal self-hosted music catalog and upload server.
//!
//! Clients upload MP3 files over a REST API; shellac stores the bytes
//! locally or in a remote media cloud and catalogs one record per song.

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shellac::api;
use shellac::catalog::{CatalogService, JsonCatalogStore};
use shellac::config::{self, LogFormat};
use shellac::models::{AppState, StorageKind};
use shellac::storage::{LocalObjectStore, ObjectStore, RemoteObjectStore};

/// Initialize the tracing/logging subsystem.
fn init_tracing(config: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.log_format {
        LogFormat::Json => {
            subscriber
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

/// Configure CORS based on application config.
fn configure_cors(config: &config::Config) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600);

    if config.cors_origins.len() == 1 && config.cors_origins[0] == "*" {
        cors = cors.allow_any_origin();
    } else {
        for origin in &config.cors_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

/// Build the object store selected by configuration.
fn build_object_store(config: &config::Config) -> std::io::Result<Arc<dyn ObjectStore>> {
    match config.storage_type {
        StorageKind::Local => {
            let store = LocalObjectStore::new(&config.songs_folder).map_err(|e| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
            })?;
            Ok(Arc::new(store))
        }
        StorageKind::Remote => {
            let (Some(name), Some(key), Some(secret)) = (
                config.cloud_name.as_deref(),
                config.cloud_api_key.as_deref(),
                config.cloud_api_secret.as_deref(),
            ) else {
                // validate() already rejects this; belt for direct callers
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "remote storage credentials missing",
                ));
            };

            Ok(Arc::new(RemoteObjectStore::new(
                &config.cloud_endpoint,
                name,
                key,
                secret,
            )))
        }
    }
}

/// Graceful shutdown handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize configuration
    let config = config::init();

    // Initialize logging
    init_tracing(config);

    // Validate configuration
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Configuration validation failed");
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }

    // Open the catalog store
    let catalog_store = Arc::new(JsonCatalogStore::new(&config.catalog_file).map_err(|e| {
        tracing::error!(error = %e, "Failed to open catalog store");
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?);

    // Select the object store backend
    let object_store = build_object_store(config).map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize object store");
        e
    })?;

    // Create application state
    let app_state = AppState {
        catalog: Arc::new(CatalogService::new(
            catalog_store,
            object_store,
            config.public_url.clone(),
        )),
    };

    let bind_address = config.bind_address();

    tracing::info!(
        address = %bind_address,
        storage = ?config.storage_type,
        catalog = %config.catalog_file.display(),
        "Starting Shellac server"
    );

    // Create and start server
    let server = HttpServer::new(move || {
        let mut app = App::new()
            // Middleware (order matters - outermost first)
            .wrap(TracingLogger::default())
            .wrap(configure_cors(config))
            // Shared state
            .app_data(web::Data::new(app_state.clone()))
            .configure(api::banner::configure)
            .configure(api::songs::configure);

        // Local songs are streamed straight off disk; remote songs come
        // from the cloud URL, so there is nothing to mount.
        if config.storage_type == StorageKind::Local {
            app = app.service(actix_files::Files::new("/audio", &config.songs_folder));
        }

        app
    })
    .bind(&bind_address)?
    .shutdown_timeout(30)
    .run();

    // Run server with graceful shutdown
    tokio::select! {
        result = server => {
            result
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
    }
}

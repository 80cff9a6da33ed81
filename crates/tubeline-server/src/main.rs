mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use tubeline_api::auth::TokenConfig;
use tubeline_api::{AppState, AppStateInner};
use tubeline_db::Database;
use tubeline_media::{CloudinaryStore, LocalStore, MediaStore};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tubeline=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let db = Database::open(&config.database_path)?;

    let media = match &config.cloudinary {
        Some(cloudinary) => MediaStore::Cloudinary(CloudinaryStore::new(cloudinary.clone())),
        None => {
            warn!("Cloudinary credentials not set, storing media locally");
            MediaStore::Local(
                LocalStore::new(config.media_local_dir.clone(), config.media_public_url.clone())
                    .await?,
            )
        }
    };
    info!("Media backend: {}", media.backend_name());

    let state: AppState = Arc::new(AppStateInner {
        db,
        media,
        tokens: TokenConfig {
            access_secret: config.access_token_secret.clone(),
            access_ttl: config.access_token_life,
            refresh_secret: config.refresh_token_secret.clone(),
            refresh_ttl: config.refresh_token_life,
        },
        upload_dir: config.upload_tmp_dir.clone(),
        cookie_secure: config.cookie_secure,
        max_upload_bytes: config.max_upload_bytes,
    });

    let mut app = tubeline_api::router(state.clone());
    if let MediaStore::Local(local) = &state.media {
        app = app.nest_service("/media", ServeDir::new(local.dir()));
    }
    let app = app
        .layer(cors_layer(config.cors_origins.as_deref())?)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Tubeline server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Any origin without credentials, or an explicit list with credentials so the
/// token cookies cross origins.
fn cors_layer(origins: Option<&[String]>) -> anyhow::Result<CorsLayer> {
    let Some(origins) = origins else {
        return Ok(CorsLayer::permissive());
    };
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

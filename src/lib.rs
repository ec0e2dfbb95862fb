pub mod auth;
pub mod config;
pub mod db;
pub mod error;

use std::sync::Arc;
use std::time::Duration;
use actix_web::{web, HttpResponse};
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use crate::config::Settings;

pub use auth::{AuthService, PasswordHasher, SessionClaim, TokenCodec};
pub use db::{DbOperations, InMemoryUserDirectory, UserDirectory, UserProfile, UserRecord};

use crate::config::DirectoryBackend;

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// All routes served by the application.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .configure(auth::handlers::configure);
}

/// Application state shared across all workers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth_service: Arc<AuthService>,
    db: Option<Arc<DbOperations>>,
}

impl AppState {
    /// Connect the configured user directory and build the auth service.
    pub async fn new(config: Settings) -> Result<Self> {
        match config.database.backend {
            DirectoryBackend::Postgres => {
                let db = DbOperations::new_with_options(
                    &config.database.url,
                    config.database.max_connections,
                    Duration::from_secs(5),
                )
                .await?;
                db.migrate().await?;
                info!("Connected to user directory at {}", config.database.url);

                let db = Arc::new(db);
                let mut state = Self::with_directory(config, db.clone())?;
                state.db = Some(db);
                Ok(state)
            }
            DirectoryBackend::Memory => {
                info!("Using in-memory user directory; accounts are lost on restart");
                Self::with_directory(config, Arc::new(InMemoryUserDirectory::new()))
            }
        }
    }

    pub fn with_directory(config: Settings, directory: Arc<dyn UserDirectory>) -> Result<Self> {
        let auth_service = AuthService::from_config(directory, &config.auth)?;

        Ok(Self {
            config: Arc::new(config),
            auth_service: Arc::new(auth_service),
            db: None,
        })
    }

    pub async fn shutdown(&self) {
        if let Some(db) = &self.db {
            db.close().await;
        }
    }
}

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use tracing::{debug, info};

use crate::auth::session::{expired_session_cookie, extract_token, session_cookie};
use crate::db::{Credentials, RegisterRequest};
use crate::error::{AppError, AuthError};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let request = req.into_inner();
    let email = request.email.clone();
    info!("Received registration request for email: {}", email);

    match state.auth_service.register(request).await {
        Ok(profile) => {
            info!("Registration successful for email: {}", profile.email);
            Ok(HttpResponse::Ok().json(profile))
        }
        Err(e) => {
            debug!("Registration rejected for email: {}: {}", email, e);
            Err(e)
        }
    }
}

pub async fn login(
    req: web::Json<Credentials>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let credentials = req.into_inner();
    let email = credentials.email.clone();
    info!("Received login request for email: {}", email);

    // The service already logs failed attempts at warn.
    let session = state.auth_service.login(credentials).await.map_err(|e| {
        debug!("Login rejected for email: {}: {}", email, e);
        e
    })?;

    let cookie = session_cookie(&session.token, &session.claim, state.config.auth.secure_cookies);
    Ok(HttpResponse::Accepted()
        .cookie(cookie)
        .json(MessageResponse { message: "Login successful" }))
}

pub async fn current_user(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = extract_token(&req).ok_or(AuthError::MissingToken)?;
    let profile = state.auth_service.resolve_identity(&token).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> HttpResponse {
    let token = extract_token(&req);
    state.auth_service.logout(token.as_deref()).await;

    HttpResponse::Accepted()
        .cookie(expired_session_cookie(state.config.auth.secure_cookies))
        .json(MessageResponse { message: "Logout successful" })
}

/// Turn body parse failures into the service's 400 error shape. The parser's
/// message can quote field values, so it only goes to the log.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        debug!("Rejected request body for {}: {}", req.path(), err);
        AppError::ValidationError("Failed to parse request body".to_string()).into()
    })
}

/// Mount the four session endpoints under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(json_config())
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/user", web::get().to(current_user))
            .route("/logout", web::post().to(logout)),
    );
}

pub mod config;
pub mod db;
pub mod email;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod names;
pub mod rejections;
pub mod services;
pub mod utils;
pub mod views;

use std::sync::Arc;

use axum::{
    http::{HeaderName, HeaderValue, Request},
    middleware, Router,
};

use config::Config;
use email::ResendEmailSender;
use services::{auth::AuthService, invitation::InvitationService, notification::NotificationService};

#[derive(Clone)]
pub struct AppState {
    pub db: db::Db,
    pub auth: AuthService,
    pub invitations: InvitationService,
    pub notifications: NotificationService,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: db::Db, config: Config) -> Self {
        let email = ResendEmailSender::new(config.resend_api_key.clone(), config.from_email.clone());
        Self {
            auth: AuthService::new(db.clone()),
            invitations: InvitationService::new(
                db.clone(),
                email.clone(),
                config.base_url.clone(),
                config.invitation_expiry_days,
            ),
            notifications: NotificationService::new(db.clone(), email),
            db,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::account::routes())
        .merge(handlers::quiz::routes())
        .merge(handlers::admin::routes())
        .layer(middleware::from_fn(echo_quiz_token))
        .with_state(state)
}

/// Participants authenticated by invitation key get it back in the
/// `Quiz-Token` response header.
async fn echo_quiz_token(
    req: Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    let (parts, body) = req.into_parts();
    let token = extractors::QuizToken::from_parts(&parts);
    let req = Request::from_parts(parts, body);

    let mut resp = next.run(req).await;

    let header = HeaderName::from_static(names::QUIZ_TOKEN_HEADER);
    if let Some(token) = token {
        if !resp.headers().contains_key(&header) {
            if let Ok(value) = HeaderValue::from_str(&token) {
                resp.headers_mut().insert(header, value);
            }
        }
    }

    resp
}

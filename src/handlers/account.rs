use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    extractors::{JsonBody, SessionToken},
    names,
    rejections::{AppError, ResultExt},
    services::auth::{LoginOutcome, RegisterOutcome},
    utils, AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(names::REGISTER_URL, post(register_post))
        .route(names::LOGIN_URL, post(login_post))
        .route(names::LOGOUT_URL, post(logout_post))
}

#[derive(Deserialize)]
struct RegisterPost {
    email: String,
    display_name: String,
    password: String,
}

async fn register_post(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterPost>,
) -> Result<axum::response::Response, AppError> {
    let outcome = state
        .auth
        .register(&body.email, &body.password, &body.display_name)
        .await
        .reject("registration failed")?;

    match outcome {
        RegisterOutcome::LoggedIn(session_token) => {
            let email = utils::normalize_email(&body.email);
            if state
                .config
                .admin_emails
                .iter()
                .any(|admin| utils::normalize_email(admin) == email)
            {
                state
                    .db
                    .set_admin(&email)
                    .await
                    .reject("could not grant admin rights")?;
            }

            let cookie = utils::cookie(
                names::USER_SESSION_COOKIE_NAME,
                &session_token,
                state.config.secure_cookies,
            );
            Ok((
                StatusCode::CREATED,
                [(SET_COOKIE, cookie)],
                Json(json!({ "token": session_token })),
            )
                .into_response())
        }
        RegisterOutcome::EmptyFields => {
            Err(AppError::input("Email, display name and password are required"))
        }
        RegisterOutcome::InvalidEmail => Err(AppError::input("Enter a valid email address.")),
        RegisterOutcome::EmailTaken => Err(AppError::input("user with this email already exists.")),
        RegisterOutcome::WeakPassword => Err(AppError::input(
            "This password is too short. It must contain at least 8 characters.",
        )),
    }
}

#[derive(Deserialize)]
struct LoginPost {
    email: String,
    password: String,
}

async fn login_post(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginPost>,
) -> Result<axum::response::Response, AppError> {
    let outcome = state
        .auth
        .login(&body.email, &body.password)
        .await
        .reject("login failed")?;

    match outcome {
        LoginOutcome::Success(session_token) => {
            let cookie = utils::cookie(
                names::USER_SESSION_COOKIE_NAME,
                &session_token,
                state.config.secure_cookies,
            );
            Ok((
                [(SET_COOKIE, cookie)],
                Json(json!({ "token": session_token })),
            )
                .into_response())
        }
        LoginOutcome::InvalidCredentials => Err(AppError::input(
            "Unable to log in with provided credentials.",
        )),
    }
}

async fn logout_post(
    SessionToken(token): SessionToken,
    State(state): State<AppState>,
) -> impl IntoResponse {
    if let Some(session_id) = token {
        if let Err(e) = state.auth.logout(&session_id).await {
            tracing::error!("could not delete session: {e}");
        }
    }

    let clear = utils::clear_cookie(names::USER_SESSION_COOKIE_NAME, state.config.secure_cookies);
    (StatusCode::NO_CONTENT, [(SET_COOKIE, clear)])
}

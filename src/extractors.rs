use std::convert::Infallible;

use axum::{
    extract::{FromRequest, FromRequestParts, Query},
    http::{header, request::Parts},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::{db::models::AuthUser, names, rejections::AppError, AppState};

/// `axum::Json` whose rejection renders as an [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Query` whose rejection renders as an [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

/// Session token from the `user_session` cookie or an `Authorization: Bearer` header.
pub fn session_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(names::USER_SESSION_COOKIE_NAME) {
        return Some(cookie.value().to_string());
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Raw session token, whether or not it is still valid.
pub struct SessionToken(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for SessionToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionToken(session_token(parts)))
    }
}

async fn current_user(parts: &Parts, state: &AppState) -> Option<AuthUser> {
    let token = session_token(parts)?;
    match state.db.get_user_by_session(&token).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("could not look up session: {e}");
            None
        }
    }
}

/// Guard extractor that verifies the user session against the database.
/// Carries the authenticated user's info for use in handlers.
pub struct AuthGuard(pub AuthUser);

impl FromRequestParts<AppState> for AuthGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        current_user(parts, state)
            .await
            .map(AuthGuard)
            .ok_or(AppError::Unauthorized)
    }
}

/// The logged-in user, if any.
pub struct MaybeUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(current_user(parts, state).await))
    }
}

/// Like [`AuthGuard`], but the user must also be an admin.
pub struct AdminGuard(pub AuthUser);

impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthGuard(user) = AuthGuard::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::warn!("user {} tried to reach an admin route", user.id);
            return Err(AppError::Forbidden);
        }
        Ok(AdminGuard(user))
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Participant invitation key from `?token=` or the `Quiz-Token` header.
pub struct QuizToken(pub Option<String>);

impl QuizToken {
    pub fn from_parts(parts: &Parts) -> Option<String> {
        let from_query = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.token);

        from_query
            .or_else(|| {
                parts
                    .headers
                    .get(names::QUIZ_TOKEN_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            })
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for QuizToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(QuizToken(QuizToken::from_parts(parts)))
    }
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    db::{InvitationState, Page, ParticipantListItem, QuizSummary},
    extractors::{AuthGuard, QueryParams},
    rejections::{AppError, ResultExt},
    AppState,
};

use super::owned_quiz;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/quizmaker/quizzes/{id}/summary", get(quiz_summary))
        .route("/quizmaker/quizzes/{id}/invitees", get(invitees))
        .route("/quizmaker/quizzes/{id}/participants", get(participants))
        .route(
            "/quizmaker/quizzes/{id}/notify-participants",
            post(notify_participants),
        )
}

async fn quiz_summary(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(quiz_id): Path<i64>,
) -> Result<Json<QuizSummary>, AppError> {
    let quiz = owned_quiz(&state, quiz_id, &user).await?;
    let summary = state
        .db
        .quiz_summary(quiz.id)
        .await
        .reject("could not get quiz summary")?;

    Ok(Json(summary))
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<i64>,
}

#[derive(Serialize)]
struct Invitee {
    id: i64,
    email: String,
    state: InvitationState,
    sent: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

async fn invitees(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(quiz_id): Path<i64>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<Page<Invitee>>, AppError> {
    let quiz = owned_quiz(&state, quiz_id, &user).await?;
    let invitations = state
        .db
        .invitations_for_quiz(quiz.id, query.page.unwrap_or(1))
        .await
        .reject("could not list invitees")?;

    let now = Utc::now();
    let expiry_days = state.invitations.expiry_days();
    Ok(Json(Page {
        count: invitations.count,
        page: invitations.page,
        results: invitations
            .results
            .into_iter()
            .map(|i| Invitee {
                id: i.id,
                state: i.state(now, expiry_days),
                email: i.email,
                sent: i.sent,
                created_at: i.created_at,
            })
            .collect(),
    }))
}

#[derive(Deserialize)]
struct ParticipantQuery {
    email: Option<String>,
    page: Option<i64>,
}

async fn participants(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(quiz_id): Path<i64>,
    QueryParams(query): QueryParams<ParticipantQuery>,
) -> Result<Json<Page<ParticipantListItem>>, AppError> {
    let quiz = owned_quiz(&state, quiz_id, &user).await?;
    let participants = state
        .db
        .participants_for_quiz(quiz.id, query.email.as_deref(), query.page.unwrap_or(1))
        .await
        .reject("could not list participants")?;

    Ok(Json(participants))
}

async fn notify_participants(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = owned_quiz(&state, quiz_id, &user).await?;

    let notifications = state.notifications.clone();
    tokio::spawn(async move {
        if let Err(e) = notifications.notify_participants(quiz.id).await {
            tracing::error!("notifying participants of quiz={} failed: {e}", quiz.id);
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "detail": "Participants will be notified" })),
    ))
}

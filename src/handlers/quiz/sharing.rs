use axum::{
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    extractors::{AuthGuard, JsonBody, MaybeUser},
    names,
    rejections::{AppError, FieldErrors, ResultExt},
    services::invitation::{AcceptOutcome, InvitationError, InviteReport},
    AppState,
};

use super::owned_quiz;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/quizmaker/quizzes/{id}/invite", post(invite))
        .route("/accept-invite/{key}", get(accept_invite))
}

#[derive(Deserialize)]
struct InvitePost {
    emails: Vec<String>,
}

#[derive(Serialize)]
struct InviteResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'static str>,
    #[serde(flatten)]
    report: InviteReport,
}

async fn invite(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(quiz_id): Path<i64>,
    JsonBody(body): JsonBody<InvitePost>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = owned_quiz(&state, quiz_id, &user).await?;

    if body.emails.is_empty() {
        return Err(AppError::Validation(FieldErrors::single(
            "emails",
            "This list may not be empty.",
        )));
    }
    if body.emails.len() > names::MAX_INVITEES_PER_REQUEST {
        return Err(AppError::Validation(FieldErrors::single(
            "emails",
            &format!(
                "Ensure this field has no more than {} elements.",
                names::MAX_INVITEES_PER_REQUEST
            ),
        )));
    }

    let (status, detail, report) = match state.invitations.invite(&quiz, &body.emails, &user).await
    {
        Ok(report) if report.any_invited() => (StatusCode::CREATED, None, report),
        Ok(report) => (StatusCode::BAD_REQUEST, None, report),
        Err(InvitationError::QuizClosed) => {
            return Err(AppError::input("This quiz is closed"));
        }
        // Whatever was mailed before the failure is still listed.
        Err(InvitationError::MailUnavailable(report)) => (
            StatusCode::BAD_REQUEST,
            Some("Mail service is temporarily unavailable"),
            report,
        ),
        Err(InvitationError::Other(e)) => {
            tracing::error!("could not invite: {e}");
            return Err(AppError::Internal("could not invite"));
        }
    };

    Ok((status, Json(InviteResponse { detail, report })))
}

async fn accept_invite(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<axum::response::Response, AppError> {
    let outcome = state
        .invitations
        .accept(&key, user.as_ref())
        .await
        .reject("could not accept invitation")?;

    match outcome {
        AcceptOutcome::Quiz(url) => {
            let token = HeaderValue::from_str(&key).map_err(|_| AppError::Gone)?;
            Ok((
                [(HeaderName::from_static(names::QUIZ_TOKEN_HEADER), token)],
                Json(json!({ "quiz": url })),
            )
                .into_response())
        }
        AcceptOutcome::Gone => Err(AppError::Gone),
        AcceptOutcome::ParticipantExists => Err(AppError::input(
            "Participant with this email is already taking part in this quiz",
        )),
    }
}

mod crud;
mod dashboard;
mod question;
mod session;
mod sharing;

use axum::Router;

use crate::{
    db::{AuthUser, Participant, QuizRecord},
    rejections::{AppError, ResultExt},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(crud::routes())
        .merge(dashboard::routes())
        .merge(question::routes())
        .merge(session::routes())
        .merge(sharing::routes())
}

/// The quiz if `user` authored it, otherwise 404.
async fn owned_quiz(state: &AppState, quiz_id: i64, user: &AuthUser) -> Result<QuizRecord, AppError> {
    state
        .db
        .author_quiz(quiz_id, user.id)
        .await
        .reject("could not get quiz")?
        .ok_or(AppError::NotFound)
}

/// Resolve the participant taking `quiz`, by invitation key first and then
/// by the logged-in user.
async fn quiz_participant(
    state: &AppState,
    quiz: &QuizRecord,
    user: Option<&AuthUser>,
    token: Option<&str>,
) -> Result<Participant, AppError> {
    if token.is_none() && user.is_none() {
        return Err(AppError::Unauthorized);
    }

    if let Some(token) = token {
        let participant = state
            .db
            .participant_by_key(token)
            .await
            .reject("could not get participant")?;
        if let Some(participant) = participant.filter(|p| p.quiz_id == quiz.id) {
            return Ok(participant);
        }
    }

    if let Some(user) = user {
        let participant = state
            .db
            .participant_for_user(quiz.id, user.id)
            .await
            .reject("could not get participant")?;
        if let Some(participant) = participant {
            return Ok(participant);
        }
    }

    Err(AppError::NotFound)
}

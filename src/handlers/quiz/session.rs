use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::{
    db::{AnswerOutcome, Progress, QuizRecord, QuizStatus, TakeQuiz},
    extractors::{JsonBody, MaybeUser, QuizToken},
    models::SubmitAnswer,
    rejections::{AppError, ResultExt},
    AppState,
};

use super::quiz_participant;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/quizzes", get(my_quizzes))
        .route("/quizzes/{slug}", get(take_quiz))
        .route("/quizzes/{slug}/answer", post(submit_answer))
        .route("/quizzes/{slug}/my-progress", get(my_progress))
}

async fn quiz_by_slug(state: &AppState, slug: &str) -> Result<QuizRecord, AppError> {
    state
        .db
        .quiz_by_slug(slug)
        .await
        .reject("could not get quiz")?
        .ok_or(AppError::NotFound)
}

async fn my_quizzes(
    MaybeUser(user): MaybeUser,
    QuizToken(token): QuizToken,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuizRecord>>, AppError> {
    if user.is_none() && token.is_none() {
        return Err(AppError::Unauthorized);
    }

    let participant_id = match token.as_deref() {
        Some(token) => state
            .db
            .participant_by_key(token)
            .await
            .reject("could not get participant")?
            .map(|p| p.id),
        None => None,
    };

    let quizzes = state
        .db
        .quizzes_for_participant(user.map(|u| u.id), participant_id)
        .await
        .reject("could not list quizzes")?;

    Ok(Json(quizzes))
}

async fn take_quiz(
    MaybeUser(user): MaybeUser,
    QuizToken(token): QuizToken,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<TakeQuiz>, AppError> {
    let quiz = quiz_by_slug(&state, &slug).await?;
    quiz_participant(&state, &quiz, user.as_ref(), token.as_deref()).await?;

    let quiz = state
        .db
        .take_quiz(quiz)
        .await
        .reject("could not get quiz")?;

    Ok(Json(quiz))
}

async fn submit_answer(
    MaybeUser(user): MaybeUser,
    QuizToken(token): QuizToken,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    JsonBody(body): JsonBody<SubmitAnswer>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = quiz_by_slug(&state, &slug).await?;
    let participant = quiz_participant(&state, &quiz, user.as_ref(), token.as_deref()).await?;

    if quiz.status == QuizStatus::Closed {
        return Err(AppError::input("This quiz is closed"));
    }

    let outcome = state
        .db
        .submit_answer(&participant, body.question, body.answer)
        .await
        .reject("could not record answer")?;

    match outcome {
        AnswerOutcome::Recorded(status) => {
            tracing::debug!("participant={} is now {}", participant.id, status.as_str());
        }
        AnswerOutcome::AlreadyCompleted => {
            return Err(AppError::input("You have already completed this quiz"))
        }
        AnswerOutcome::QuestionNotInQuiz => return Err(AppError::input("Invalid question")),
        AnswerOutcome::AnswerNotInQuestion => return Err(AppError::input("Wrong answer")),
        AnswerOutcome::AlreadyAnswered => {
            return Err(AppError::input("You have already answered this question"))
        }
    }

    let participant = state
        .db
        .participant_by_id(participant.id)
        .await
        .reject("could not reload participant")?
        .ok_or(AppError::Internal("participant disappeared"))?;
    let progress = state
        .db
        .progress(&participant)
        .await
        .reject("could not compute progress")?;

    Ok((StatusCode::CREATED, Json(progress)))
}

async fn my_progress(
    MaybeUser(user): MaybeUser,
    QuizToken(token): QuizToken,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Progress>, AppError> {
    let quiz = quiz_by_slug(&state, &slug).await?;
    let participant = quiz_participant(&state, &quiz, user.as_ref(), token.as_deref()).await?;

    let progress = state
        .db
        .progress(&participant)
        .await
        .reject("could not compute progress")?;

    Ok(Json(progress))
}

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::{
    db::{AnswerModel, QuestionModel},
    extractors::AuthGuard,
    rejections::{AppError, ResultExt},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/questions", get(list_questions))
        .route("/questions/{id}", get(question_detail))
        .route("/answers", get(list_answers))
        .route("/answers/{id}", get(answer_detail))
}

async fn list_questions(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuestionModel>>, AppError> {
    let questions = state
        .db
        .author_questions(user.id)
        .await
        .reject("could not list questions")?;

    Ok(Json(questions))
}

async fn question_detail(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
) -> Result<Json<QuestionModel>, AppError> {
    state
        .db
        .author_question(question_id, user.id)
        .await
        .reject("could not get question")?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn list_answers(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
) -> Result<Json<Vec<AnswerModel>>, AppError> {
    let answers = state
        .db
        .author_answers(user.id)
        .await
        .reject("could not list answers")?;

    Ok(Json(answers))
}

async fn answer_detail(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(answer_id): Path<i64>,
) -> Result<Json<AnswerModel>, AppError> {
    state
        .db
        .author_answer(answer_id, user.id)
        .await
        .reject("could not get answer")?
        .map(Json)
        .ok_or(AppError::NotFound)
}

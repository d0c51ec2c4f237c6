use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};

use crate::{
    db::{CreateQuizOutcome, Page, QuestionModel, QuizDetail, QuizFilter, QuizListItem},
    extractors::{AuthGuard, JsonBody, QueryParams},
    models::{NewQuiz, StatusChange},
    rejections::{AppError, FieldErrors, ResultExt},
    services::authoring::{self, QuizLimits},
    AppState,
};

use super::owned_quiz;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/quizmaker/quizzes", get(list_quizzes).post(create_quiz))
        .route("/quizmaker/quizzes/{id}", get(quiz_detail))
        .route("/quizmaker/quizzes/{id}/status", patch(change_status))
        .route("/quizmaker/quizzes/{id}/questions", get(quiz_questions))
}

async fn list_quizzes(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<QuizFilter>,
) -> Result<Json<Page<QuizListItem>>, AppError> {
    let page = state
        .db
        .quizzes_for_author(user.id, &filter)
        .await
        .reject("could not list quizzes")?;

    Ok(Json(page))
}

async fn create_quiz(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<NewQuiz>,
) -> Result<impl IntoResponse, AppError> {
    authoring::validate_quiz(&body, &QuizLimits::from(state.config.as_ref()))
        .map_err(AppError::Validation)?;

    let quiz_id = match state
        .db
        .create_quiz(&body, user.id)
        .await
        .reject("could not create quiz")?
    {
        CreateQuizOutcome::Created(id) => id,
        CreateQuizOutcome::TitleTaken => {
            return Err(AppError::Validation(FieldErrors::single(
                "title",
                authoring::TITLE_TAKEN,
            )))
        }
    };

    let quiz = owned_quiz(&state, quiz_id, &user).await?;
    let detail = state
        .db
        .quiz_detail(quiz)
        .await
        .reject("could not load created quiz")?;

    Ok((StatusCode::CREATED, Json(detail)))
}

async fn quiz_detail(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(quiz_id): Path<i64>,
) -> Result<Json<QuizDetail>, AppError> {
    let quiz = owned_quiz(&state, quiz_id, &user).await?;
    let detail = state
        .db
        .quiz_detail(quiz)
        .await
        .reject("could not get quiz")?;

    Ok(Json(detail))
}

async fn change_status(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(quiz_id): Path<i64>,
    JsonBody(body): JsonBody<StatusChange>,
) -> Result<Json<QuizDetail>, AppError> {
    let mut quiz = owned_quiz(&state, quiz_id, &user).await?;

    if quiz.status != body.status {
        if !quiz.status.can_become(body.status) {
            return Err(AppError::input(format!(
                "Cannot change status from {} to {}",
                quiz.status.as_str(),
                body.status.as_str()
            )));
        }

        state
            .db
            .set_quiz_status(quiz.id, body.status)
            .await
            .reject("could not change quiz status")?;
        quiz.status = body.status;
    }

    let detail = state
        .db
        .quiz_detail(quiz)
        .await
        .reject("could not get quiz")?;

    Ok(Json(detail))
}

async fn quiz_questions(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(quiz_id): Path<i64>,
) -> Result<Json<Vec<QuestionModel>>, AppError> {
    let quiz = owned_quiz(&state, quiz_id, &user).await?;
    let questions = state
        .db
        .questions_with_answers(quiz.id)
        .await
        .reject("could not get questions")?;

    Ok(Json(questions))
}

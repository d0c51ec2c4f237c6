use serde::Deserialize;
use validator::Validate;

use crate::db::QuizStatus;

/// Quiz create request with its embedded question/answer graph.
///
/// Counts that depend on configuration are checked in
/// [`crate::services::authoring::validate_quiz`].
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewQuiz {
    #[validate(
        custom(function = "crate::services::authoring::not_blank"),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Ensure this field has no more than 1000 characters."))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "crate::services::authoring::no_blank_items"))]
    pub tags: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub questions: Vec<NewQuestion>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[validate(schema(
    function = "crate::services::authoring::answer_set",
    skip_on_field_errors = false
))]
pub struct NewQuestion {
    #[validate(
        custom(function = "crate::services::authoring::not_blank"),
        length(max = 300, message = "Ensure this field has no more than 300 characters.")
    )]
    pub question: String,
    #[serde(default = "default_score")]
    pub score: u32,
    #[serde(default)]
    #[validate(nested)]
    pub answers: Vec<NewAnswer>,
}

fn default_score() -> u32 {
    1
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewAnswer {
    #[validate(
        custom(function = "crate::services::authoring::not_blank"),
        length(max = 1024, message = "Ensure this field has no more than 1024 characters.")
    )]
    pub answer: String,
    #[serde(default)]
    pub correct: bool,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswer {
    pub question: i64,
    pub answer: i64,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: QuizStatus,
}

use std::borrow::Cow;
use std::collections::HashSet;

use validator::{Validate, ValidationError};

use crate::config::Config;
use crate::models::{NewQuestion, NewQuiz};
use crate::names;
use crate::rejections::FieldErrors;

pub const BLANK: &str = "This field may not be blank.";
pub const EMPTY_LIST: &str = "This list may not be empty.";
pub const NO_CORRECT_ANSWER: &str = "Correct answer is not specified";
pub const SEVERAL_CORRECT_ANSWERS: &str = "More than one correct answer is specified";
pub const DUPLICATE_ANSWER: &str = "Answers must be unique within a question.";
pub const TITLE_TAKEN: &str = "quiz with this title already exists.";

#[derive(Clone, Copy, Debug)]
pub struct QuizLimits {
    pub max_questions: usize,
    pub max_answers: usize,
}

impl From<&Config> for QuizLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_questions: config.max_questions_per_quiz,
            max_answers: config.max_answers_per_question,
        }
    }
}

fn too_many(max: usize) -> String {
    format!("Ensure this field has no more than {max} elements.")
}

fn too_few(min: usize) -> String {
    format!("Ensure this field has at least {min} elements.")
}

fn failure(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(failure("blank", BLANK));
    }
    Ok(())
}

pub fn no_blank_items(items: &[String]) -> Result<(), ValidationError> {
    if items.iter().any(|item| item.trim().is_empty()) {
        return Err(failure("blank", BLANK));
    }
    Ok(())
}

/// Checks on a question's answer list as a whole. Reported under
/// `questions[i].answers`.
pub fn answer_set(question: &NewQuestion) -> Result<(), ValidationError> {
    let answers = &question.answers;

    if answers.len() < names::MIN_ANSWERS_PER_QUESTION {
        return Err(failure("too_few", too_few(names::MIN_ANSWERS_PER_QUESTION)));
    }

    match answers.iter().filter(|a| a.correct).count() {
        0 => return Err(failure("no_correct_answer", NO_CORRECT_ANSWER)),
        1 => {}
        _ => return Err(failure("several_correct_answers", SEVERAL_CORRECT_ANSWERS)),
    }

    let mut seen = HashSet::new();
    if !answers.iter().all(|a| seen.insert(a.answer.trim())) {
        return Err(failure("duplicate_answer", DUPLICATE_ANSWER));
    }

    Ok(())
}

/// Validate the whole quiz graph. Every problem is collected; nothing is
/// persisted unless this returns `Ok`.
pub fn validate_quiz(quiz: &NewQuiz, limits: &QuizLimits) -> Result<(), FieldErrors> {
    let mut errors = match quiz.validate() {
        Ok(()) => FieldErrors::default(),
        Err(e) => FieldErrors::from(&e),
    };

    if quiz.questions.is_empty() {
        errors.add("questions", EMPTY_LIST);
    } else if quiz.questions.len() > limits.max_questions {
        errors.add("questions", too_many(limits.max_questions));
    }

    for (i, question) in quiz.questions.iter().enumerate() {
        if question.answers.len() > limits.max_answers {
            errors.add(format!("questions[{i}].answers"), too_many(limits.max_answers));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

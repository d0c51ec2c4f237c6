use std::collections::HashMap;

use color_eyre::Result;

use super::models::{AnswerModel, QuestionModel};
use super::Db;

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    question: String,
    score: i64,
}

impl Db {
    /// Questions of a quiz in order, each with its ordered answers.
    pub async fn questions_with_answers(&self, quiz_id: i64) -> Result<Vec<QuestionModel>> {
        let questions = sqlx::query_as::<_, QuestionRow>(
            "SELECT id, question, score FROM questions WHERE quiz_id = $1 ORDER BY position",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        let answers = sqlx::query_as::<_, AnswerModel>(
            r#"
            SELECT a.id, a.question_id, a.answer, a.correct
            FROM answers a
            JOIN questions q ON q.id = a.question_id
            WHERE q.quiz_id = $1
            ORDER BY a.question_id, a.position
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble(questions, answers))
    }

    pub async fn questions_count(&self, quiz_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Questions the participant has not answered yet, in quiz order.
    pub async fn remaining_questions(
        &self,
        quiz_id: i64,
        participant_id: i64,
    ) -> Result<Vec<QuestionModel>> {
        let answered: Vec<i64> = sqlx::query_scalar(
            "SELECT question_id FROM participant_answers WHERE participant_id = $1",
        )
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;

        let mut questions = self.questions_with_answers(quiz_id).await?;
        questions.retain(|q| !answered.contains(&q.id));
        Ok(questions)
    }

    pub async fn author_questions(&self, author_id: i64) -> Result<Vec<QuestionModel>> {
        let questions = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT q.id, q.question, q.score
            FROM questions q
            JOIN quizzes z ON z.id = q.quiz_id
            WHERE z.author_id = $1
            ORDER BY q.quiz_id, q.position
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        let answers = self.author_answers(author_id).await?;
        Ok(assemble(questions, answers))
    }

    pub async fn author_question(
        &self,
        question_id: i64,
        author_id: i64,
    ) -> Result<Option<QuestionModel>> {
        let question = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT q.id, q.question, q.score
            FROM questions q
            JOIN quizzes z ON z.id = q.quiz_id
            WHERE q.id = $1 AND z.author_id = $2
            "#,
        )
        .bind(question_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(question) = question else {
            return Ok(None);
        };

        let answers = sqlx::query_as::<_, AnswerModel>(
            "SELECT id, question_id, answer, correct FROM answers WHERE question_id = $1 ORDER BY position",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble(vec![question], answers).pop())
    }

    pub async fn author_answers(&self, author_id: i64) -> Result<Vec<AnswerModel>> {
        let answers = sqlx::query_as::<_, AnswerModel>(
            r#"
            SELECT a.id, a.question_id, a.answer, a.correct
            FROM answers a
            JOIN questions q ON q.id = a.question_id
            JOIN quizzes z ON z.id = q.quiz_id
            WHERE z.author_id = $1
            ORDER BY a.question_id, a.position
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(answers)
    }

    pub async fn author_answer(&self, answer_id: i64, author_id: i64) -> Result<Option<AnswerModel>> {
        let answer = sqlx::query_as::<_, AnswerModel>(
            r#"
            SELECT a.id, a.question_id, a.answer, a.correct
            FROM answers a
            JOIN questions q ON q.id = a.question_id
            JOIN quizzes z ON z.id = q.quiz_id
            WHERE a.id = $1 AND z.author_id = $2
            "#,
        )
        .bind(answer_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(answer)
    }
}

fn assemble(questions: Vec<QuestionRow>, answers: Vec<AnswerModel>) -> Vec<QuestionModel> {
    let mut by_question: HashMap<i64, Vec<AnswerModel>> = HashMap::new();
    for answer in answers {
        by_question.entry(answer.question_id).or_default().push(answer);
    }

    questions
        .into_iter()
        .map(|q| QuestionModel {
            answers: by_question.remove(&q.id).unwrap_or_default(),
            id: q.id,
            question: q.question,
            score: q.score,
        })
        .collect()
}

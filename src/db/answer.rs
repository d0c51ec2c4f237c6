use chrono::Utc;
use color_eyre::Result;

use super::models::{Participant, ParticipantStatus};
use super::{is_unique_violation, Db};

pub enum AnswerOutcome {
    /// Answer stored; carries the participant's status afterwards.
    Recorded(ParticipantStatus),
    AlreadyCompleted,
    QuestionNotInQuiz,
    AnswerNotInQuestion,
    AlreadyAnswered,
}

impl Db {
    /// Record a participant's answer and recompute status and score in one transaction.
    pub async fn submit_answer(
        &self,
        participant: &Participant,
        question_id: i64,
        answer_id: i64,
    ) -> Result<AnswerOutcome> {
        let mut tx = self.pool.begin().await?;

        let status: ParticipantStatus =
            sqlx::query_scalar("SELECT status FROM quiz_participants WHERE id = $1")
                .bind(participant.id)
                .fetch_one(&mut *tx)
                .await?;

        if status == ParticipantStatus::Completed {
            return Ok(AnswerOutcome::AlreadyCompleted);
        }

        let question_in_quiz: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM questions WHERE id = $1 AND quiz_id = $2)",
        )
        .bind(question_id)
        .bind(participant.quiz_id)
        .fetch_one(&mut *tx)
        .await?;

        if !question_in_quiz {
            return Ok(AnswerOutcome::QuestionNotInQuiz);
        }

        let answer_in_question: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM answers WHERE id = $1 AND question_id = $2)",
        )
        .bind(answer_id)
        .bind(question_id)
        .fetch_one(&mut *tx)
        .await?;

        if !answer_in_question {
            return Ok(AnswerOutcome::AnswerNotInQuestion);
        }

        let now = Utc::now();
        let inserted = sqlx::query(
            "INSERT INTO participant_answers (participant_id, question_id, answer_id, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(participant.id)
        .bind(question_id)
        .bind(answer_id)
        .bind(now)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!(
                    "participant={} answered question={question_id} twice",
                    participant.id
                );
                return Ok(AnswerOutcome::AlreadyAnswered);
            }
            Err(e) => return Err(e.into()),
        }

        let answered: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM participant_answers WHERE participant_id = $1",
        )
        .bind(participant.id)
        .fetch_one(&mut *tx)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
            .bind(participant.quiz_id)
            .fetch_one(&mut *tx)
            .await?;

        let status = ParticipantStatus::after_answering(answered, total);

        if status == ParticipantStatus::Completed {
            let score: i64 = sqlx::query_scalar(
                r#"
                SELECT COALESCE(SUM(q.score), 0)
                FROM participant_answers pa
                JOIN answers a ON a.id = pa.answer_id
                JOIN questions q ON q.id = pa.question_id
                WHERE pa.participant_id = $1 AND a.correct = 1
                "#,
            )
            .bind(participant.id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE quiz_participants SET status = $1, score = $2, completed_at = $3 WHERE id = $4",
            )
            .bind(status)
            .bind(score)
            .bind(now)
            .bind(participant.id)
            .execute(&mut *tx)
            .await?;

            tracing::info!(
                "participant={} completed quiz={} with score {score}",
                participant.id,
                participant.quiz_id
            );
        } else {
            sqlx::query("UPDATE quiz_participants SET status = $1 WHERE id = $2")
                .bind(status)
                .bind(participant.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "answer recorded for participant={} question={question_id}: {answered}/{total}",
            participant.id
        );
        Ok(AnswerOutcome::Recorded(status))
    }
}

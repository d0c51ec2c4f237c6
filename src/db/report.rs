use chrono::NaiveDate;
use color_eyre::Result;

use super::models::{ParticipantReportEntry, QuizReportEntry};
use super::Db;

impl Db {
    /// Quizzes created on `day`, with their question counts.
    pub async fn quizzes_created_on(&self, day: NaiveDate) -> Result<Vec<QuizReportEntry>> {
        let entries = sqlx::query_as::<_, QuizReportEntry>(
            r#"
            SELECT
                z.title AS title,
                u.display_name AS author,
                (SELECT COUNT(*) FROM questions q WHERE q.quiz_id = z.id) AS questions_count,
                z.created_at AS created_at
            FROM quizzes z
            JOIN users u ON u.id = z.author_id
            WHERE date(z.created_at) = $1
            ORDER BY z.id
            "#,
        )
        .bind(day.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Participants created on `day`, scored by their correct answers so far.
    pub async fn participants_created_on(
        &self,
        day: NaiveDate,
    ) -> Result<Vec<ParticipantReportEntry>> {
        let entries = sqlx::query_as::<_, ParticipantReportEntry>(
            r#"
            SELECT
                z.title AS quiz,
                p.email AS email,
                p.status AS status,
                (
                    SELECT COALESCE(SUM(q.score), 0)
                    FROM participant_answers pa
                    JOIN answers a ON a.id = pa.answer_id
                    JOIN questions q ON q.id = pa.question_id
                    WHERE pa.participant_id = p.id AND a.correct = 1
                ) AS score,
                (SELECT COUNT(*) FROM participant_answers pa WHERE pa.participant_id = p.id) AS answers_given,
                p.created_at AS created_at
            FROM quiz_participants p
            JOIN quizzes z ON z.id = p.quiz_id
            WHERE date(p.created_at) = $1
            ORDER BY p.id
            "#,
        )
        .bind(day.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

use color_eyre::Result;

use super::models::{
    AnsweredQuestion, Page, Participant, ParticipantListItem, ParticipantResult,
    ParticipantStatus, Progress,
};
use super::Db;
use crate::{names, utils};

const PARTICIPANT_COLUMNS: &str =
    "id, quiz_id, user_id, email, status, score, access_key, notified, completed_at, created_at";

#[derive(sqlx::FromRow)]
struct CompletedRow {
    id: i64,
    email: String,
    score: i64,
    quiz_title: String,
}

impl Db {
    pub async fn participant_by_key(&self, key: &str) -> Result<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM quiz_participants WHERE access_key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    pub async fn participant_for_user(
        &self,
        quiz_id: i64,
        user_id: i64,
    ) -> Result<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM quiz_participants WHERE quiz_id = $1 AND user_id = $2"
        ))
        .bind(quiz_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    pub async fn participant_by_id(&self, participant_id: i64) -> Result<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM quiz_participants WHERE id = $1"
        ))
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    pub async fn participants_for_quiz(
        &self,
        quiz_id: i64,
        email: Option<&str>,
        page: i64,
    ) -> Result<Page<ParticipantListItem>> {
        let page = super::clamp_page(page);
        let pattern = super::contains_pattern(email.unwrap_or_default());

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quiz_participants WHERE quiz_id = $1 AND email LIKE $2 ESCAPE '\\'",
        )
        .bind(quiz_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let participants = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM quiz_participants WHERE quiz_id = $1 AND email LIKE $2 ESCAPE '\\' ORDER BY id LIMIT $3 OFFSET $4"
        ))
        .bind(quiz_id)
        .bind(&pattern)
        .bind(names::PAGE_SIZE)
        .bind((page - 1) * names::PAGE_SIZE)
        .fetch_all(&self.pool)
        .await?;

        let max_score = self.max_score(quiz_id).await?;
        let mut results = Vec::with_capacity(participants.len());
        for participant in participants {
            let score = match participant.score {
                Some(score) => score,
                None => self.running_score(participant.id).await?,
            };
            results.push(ParticipantListItem {
                id: participant.id,
                email: participant.email,
                status: participant.status,
                completed_at: participant.completed_at,
                score_str: format!("{score} out of {max_score}"),
            });
        }

        Ok(Page {
            count,
            page,
            results,
        })
    }

    /// Sum of scores of the questions the participant answered correctly so far.
    pub async fn running_score(&self, participant_id: i64) -> Result<i64> {
        let score: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(q.score), 0)
            FROM participant_answers pa
            JOIN answers a ON a.id = pa.answer_id
            JOIN questions q ON q.id = pa.question_id
            WHERE pa.participant_id = $1 AND a.correct = 1
            "#,
        )
        .bind(participant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(score)
    }

    pub async fn answered_count(&self, participant_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM participant_answers WHERE participant_id = $1",
        )
        .bind(participant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn progress(&self, participant: &Participant) -> Result<Progress> {
        let answered = self.answered_count(participant.id).await?;
        let total = self.questions_count(participant.quiz_id).await?;

        let (progress, remaining) = if participant.status == ParticipantStatus::Completed {
            ("100%".to_string(), Vec::new())
        } else {
            let remaining = self
                .remaining_questions(participant.quiz_id, participant.id)
                .await?;
            (utils::percentage(answered, total), remaining)
        };

        Ok(Progress {
            answered_questions_count: answered,
            total_questions_count: total,
            progress,
            remaining_questions: remaining.into_iter().map(Into::into).collect(),
        })
    }

    /// Completed participants of a quiz who have not been sent their results.
    pub async fn completed_unnotified(&self, quiz_id: i64) -> Result<Vec<ParticipantResult>> {
        let rows = sqlx::query_as::<_, CompletedRow>(
            r#"
            SELECT p.id, p.email, COALESCE(p.score, 0) AS score, q.title AS quiz_title
            FROM quiz_participants p
            JOIN quizzes q ON q.id = p.quiz_id
            WHERE p.quiz_id = $1 AND p.status = $2 AND p.notified = 0
            ORDER BY p.id
            "#,
        )
        .bind(quiz_id)
        .bind(ParticipantStatus::Completed)
        .fetch_all(&self.pool)
        .await?;

        let max_score = self.max_score(quiz_id).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let answers = self.participant_answers(row.id).await?;
            results.push(ParticipantResult {
                id: row.id,
                email: row.email,
                score: row.score,
                quiz_title: row.quiz_title,
                max_score,
                answers,
            });
        }

        Ok(results)
    }

    pub async fn participant_answers(&self, participant_id: i64) -> Result<Vec<AnsweredQuestion>> {
        let answers = sqlx::query_as::<_, AnsweredQuestion>(
            r#"
            SELECT q.question AS question, a.answer AS answer, a.correct AS correct
            FROM participant_answers pa
            JOIN questions q ON q.id = pa.question_id
            JOIN answers a ON a.id = pa.answer_id
            WHERE pa.participant_id = $1
            ORDER BY q.position
            "#,
        )
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(answers)
    }

    /// Flip `notified` from false to true. Returns false if someone else already did.
    pub async fn claim_notification(&self, participant_id: i64) -> Result<bool> {
        let claimed = sqlx::query(
            "UPDATE quiz_participants SET notified = 1 WHERE id = $1 AND notified = 0",
        )
        .bind(participant_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(claimed == 1)
    }

    pub async fn release_notification(&self, participant_id: i64) -> Result<()> {
        sqlx::query("UPDATE quiz_participants SET notified = 0 WHERE id = $1")
            .bind(participant_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

use chrono::{NaiveDate, Utc};
use color_eyre::Result;
use sqlx::{QueryBuilder, Sqlite};
use ulid::Ulid;

use super::models::{
    InviteeCount, Page, ParticipantCount, QuizDetail, QuizListItem, QuizRecord, QuizStatus,
    QuizSummary, TakeQuiz,
};
use super::{is_unique_violation, Db};
use crate::{models::NewQuiz, names, utils};

pub enum CreateQuizOutcome {
    Created(i64),
    TitleTaken,
}

/// Author-side list filters.
#[derive(Debug, Default, serde::Deserialize)]
pub struct QuizFilter {
    pub title: Option<String>,
    pub tag: Option<String>,
    pub created_after: Option<NaiveDate>,
    pub created_before: Option<NaiveDate>,
    pub page: Option<i64>,
}

const QUIZ_COLUMNS: &str =
    "id, author_id, title, description, slug, status, created_at, updated_at";

impl Db {
    /// Insert a quiz with all its questions and answers atomically in a transaction.
    /// The payload must already be validated.
    pub async fn create_quiz(&self, quiz: &NewQuiz, author_id: i64) -> Result<CreateQuizOutcome> {
        let now = Utc::now();
        let base_slug = utils::slugify(&quiz.title);
        let mut tx = self.pool.begin().await?;

        let slug_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM quizzes WHERE slug = $1)")
                .bind(&base_slug)
                .fetch_one(&mut *tx)
                .await?;

        // A taken slug gets a placeholder until the id is known.
        let initial_slug = if slug_taken {
            Ulid::new().to_string().to_lowercase()
        } else {
            base_slug.clone()
        };

        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO quizzes (author_id, title, description, slug, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id
            "#,
        )
        .bind(author_id)
        .bind(quiz.title.trim())
        .bind(quiz.description.as_deref())
        .bind(&initial_slug)
        .bind(QuizStatus::Draft)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        let quiz_id = match inserted {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => {
                let title_taken: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM quizzes WHERE title = $1)")
                        .bind(quiz.title.trim())
                        .fetch_one(&mut *tx)
                        .await?;
                if !title_taken {
                    return Err(e.into());
                }
                tracing::warn!("duplicate quiz title attempted: {}", quiz.title);
                return Ok(CreateQuizOutcome::TitleTaken);
            }
            Err(e) => return Err(e.into()),
        };

        if slug_taken {
            // `{slug}-{id}` may itself be another quiz's slug.
            let mut slug = format!("{base_slug}-{quiz_id}");
            let mut attempt = 2;
            loop {
                let taken: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM quizzes WHERE slug = $1)")
                        .bind(&slug)
                        .fetch_one(&mut *tx)
                        .await?;
                if !taken {
                    break;
                }
                slug = format!("{base_slug}-{quiz_id}-{attempt}");
                attempt += 1;
            }

            sqlx::query("UPDATE quizzes SET slug = $1 WHERE id = $2")
                .bind(&slug)
                .bind(quiz_id)
                .execute(&mut *tx)
                .await?;
        }

        for tag in &quiz.tags {
            sqlx::query("INSERT OR IGNORE INTO quiz_tags (quiz_id, name) VALUES ($1, $2)")
                .bind(quiz_id)
                .bind(tag.trim())
                .execute(&mut *tx)
                .await?;
        }

        for (position, question) in quiz.questions.iter().enumerate() {
            let question_id: i64 = sqlx::query_scalar(
                "INSERT INTO questions (quiz_id, position, question, score) VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(quiz_id)
            .bind(position as i64)
            .bind(question.question.trim())
            .bind(i64::from(question.score))
            .fetch_one(&mut *tx)
            .await?;

            for (position, answer) in question.answers.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO answers (question_id, position, answer, correct) VALUES ($1, $2, $3, $4)",
                )
                .bind(question_id)
                .bind(position as i64)
                .bind(answer.answer.trim())
                .bind(answer.correct)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        tracing::info!("new quiz created with id: {quiz_id} for author_id: {author_id}");
        Ok(CreateQuizOutcome::Created(quiz_id))
    }

    pub async fn quizzes_for_author(
        &self,
        author_id: i64,
        filter: &QuizFilter,
    ) -> Result<Page<QuizListItem>> {
        let page = super::clamp_page(filter.page.unwrap_or(1));

        let mut count_query =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM quizzes q WHERE ");
        push_quiz_filter(&mut count_query, author_id, filter);
        let count: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT q.id, q.author_id, q.title, q.description, q.slug, q.status, q.created_at, q.updated_at FROM quizzes q WHERE ",
        );
        push_quiz_filter(&mut query, author_id, filter);
        query
            .push(" ORDER BY q.id DESC LIMIT ")
            .push_bind(names::PAGE_SIZE)
            .push(" OFFSET ")
            .push_bind((page - 1) * names::PAGE_SIZE);

        let records: Vec<QuizRecord> = query.build_query_as().fetch_all(&self.pool).await?;

        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let tags = self.quiz_tags(record.id).await?;
            let question_count = self.questions_count(record.id).await?;
            results.push(QuizListItem {
                id: record.id,
                title: record.title,
                description: record.description,
                slug: record.slug,
                status: record.status,
                tags,
                question_count,
                created_at: record.created_at,
            });
        }

        Ok(Page {
            count,
            page,
            results,
        })
    }

    /// The quiz if `author_id` owns it.
    pub async fn author_quiz(&self, quiz_id: i64, author_id: i64) -> Result<Option<QuizRecord>> {
        let quiz = sqlx::query_as::<_, QuizRecord>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1 AND author_id = $2"
        ))
        .bind(quiz_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz)
    }

    pub async fn quiz_by_slug(&self, slug: &str) -> Result<Option<QuizRecord>> {
        let quiz = sqlx::query_as::<_, QuizRecord>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz)
    }

    pub async fn quiz_by_id(&self, quiz_id: i64) -> Result<Option<QuizRecord>> {
        let quiz = sqlx::query_as::<_, QuizRecord>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1"
        ))
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz)
    }

    pub async fn quiz_tags(&self, quiz_id: i64) -> Result<Vec<String>> {
        let tags: Vec<String> =
            sqlx::query_scalar("SELECT name FROM quiz_tags WHERE quiz_id = $1 ORDER BY name")
                .bind(quiz_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(tags)
    }

    pub async fn quiz_detail(&self, quiz: QuizRecord) -> Result<QuizDetail> {
        let tags = self.quiz_tags(quiz.id).await?;
        let questions = self.questions_with_answers(quiz.id).await?;

        Ok(QuizDetail {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            slug: quiz.slug,
            status: quiz.status,
            tags,
            questions,
            created_at: quiz.created_at,
        })
    }

    pub async fn take_quiz(&self, quiz: QuizRecord) -> Result<TakeQuiz> {
        let tags = self.quiz_tags(quiz.id).await?;
        let questions = self
            .questions_with_answers(quiz.id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(TakeQuiz {
            id: quiz.id,
            slug: quiz.slug,
            title: quiz.title,
            description: quiz.description,
            tags,
            questions,
        })
    }

    /// Quizzes visible to a participant: those the user takes part in, plus
    /// the quiz of the participant identified by an access key.
    pub async fn quizzes_for_participant(
        &self,
        user_id: Option<i64>,
        participant_id: Option<i64>,
    ) -> Result<Vec<QuizRecord>> {
        if user_id.is_none() && participant_id.is_none() {
            return Ok(Vec::new());
        }

        let quizzes = sqlx::query_as::<_, QuizRecord>(
            r#"
            SELECT DISTINCT q.id, q.author_id, q.title, q.description, q.slug, q.status, q.created_at, q.updated_at
            FROM quizzes q
            JOIN quiz_participants p ON p.quiz_id = q.id
            WHERE p.user_id = $1 OR p.id = $2
            ORDER BY q.id DESC
            "#,
        )
        .bind(user_id)
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(quizzes)
    }

    pub async fn set_quiz_status(&self, quiz_id: i64, status: QuizStatus) -> Result<()> {
        sqlx::query("UPDATE quizzes SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status)
            .bind(Utc::now())
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;

        tracing::info!("quiz {quiz_id} is now {status:?}");
        Ok(())
    }

    pub async fn max_score(&self, quiz_id: i64) -> Result<i64> {
        let max: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(score), 0) FROM questions WHERE quiz_id = $1")
                .bind(quiz_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(max)
    }

    pub async fn quiz_summary(&self, quiz_id: i64) -> Result<QuizSummary> {
        let invitees = sqlx::query_as::<_, InviteeCount>(
            r#"
            SELECT accepted, COUNT(*) AS count
            FROM quiz_invitations
            WHERE quiz_id = $1
            GROUP BY accepted
            ORDER BY accepted
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        let participants = sqlx::query_as::<_, ParticipantCount>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM quiz_participants
            WHERE quiz_id = $1
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(QuizSummary {
            max_score: self.max_score(quiz_id).await?,
            invitees,
            participants,
        })
    }
}

fn push_quiz_filter(query: &mut QueryBuilder<'_, Sqlite>, author_id: i64, filter: &QuizFilter) {
    query.push("q.author_id = ").push_bind(author_id);

    if let Some(title) = filter.title.as_deref().filter(|t| !t.is_empty()) {
        query
            .push(" AND q.title LIKE ")
            .push_bind(super::contains_pattern(title))
            .push(" ESCAPE '\\'");
    }
    if let Some(tag) = filter.tag.as_deref().filter(|t| !t.is_empty()) {
        query
            .push(" AND EXISTS(SELECT 1 FROM quiz_tags t WHERE t.quiz_id = q.id AND t.name = ")
            .push_bind(tag.to_string())
            .push(")");
    }
    if let Some(after) = filter.created_after {
        query
            .push(" AND date(q.created_at) >= ")
            .push_bind(after.format("%Y-%m-%d").to_string());
    }
    if let Some(before) = filter.created_before {
        query
            .push(" AND date(q.created_at) <= ")
            .push_bind(before.format("%Y-%m-%d").to_string());
    }
}

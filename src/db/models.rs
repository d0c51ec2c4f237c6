// Database model structs

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub is_admin: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, serde::Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum QuizStatus {
    Draft,
    Published,
    Closed,
}

impl QuizStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QuizStatus::Draft => "draft",
            QuizStatus::Published => "published",
            QuizStatus::Closed => "closed",
        }
    }

    /// Closed is terminal; everything else may move forward.
    pub fn can_become(self, next: QuizStatus) -> bool {
        match (self, next) {
            (QuizStatus::Closed, _) => false,
            (QuizStatus::Published, QuizStatus::Draft) => false,
            _ => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Accepted,
    Attempted,
    Completed,
}

impl ParticipantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipantStatus::Accepted => "accepted",
            ParticipantStatus::Attempted => "attempted",
            ParticipantStatus::Completed => "completed",
        }
    }

    /// Status after `answered` of `total` questions have been answered.
    pub fn after_answering(answered: i64, total: i64) -> Self {
        if answered < total {
            ParticipantStatus::Attempted
        } else {
            ParticipantStatus::Completed
        }
    }
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct QuizRecord {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub status: QuizStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the author's quiz list.
#[derive(Debug, Serialize)]
pub struct QuizListItem {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub status: QuizStatus,
    pub tags: Vec<String>,
    pub question_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct AnswerModel {
    pub id: i64,
    #[serde(skip)]
    pub question_id: i64,
    pub answer: String,
    pub correct: bool,
}

#[derive(Debug, Serialize)]
pub struct QuestionModel {
    pub id: i64,
    pub question: String,
    pub score: i64,
    pub answers: Vec<AnswerModel>,
}

/// Full quiz graph as the author sees it.
#[derive(Debug, Serialize)]
pub struct QuizDetail {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub status: QuizStatus,
    pub tags: Vec<String>,
    pub questions: Vec<QuestionModel>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TakeAnswer {
    pub id: i64,
    pub answer: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct TakeQuestion {
    pub id: i64,
    pub question: String,
    pub answers: Vec<TakeAnswer>,
}

impl From<QuestionModel> for TakeQuestion {
    fn from(q: QuestionModel) -> Self {
        TakeQuestion {
            id: q.id,
            question: q.question,
            answers: q
                .answers
                .into_iter()
                .map(|a| TakeAnswer {
                    id: a.id,
                    answer: a.answer,
                })
                .collect(),
        }
    }
}

/// Quiz as a participant sees it: no correct flags.
#[derive(Debug, Serialize)]
pub struct TakeQuiz {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub questions: Vec<TakeQuestion>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Invitation {
    pub id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub quiz_slug: String,
    pub email: String,
    pub access_key: String,
    pub accepted: bool,
    pub inviter_id: Option<i64>,
    pub sent: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationState {
    Created,
    Sent,
    Accepted,
    Expired,
}

impl Invitation {
    pub fn state(&self, now: DateTime<Utc>, expiry_days: i64) -> InvitationState {
        if self.accepted {
            return InvitationState::Accepted;
        }
        match self.sent {
            None => InvitationState::Created,
            Some(sent) if sent + chrono::Duration::days(expiry_days) <= now => {
                InvitationState::Expired
            }
            Some(_) => InvitationState::Sent,
        }
    }
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Participant {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: Option<i64>,
    pub email: String,
    pub status: ParticipantStatus,
    pub score: Option<i64>,
    #[serde(skip)]
    pub access_key: String,
    pub notified: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Row of the author's participant list.
#[derive(Debug, Serialize)]
pub struct ParticipantListItem {
    pub id: i64,
    pub email: String,
    pub status: ParticipantStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub score_str: String,
}

#[derive(Debug, Serialize)]
pub struct Progress {
    pub answered_questions_count: i64,
    pub total_questions_count: i64,
    pub progress: String,
    pub remaining_questions: Vec<TakeQuestion>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct AnsweredQuestion {
    pub question: String,
    pub answer: String,
    pub correct: bool,
}

/// Everything the results email needs for one completed participant.
#[derive(Clone, Debug, Serialize)]
pub struct ParticipantResult {
    pub id: i64,
    pub email: String,
    pub score: i64,
    pub quiz_title: String,
    pub max_score: i64,
    pub answers: Vec<AnsweredQuestion>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct InviteeCount {
    pub accepted: bool,
    pub count: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ParticipantCount {
    pub status: ParticipantStatus,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct QuizSummary {
    pub max_score: i64,
    pub invitees: Vec<InviteeCount>,
    pub participants: Vec<ParticipantCount>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct QuizReportEntry {
    pub title: String,
    pub author: String,
    pub questions_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ParticipantReportEntry {
    pub quiz: String,
    pub email: String,
    pub status: ParticipantStatus,
    pub score: i64,
    pub answers_given: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub page: i64,
    pub results: Vec<T>,
}
